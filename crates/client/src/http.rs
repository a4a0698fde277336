//! `reqwest` implementation of [`NotificationApi`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, warn};
use url::Url;
use validator::Validate;

use dashboard_common::config::ApiConfig;
use dashboard_common::{AppError, AppResult, TokenStore, resolve_bearer};

use crate::api::NotificationApi;
use crate::model::Notification;
use crate::wire::{self, ListQuery, NotificationPage};

/// HTTP client for the dashboard's notification endpoints.
#[derive(Clone)]
pub struct HttpNotificationApi {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl HttpNotificationApi {
    /// Create a client from the `[api]` config section.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Self::with_client(client, &config.base_url, tokens)
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(
        client: Client,
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("not a base URL: {base_url}")));
        }
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Build an endpoint URL under the base URL. Segments are
    /// percent-encoded, so ids cannot escape their path position.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AppError::Config(format!("not a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match resolve_bearer(self.tokens.as_ref()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn execute(&self, builder: RequestBuilder) -> AppResult<Vec<u8>> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(method = %method, url = %url, "Sending notification request");

        let response = self.client.execute(request).await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Notification request failed");
            AppError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let message = wire::error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        warn!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            message = %message,
            "Notification endpoint returned an error"
        );
        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, query: &ListQuery) -> AppResult<NotificationPage> {
        query.validate()?;
        let url = self.endpoint(&["api", "notifications"])?;
        let body = self
            .execute(self.request(Method::GET, url).query(&query.to_pairs()))
            .await?;
        wire::decode(&body)
    }

    async fn recent(&self, limit: u32) -> AppResult<Vec<Notification>> {
        let url = self.endpoint(&["api", "notifications", "recent"])?;
        let body = self
            .execute(self.request(Method::GET, url).query(&[("limit", limit)]))
            .await?;
        wire::decode_recent(&body)
    }

    async fn unread_count(&self) -> AppResult<u64> {
        let url = self.endpoint(&["api", "notifications", "unread-count"])?;
        let body = self.execute(self.request(Method::GET, url)).await?;
        wire::decode_unread_count(&body)
    }

    async fn mark_read(&self, id: &str) -> AppResult<()> {
        let url = self.endpoint(&["api", "notifications", id, "read"])?;
        let body = self.execute(self.request(Method::PUT, url)).await?;
        if !body.is_empty() {
            wire::unwrap_envelope(&body)?;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> AppResult<Option<u64>> {
        let url = self.endpoint(&["api", "notifications", "mark-all-read"])?;
        let body = self.execute(self.request(Method::PUT, url)).await?;
        if !body.is_empty() {
            wire::unwrap_envelope(&body)?;
        }
        Ok(wire::decode_affected(&body))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let url = self.endpoint(&["api", "notifications", id])?;
        let body = self.execute(self.request(Method::DELETE, url)).await?;
        if !body.is_empty() {
            wire::unwrap_envelope(&body)?;
        }
        Ok(())
    }

    async fn create_test(&self) -> AppResult<Option<Notification>> {
        let url = self.endpoint(&["api", "notifications", "test"])?;
        let body = self.execute(self.request(Method::POST, url)).await?;
        if body.is_empty() {
            return Ok(None);
        }
        let value = wire::unwrap_envelope(&body)?;
        let value = value.get("notification").cloned().unwrap_or(value);
        Ok(serde_json::from_value(value).ok())
    }
}
