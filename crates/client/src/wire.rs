//! Request and response shapes of the notification endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use validator::Validate;

use dashboard_common::{AppError, AppResult};

use crate::model::{Notification, NotificationStatus, NotificationType};

/// Maximum page size accepted by the listing endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter set of the paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct NotificationFilters {
    /// Only notifications with this status.
    pub status: Option<NotificationStatus>,
    /// Only notifications of this type.
    pub notification_type: Option<NotificationType>,
    /// Free-text search over title and message.
    #[validate(length(max = 200))]
    pub search: Option<String>,
}

impl NotificationFilters {
    /// Filters with blank search text dropped and surrounding whitespace
    /// trimmed.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

/// Query of the paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ListQuery {
    /// 1-based page number.
    #[validate(range(min = 1))]
    pub page: u32,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    /// Filter set.
    #[validate(nested)]
    pub filters: NotificationFilters,
}

impl ListQuery {
    /// First page with the given size and filters.
    #[must_use]
    pub fn first_page(limit: u32, filters: NotificationFilters) -> Self {
        Self {
            page: 1,
            limit,
            filters: filters.normalized(),
        }
    }

    /// Query string pairs, omitting absent filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(status) = self.filters.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(kind) = self.filters.notification_type {
            pairs.push(("type", kind.as_str().to_string()));
        }
        if let Some(search) = &self.filters.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

/// Pagination metadata of a listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page this response holds.
    #[serde(default = "default_page", alias = "page")]
    pub current_page: u32,
    /// Number of pages for the current filters.
    #[serde(default = "default_page", alias = "pages")]
    pub total_pages: u32,
    /// Number of notifications for the current filters.
    #[serde(default, alias = "total")]
    pub total_count: u64,
}

const fn default_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_count: 0,
        }
    }
}

/// One page of the listing plus the user's unread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    /// Notifications on this page.
    pub notifications: Vec<Notification>,
    /// Unread notifications across the user's full set.
    #[serde(default)]
    pub unread_count: u64,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecentPayload {
    List(Vec<Notification>),
    Wrapped { notifications: Vec<Notification> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountPayload {
    Bare(u64),
    #[serde(rename_all = "camelCase")]
    Unread {
        unread_count: u64,
    },
    Count {
        count: u64,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AffectedPayload {
    #[serde(default, alias = "modifiedCount", alias = "updatedCount")]
    count: Option<u64>,
}

/// Strip the optional `{ success, data, message }` envelope.
///
/// A body with `success: false` is rejected even on a 2xx status.
pub fn unwrap_envelope(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MalformedResponse("empty response body".to_string()));
    }
    let value: Value = serde_json::from_slice(body)?;

    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    if map.get("success").and_then(Value::as_bool) == Some(false) {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful");
        return Err(AppError::MalformedResponse(message.to_string()));
    }

    match map.remove("data") {
        Some(data) if !data.is_null() => Ok(data),
        _ => Ok(Value::Object(map)),
    }
}

/// Decode an enveloped or bare body into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    let value = unwrap_envelope(body)?;
    serde_json::from_value(value).map_err(|e| {
        error!(
            target_type = std::any::type_name::<T>(),
            error = %e,
            "Unexpected notification response shape"
        );
        AppError::from(e)
    })
}

/// Decode the body of `GET /api/notifications/recent`.
pub fn decode_recent(body: &[u8]) -> AppResult<Vec<Notification>> {
    Ok(match decode::<RecentPayload>(body)? {
        RecentPayload::List(list) | RecentPayload::Wrapped { notifications: list } => list,
    })
}

/// Decode the body of `GET /api/notifications/unread-count`.
pub fn decode_unread_count(body: &[u8]) -> AppResult<u64> {
    Ok(match decode::<CountPayload>(body)? {
        CountPayload::Bare(n)
        | CountPayload::Unread { unread_count: n }
        | CountPayload::Count { count: n } => n,
    })
}

/// Decode the affected-rows count some write endpoints report.
/// Empty bodies and bodies without a count yield `None`.
#[must_use]
pub fn decode_affected(body: &[u8]) -> Option<u64> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    decode::<AffectedPayload>(body).ok().and_then(|p| p.count)
}

/// Pull the server's error message out of an error body.
///
/// Understands `{"message": ..}`, `{"error": ..}` and
/// `{"error": {"message": ..}}`.
#[must_use]
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.get("error").and_then(Value::as_str))
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })?;
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
