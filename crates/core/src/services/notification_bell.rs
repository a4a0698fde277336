//! Header bell: recent notifications and the unread badge.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashboard_client::{NotificationApi, NotificationPage, Pagination};
use dashboard_common::AppResult;
use dashboard_common::config::SyncConfig;

use crate::command::SyncError;
use crate::format::badge_text;
use crate::services::actions::ViewActions;
use crate::services::poller::Refresh;
use crate::store::{NotificationState, StoreEvent};

/// Recent notifications with an unread counter, kept apart from the
/// center's state.
#[derive(Clone)]
pub struct NotificationBell {
    actions: ViewActions,
    recent_limit: u32,
}

impl NotificationBell {
    /// Bell over `api` showing up to `recent_limit` notifications.
    #[must_use]
    pub fn new(api: Arc<dyn NotificationApi>, recent_limit: u32) -> Self {
        Self {
            actions: ViewActions::new(api),
            recent_limit,
        }
    }

    /// Bell configured from the `[sync]` section.
    #[must_use]
    pub fn from_config(api: Arc<dyn NotificationApi>, config: &SyncConfig) -> Self {
        Self::new(api, config.recent_limit)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> NotificationState {
        self.actions.store().state()
    }

    /// Unread count as shown on the badge.
    #[must_use]
    pub fn badge(&self) -> Option<String> {
        badge_text(self.actions.store().read(|s| s.unread_count))
    }

    /// Subscribe to failed backend operations.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SyncError> {
        self.actions.errors().subscribe()
    }

    /// Stop applying results.
    pub fn unmount(&self) {
        self.actions.store().unmount();
    }

    /// Load the recent list and the unread count together.
    pub async fn refresh(&self) -> AppResult<()> {
        let request = self.actions.begin_fetch();
        let api = self.actions.api();
        debug!(request, limit = self.recent_limit, "Fetching recent notifications");

        let result = futures::try_join!(api.recent(self.recent_limit), api.unread_count());
        match result {
            Ok((notifications, unread_count)) => {
                let total_count = notifications.len() as u64;
                let page = NotificationPage {
                    notifications,
                    unread_count,
                    pagination: Pagination {
                        current_page: 1,
                        total_pages: 1,
                        total_count,
                    },
                };
                self.actions
                    .store()
                    .dispatch(StoreEvent::PageLoaded { request, page });
                Ok(())
            }
            Err(error) => {
                warn!(request, error = %error, "Failed to fetch recent notifications");
                self.actions.store().dispatch(StoreEvent::FetchFailed {
                    request,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Mark one notification read.
    pub async fn mark_read(&self, id: &str) -> AppResult<()> {
        self.actions.mark_read(id).await
    }

    /// Open a notification, returning its navigation target.
    pub async fn click(&self, id: &str) -> AppResult<Option<String>> {
        self.actions.click(id).await
    }

    /// Mark every notification read.
    pub async fn mark_all_read(&self) -> AppResult<()> {
        self.actions.mark_all_read().await
    }
}

#[async_trait]
impl Refresh for NotificationBell {
    fn name(&self) -> &'static str {
        "notification-bell"
    }

    fn lifecycle(&self) -> CancellationToken {
        self.actions.store().lifecycle()
    }

    async fn refresh(&self) -> AppResult<()> {
        Self::refresh(self).await
    }
}
