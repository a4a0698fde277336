//! The notification backend seam.

use async_trait::async_trait;
use dashboard_common::AppResult;

use crate::model::Notification;
use crate::wire::{ListQuery, NotificationPage};

/// Operations the dashboard performs against the notification backend.
///
/// [`crate::HttpNotificationApi`] talks to the real REST endpoints; tests
/// substitute in-memory implementations.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET /api/notifications`: one page plus the unread count.
    async fn list(&self, query: &ListQuery) -> AppResult<NotificationPage>;

    /// `GET /api/notifications/recent`: short list for the bell.
    async fn recent(&self, limit: u32) -> AppResult<Vec<Notification>>;

    /// `GET /api/notifications/unread-count`.
    async fn unread_count(&self) -> AppResult<u64>;

    /// `PUT /api/notifications/{id}/read`.
    async fn mark_read(&self, id: &str) -> AppResult<()>;

    /// `PUT /api/notifications/mark-all-read`. Returns the affected count
    /// when the backend reports one.
    async fn mark_all_read(&self) -> AppResult<Option<u64>>;

    /// `DELETE /api/notifications/{id}`.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// `POST /api/notifications/test`: create a synthetic notification.
    async fn create_test(&self) -> AppResult<Option<Notification>>;
}
