//! Paginated notification center.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use validator::Validate;

use dashboard_client::{ListQuery, NotificationApi, NotificationFilters};
use dashboard_common::config::SyncConfig;
use dashboard_common::{AppError, AppResult};

use crate::bulk::{BulkReport, settle};
use crate::command::{Operation, SyncError};
use crate::confirm::{Confirm, DeletePrompt};
use crate::services::actions::ViewActions;
use crate::services::poller::Refresh;
use crate::store::{NotificationState, StoreEvent};

/// Full notification list with filters, pagination, selection and bulk
/// actions.
#[derive(Clone)]
pub struct NotificationCenter {
    actions: ViewActions,
    page_size: u32,
}

impl NotificationCenter {
    /// Center over `api`, fetching `page_size` notifications per page.
    #[must_use]
    pub fn new(api: Arc<dyn NotificationApi>, page_size: u32) -> Self {
        Self {
            actions: ViewActions::new(api),
            page_size,
        }
    }

    /// Center configured from the `[sync]` section.
    #[must_use]
    pub fn from_config(api: Arc<dyn NotificationApi>, config: &SyncConfig) -> Self {
        Self::new(api, config.page_size)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> NotificationState {
        self.actions.store().state()
    }

    /// Subscribe to failed backend operations.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SyncError> {
        self.actions.errors().subscribe()
    }

    /// Stop applying results. In-flight calls finish but change nothing.
    pub fn unmount(&self) {
        self.actions.store().unmount();
    }

    /// Whether the view is mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.actions.store().is_mounted()
    }

    fn query(&self) -> ListQuery {
        self.actions.store().read(|s| ListQuery {
            page: s.cursor.page,
            limit: self.page_size,
            filters: s.filters.clone(),
        })
    }

    /// Fetch the current page with the current filters.
    ///
    /// A failure keeps the list as it was and is recorded on the state.
    pub async fn fetch(&self) -> AppResult<()> {
        let query = self.query();
        query.validate()?;

        let request = self.actions.begin_fetch();
        debug!(request, page = query.page, limit = query.limit, "Fetching notifications");

        match self.actions.api().list(&query).await {
            Ok(page) => {
                debug!(
                    request,
                    count = page.notifications.len(),
                    unread = page.unread_count,
                    "Notifications fetched"
                );
                self.actions
                    .store()
                    .dispatch(StoreEvent::PageLoaded { request, page });
                Ok(())
            }
            Err(error) => {
                warn!(request, code = error.error_code(), error = %error, "Failed to fetch notifications");
                self.actions.store().dispatch(StoreEvent::FetchFailed {
                    request,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Re-issue the current query.
    pub async fn refresh(&self) -> AppResult<()> {
        self.fetch().await
    }

    /// Dismiss the recorded error and re-issue the last query.
    pub async fn retry(&self) -> AppResult<()> {
        self.actions.store().dispatch(StoreEvent::ErrorsCleared);
        self.fetch().await
    }

    /// Replace the filters and fetch page 1.
    pub async fn set_filters(&self, filters: NotificationFilters) -> AppResult<()> {
        filters.validate()?;
        self.actions
            .store()
            .dispatch(StoreEvent::QueryChanged { page: 1, filters });
        self.fetch().await
    }

    /// Jump to `page`, clamped to the known page range, and fetch it.
    pub async fn go_to_page(&self, page: u32) -> AppResult<()> {
        let (page, filters) = self.actions.store().read(|s| {
            (
                page.clamp(1, s.cursor.total_pages.max(1)),
                s.filters.clone(),
            )
        });
        self.actions
            .store()
            .dispatch(StoreEvent::QueryChanged { page, filters });
        self.fetch().await
    }

    /// Fetch the next page, if any.
    pub async fn next_page(&self) -> AppResult<()> {
        let page = self.actions.store().read(|s| s.cursor.page.saturating_add(1));
        self.go_to_page(page).await
    }

    /// Fetch the previous page, if any.
    pub async fn prev_page(&self) -> AppResult<()> {
        let page = self.actions.store().read(|s| s.cursor.page.saturating_sub(1));
        self.go_to_page(page).await
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

    /// Delete one notification once confirmed.
    pub async fn delete(&self, id: &str, confirm: &dyn Confirm) -> AppResult<bool> {
        self.actions.delete(id, confirm).await
    }

    /// Flip selection of `id`. Ignored unless `id` is on the current page.
    pub fn toggle(&self, id: &str) {
        self.actions
            .store()
            .dispatch(StoreEvent::Toggled { id: id.to_string() });
    }

    /// Select the whole page, or clear the selection if it already is.
    pub fn toggle_all(&self) {
        self.actions.store().dispatch(StoreEvent::ToggledAll);
    }

    /// Empty the selection.
    pub fn clear_selection(&self) {
        self.actions.store().dispatch(StoreEvent::SelectionCleared);
    }

    /// Delete every selected notification once confirmed.
    ///
    /// Deletes run concurrently and are settled together: only the ids the
    /// backend deleted leave the list, failures stay and are reported. The
    /// selection is cleared afterwards. Returns `None` when there was
    /// nothing to delete or the delete was declined.
    pub async fn delete_selected(&self, confirm: &dyn Confirm) -> Option<BulkReport> {
        let ids = self.actions.store().read(|s| s.selection.to_vec());
        if ids.is_empty() {
            return None;
        }
        if !confirm.confirm(&DeletePrompt::Selected { count: ids.len() }) {
            debug!(count = ids.len(), "Bulk delete declined");
            return None;
        }

        let api = self.actions.api();
        let report = settle(ids, |id| async move { api.delete(&id).await }).await;

        let store = self.actions.store();
        for id in &report.succeeded {
            store.dispatch(StoreEvent::Removed { id: id.clone() });
        }
        self.finish_bulk(Operation::BulkDelete, &report);
        Some(report)
    }

    /// Mark every selected notification read.
    ///
    /// Settled like [`NotificationCenter::delete_selected`].
    pub async fn mark_selected_read(&self) -> Option<BulkReport> {
        let ids = self.actions.store().read(|s| s.selection.to_vec());
        if ids.is_empty() {
            return None;
        }

        let api = self.actions.api();
        let report = settle(ids, |id| async move { api.mark_read(&id).await }).await;

        let at = Utc::now();
        let store = self.actions.store();
        for id in &report.succeeded {
            store.dispatch(StoreEvent::MarkedRead { id: id.clone(), at });
        }
        self.finish_bulk(Operation::BulkMarkRead, &report);
        Some(report)
    }

    fn finish_bulk(&self, operation: Operation, report: &BulkReport) {
        info!(
            operation = %operation,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Bulk update settled"
        );
        for (id, error) in &report.failed {
            self.actions
                .report_failed(operation, Some(id), error.clone());
        }
        self.actions.store().dispatch(StoreEvent::SelectionCleared);
    }

    /// Ask the backend for a test notification, then refresh.
    pub async fn create_test_notification(&self) -> AppResult<()> {
        match self.actions.api().create_test().await {
            Ok(created) => {
                info!(id = ?created.map(|n| n.id), "Test notification created");
                self.refresh().await
            }
            Err(error) => {
                self.actions
                    .report_failed(Operation::CreateTest, None, error.clone());
                Err(error)
            }
        }
    }
}

#[async_trait]
impl Refresh for NotificationCenter {
    fn name(&self) -> &'static str {
        "notification-center"
    }

    fn lifecycle(&self) -> CancellationToken {
        self.actions.store().lifecycle()
    }

    async fn refresh(&self) -> AppResult<()> {
        Self::refresh(self).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::confirm::AlwaysConfirm;
    use dashboard_client::NotificationStatus;
    use dashboard_client::test_utils::{ScriptedApi, notification};
    use pretty_assertions::assert_eq;

    fn center(api: &ScriptedApi) -> NotificationCenter {
        NotificationCenter::new(Arc::new(api.clone()), 10)
    }

    fn ids(center: &NotificationCenter) -> Vec<String> {
        center.state().page_ids().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_fetch_loads_page() {
        let api = ScriptedApi::with_unread(3);
        let center = center(&api);

        center.fetch().await.unwrap();

        let state = center.state();
        assert_eq!(ids(&center), vec!["n1", "n2", "n3"]);
        assert_eq!(state.unread_count, 3);
        assert!(!state.loading);
        assert_eq!(api.list_queries()[0].limit, 10);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_list() {
        let api = ScriptedApi::with_unread(2);
        let center = center(&api);
        center.fetch().await.unwrap();

        api.fail_list(true);
        assert!(center.refresh().await.is_err());

        let state = center.state();
        assert_eq!(state.notifications.len(), 2);
        assert!(matches!(state.error, Some(AppError::Api { status: 500, .. })));

        api.fail_list(false);
        center.retry().await.unwrap();
        assert!(center.state().error.is_none());
    }

    #[tokio::test]
    async fn test_filter_change_fetches_page_one_once() {
        let api = ScriptedApi::with_notifications(vec![
            notification("a", true),
            notification("b", false),
            notification("c", true),
        ]);
        let center = center(&api);

        center
            .set_filters(NotificationFilters {
                status: Some(NotificationStatus::Unread),
                ..NotificationFilters::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&center), vec!["a", "c"]);

        center
            .set_filters(NotificationFilters {
                status: Some(NotificationStatus::Read),
                ..NotificationFilters::default()
            })
            .await
            .unwrap();

        let queries = api.list_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].page, 1);
        assert_eq!(queries[1].filters.status, Some(NotificationStatus::Read));
        assert_eq!(ids(&center), vec!["b"]);
    }

    #[tokio::test]
    async fn test_invalid_filters_make_no_call() {
        let api = ScriptedApi::with_unread(1);
        let center = center(&api);

        let result = center
            .set_filters(NotificationFilters {
                search: Some("x".repeat(201)),
                ..NotificationFilters::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(api.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_page_navigation_is_clamped() {
        let api = ScriptedApi::with_unread(25);
        let center = center(&api);
        center.fetch().await.unwrap();
        assert_eq!(center.state().cursor.total_pages, 3);

        center.go_to_page(9).await.unwrap();
        assert_eq!(center.state().cursor.page, 3);

        center.next_page().await.unwrap();
        assert_eq!(center.state().cursor.page, 3);

        center.prev_page().await.unwrap();
        assert_eq!(center.state().cursor.page, 2);
        assert_eq!(ids(&center)[0], "n11");

        center.go_to_page(0).await.unwrap();
        assert_eq!(center.state().cursor.page, 1);
        assert_eq!(api.list_calls(), 5);
    }

    #[tokio::test]
    async fn test_bulk_delete_with_one_failure() {
        let api = ScriptedApi::with_unread(3);
        api.fail_delete("n2");
        let center = center(&api);
        let mut errors = center.subscribe_errors();
        center.fetch().await.unwrap();
        center.toggle_all();

        let report = center.delete_selected(&AlwaysConfirm).await.unwrap();

        assert_eq!(report.succeeded, vec!["n1", "n3"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "n2");

        let state = center.state();
        assert_eq!(ids(&center), vec!["n2"]);
        assert_eq!(state.unread_count, 1);
        assert!(state.selection.is_empty());

        let error = errors.try_recv().unwrap();
        assert_eq!(error.operation, Operation::BulkDelete);
        assert_eq!(error.id.as_deref(), Some("n2"));
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bulk_delete_without_selection_is_noop() {
        let api = ScriptedApi::with_unread(1);
        let center = center(&api);
        center.fetch().await.unwrap();

        assert!(center.delete_selected(&AlwaysConfirm).await.is_none());
        assert!(api.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_mark_selected_read() {
        let api = ScriptedApi::with_unread(3);
        let center = center(&api);
        center.fetch().await.unwrap();
        center.toggle("n1");
        center.toggle("n3");

        let report = center.mark_selected_read().await.unwrap();

        assert!(report.is_complete());
        let state = center.state();
        assert_eq!(state.unread_count, 1);
        assert!(state.get("n2").unwrap().is_unread());
        assert!(state.selection.is_empty());
    }

    #[tokio::test]
    async fn test_create_test_notification_refreshes() {
        let api = ScriptedApi::with_unread(1);
        let center = center(&api);
        center.fetch().await.unwrap();

        center.create_test_notification().await.unwrap();

        assert_eq!(api.test_calls(), 1);
        assert_eq!(ids(&center), vec!["test-1", "n1"]);
        assert_eq!(center.state().unread_count, 2);
    }
}
