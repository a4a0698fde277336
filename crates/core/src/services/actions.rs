//! Mutations shared by every notification view.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, info, warn};

use dashboard_client::NotificationApi;
use dashboard_common::{AppError, AppResult};

use crate::command::{ErrorChannel, Operation, OptimisticCommand, SyncError};
use crate::confirm::{Confirm, DeletePrompt};
use crate::store::{Scope, SharedStore, StoreEvent};

/// Backend, store and error channel of one view.
///
/// The center and the bell each own one; they share nothing but the
/// backend.
#[derive(Clone)]
pub struct ViewActions {
    api: Arc<dyn NotificationApi>,
    store: SharedStore,
    errors: ErrorChannel,
    requests: Arc<AtomicU64>,
}

impl ViewActions {
    /// Actions over a fresh store.
    #[must_use]
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self {
            api,
            store: SharedStore::default(),
            errors: ErrorChannel::default(),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The backend.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn NotificationApi> {
        &self.api
    }

    /// The view's store.
    #[must_use]
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The view's error channel.
    #[must_use]
    pub const fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Take the next fetch sequence number and mark the fetch started.
    pub(crate) fn begin_fetch(&self) -> u64 {
        let request = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.store.dispatch(StoreEvent::FetchStarted { request });
        request
    }

    /// Record a failed backend call that had no optimistic change.
    pub(crate) fn report(&self, failure: SyncError) {
        if self.store.dispatch(StoreEvent::MutationFailed(failure.clone())) {
            self.errors.publish(failure);
        }
    }

    /// Mark one notification read.
    pub async fn mark_read(&self, id: &str) -> AppResult<()> {
        let command = OptimisticCommand::new(
            Operation::MarkRead,
            Scope::One(id.to_string()),
            StoreEvent::MarkedRead {
                id: id.to_string(),
                at: Utc::now(),
            },
        );
        command
            .run(&self.store, &self.errors, self.api.mark_read(id))
            .await
    }

    /// Open a notification: mark it read if it is unread and return where it
    /// points to.
    pub async fn click(&self, id: &str) -> AppResult<Option<String>> {
        let Some((unread, target)) = self
            .store
            .read(|s| s.get(id).map(|n| (n.is_unread(), n.action_url())))
        else {
            debug!(id = %id, "Clicked notification is not held");
            return Ok(None);
        };

        if unread {
            self.mark_read(id).await?;
        }
        Ok(target)
    }

    /// Mark every notification read.
    pub async fn mark_all_read(&self) -> AppResult<()> {
        let command = OptimisticCommand::new(
            Operation::MarkAllRead,
            Scope::All,
            StoreEvent::MarkedAllRead { at: Utc::now() },
        );
        let affected = command
            .run(&self.store, &self.errors, self.api.mark_all_read())
            .await?;
        info!(affected = ?affected, "Marked all notifications read");
        Ok(())
    }

    /// Delete one notification once `confirm` approves.
    ///
    /// Returns `false` when the delete was declined.
    pub async fn delete(&self, id: &str, confirm: &dyn Confirm) -> AppResult<bool> {
        let title = self
            .store
            .read(|s| s.get(id).map(|n| n.title.clone()));
        let prompt = DeletePrompt::One {
            id,
            title: title.as_deref(),
        };
        if !confirm.confirm(&prompt) {
            debug!(id = %id, "Delete declined");
            return Ok(false);
        }

        let command = OptimisticCommand::new(
            Operation::Delete,
            Scope::One(id.to_string()),
            StoreEvent::Removed { id: id.to_string() },
        );
        command
            .run(&self.store, &self.errors, self.api.delete(id))
            .await?;
        Ok(true)
    }

    /// Report a failure of `operation` on the error channel and log it.
    pub(crate) fn report_failed(
        &self,
        operation: Operation,
        id: Option<&str>,
        error: AppError,
    ) {
        warn!(operation = %operation, id = ?id, error = %error, "Notification update failed");
        self.report(SyncError {
            operation,
            id: id.map(str::to_string),
            error,
        });
    }
}
