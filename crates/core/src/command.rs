//! Optimistic mutations with rollback.
//!
//! An [`OptimisticCommand`] applies its change to the store before the
//! backend call resolves. If the call fails, the change is reverted from
//! the snapshot taken at apply time and the failure is published on the
//! view's [`ErrorChannel`].

use std::fmt;
use std::future::Future;

use tokio::sync::broadcast;
use tracing::{info, warn};

use dashboard_common::{AppError, AppResult};

use crate::store::{Scope, SharedStore, StoreEvent};

/// Capacity of the error broadcast channel.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Operations that can fail against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fetch or refresh of a list.
    Fetch,
    /// Mark one notification read.
    MarkRead,
    /// Mark every notification read.
    MarkAllRead,
    /// Delete one notification.
    Delete,
    /// Delete the selection.
    BulkDelete,
    /// Mark the selection read.
    BulkMarkRead,
    /// Create a test notification.
    CreateTest,
}

impl Operation {
    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::MarkRead => "mark_read",
            Self::MarkAllRead => "mark_all_read",
            Self::Delete => "delete",
            Self::BulkDelete => "bulk_delete",
            Self::BulkMarkRead => "bulk_mark_read",
            Self::CreateTest => "create_test",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend operation, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    /// What was attempted.
    pub operation: Operation,
    /// Notification the operation targeted, if one.
    pub id: Option<String>,
    /// Why it failed.
    pub error: AppError,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} of {id} failed: {}", self.operation, self.error),
            None => write!(f, "{} failed: {}", self.operation, self.error),
        }
    }
}

/// Broadcast channel carrying every [`SyncError`] of a view.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    tx: broadcast::Sender<SyncError>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl ErrorChannel {
    /// Subscribe to future errors.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncError> {
        self.tx.subscribe()
    }

    /// Publish an error. Having no subscribers is fine.
    pub fn publish(&self, error: SyncError) {
        let _ = self.tx.send(error);
    }
}

/// A store mutation applied ahead of its backend call.
#[derive(Debug, Clone)]
pub struct OptimisticCommand {
    operation: Operation,
    scope: Scope,
    event: StoreEvent,
}

impl OptimisticCommand {
    /// Command applying `event`, which touches the notifications in `scope`.
    #[must_use]
    pub const fn new(operation: Operation, scope: Scope, event: StoreEvent) -> Self {
        Self {
            operation,
            scope,
            event,
        }
    }

    fn target(&self) -> Option<String> {
        match &self.scope {
            Scope::One(id) => Some(id.clone()),
            Scope::All => None,
        }
    }

    /// Apply the change, await `call`, and roll back on failure.
    ///
    /// When the view is unmounted, the call still runs but neither the
    /// change, the rollback nor the error event touch the view.
    pub async fn run<T, F>(
        self,
        store: &SharedStore,
        errors: &ErrorChannel,
        call: F,
    ) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let target = self.target();
        let snapshot = store.apply_optimistic(&self.scope, self.event);

        match call.await {
            Ok(value) => {
                info!(operation = %self.operation, id = ?target, "Notification update applied");
                Ok(value)
            }
            Err(error) => {
                warn!(
                    operation = %self.operation,
                    id = ?target,
                    code = error.error_code(),
                    error = %error,
                    "Notification update failed, rolling back"
                );
                if let Some(snapshot) = snapshot
                    && store.dispatch(StoreEvent::Restored(snapshot))
                {
                    let failure = SyncError {
                        operation: self.operation,
                        id: target,
                        error: error.clone(),
                    };
                    store.dispatch(StoreEvent::MutationFailed(failure.clone()));
                    errors.publish(failure);
                }
                Err(error)
            }
        }
    }
}
