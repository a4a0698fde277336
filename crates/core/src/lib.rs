//! Client-side notification sync for the customer dashboard.
//!
//! Views ([`NotificationCenter`], [`NotificationBell`]) hold a
//! [`store::SharedStore`] updated through a pure reducer. Mutations are
//! applied optimistically and rolled back on failure; failures are
//! published on a per-view broadcast channel.

pub mod bulk;
pub mod command;
pub mod confirm;
pub mod format;
pub mod selection;
pub mod services;
pub mod store;

pub use bulk::BulkReport;
pub use command::{ErrorChannel, Operation, OptimisticCommand, SyncError};
pub use confirm::{AlwaysConfirm, Confirm, DeletePrompt};
pub use format::{badge_text, time_ago};
pub use services::*;
pub use store::{NotificationState, SharedStore, StoreEvent};
