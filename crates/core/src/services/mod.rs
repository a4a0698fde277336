//! Notification views and their refresh loop.

pub mod actions;
pub mod notification_bell;
pub mod notification_center;
pub mod poller;

pub use actions::ViewActions;
pub use notification_bell::NotificationBell;
pub use notification_center::NotificationCenter;
pub use poller::{PollHandle, Poller, Refresh};
