//! REST client for the dashboard's notification endpoints.
//!
//! - [`model`]: the [`Notification`] type and its enums
//! - [`wire`]: query/response shapes and envelope decoding
//! - [`NotificationApi`]: the async seam the sync services depend on
//! - [`HttpNotificationApi`]: the `reqwest` implementation

pub mod api;
pub mod http;
pub mod model;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod wire;

pub use api::NotificationApi;
pub use http::HttpNotificationApi;
pub use model::{
    Notification, NotificationCategory, NotificationData, NotificationStatus, NotificationType,
    ParseEnumError, Priority,
};
pub use wire::{ListQuery, NotificationFilters, NotificationPage, Pagination};
