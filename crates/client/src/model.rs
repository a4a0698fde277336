//! Notification model as served by the dashboard backend.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when parsing an enum from its wire name fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderCreated,
    OrderConfirmed,
    OrderAssigned,
    OrderStarted,
    OrderUnderReview,
    OrderRevisionRequested,
    OrderCompleted,
    OrderCancelled,
    PaymentProcessed,
    MessageReceived,
    FeedbackRequested,
}

/// Coarse grouping of notification types, used for icons and colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Order,
    Payment,
    Message,
    Feedback,
}

impl NotificationType {
    /// All notification types, in lifecycle order.
    pub const ALL: [Self; 11] = [
        Self::OrderCreated,
        Self::OrderConfirmed,
        Self::OrderAssigned,
        Self::OrderStarted,
        Self::OrderUnderReview,
        Self::OrderRevisionRequested,
        Self::OrderCompleted,
        Self::OrderCancelled,
        Self::PaymentProcessed,
        Self::MessageReceived,
        Self::FeedbackRequested,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderConfirmed => "order_confirmed",
            Self::OrderAssigned => "order_assigned",
            Self::OrderStarted => "order_started",
            Self::OrderUnderReview => "order_under_review",
            Self::OrderRevisionRequested => "order_revision_requested",
            Self::OrderCompleted => "order_completed",
            Self::OrderCancelled => "order_cancelled",
            Self::PaymentProcessed => "payment_processed",
            Self::MessageReceived => "message_received",
            Self::FeedbackRequested => "feedback_requested",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderCreated => "Order created",
            Self::OrderConfirmed => "Order confirmed",
            Self::OrderAssigned => "Order assigned",
            Self::OrderStarted => "Work started",
            Self::OrderUnderReview => "Under review",
            Self::OrderRevisionRequested => "Revision requested",
            Self::OrderCompleted => "Order completed",
            Self::OrderCancelled => "Order cancelled",
            Self::PaymentProcessed => "Payment processed",
            Self::MessageReceived => "New message",
            Self::FeedbackRequested => "Feedback requested",
        }
    }

    /// Category of this type.
    #[must_use]
    pub const fn category(self) -> NotificationCategory {
        match self {
            Self::PaymentProcessed => NotificationCategory::Payment,
            Self::MessageReceived => NotificationCategory::Message,
            Self::FeedbackRequested => NotificationCategory::Feedback,
            _ => NotificationCategory::Order,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "notification type",
                value: s.to_string(),
            })
    }
}

/// Notification priority, ordered from least to most pressing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Read status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            other => Err(ParseEnumError {
                kind: "notification status",
                value: other.to_string(),
            }),
        }
    }
}

/// Structured payload attached to a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Related order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Display number of the related order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Explicit navigation target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Anything else the backend attached.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

impl Notification {
    /// Whether this notification is still unread.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }

    /// Transition to read. Only the first transition stamps `read_at`;
    /// returns whether the status actually changed.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_unread() {
            return false;
        }
        self.status = NotificationStatus::Read;
        self.read_at = Some(at);
        true
    }

    /// Where clicking the notification should lead: the explicit action
    /// URL, else the related order's page.
    #[must_use]
    pub fn action_url(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        if let Some(url) = data.action_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        data.order_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("/dashboard/orders/{id}"))
    }
}
