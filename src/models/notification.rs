//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Notification categories emitted by the booking engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    BookingConfirmed,
    BookingCancelled,
    ReminderSession,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BookingConfirmed => "bookingConfirmed",
            NotificationType::BookingCancelled => "bookingCancelled",
            NotificationType::ReminderSession => "reminderSession",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bookingConfirmed" => Ok(NotificationType::BookingConfirmed),
            "bookingCancelled" => Ok(NotificationType::BookingCancelled),
            "reminderSession" => Ok(NotificationType::ReminderSession),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

crate::models::impl_text_type!(NotificationType);

/// Entity a notification points back to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelatedTo {
    pub model: String,
    pub id: Uuid,
}

impl RelatedTo {
    pub fn booking(id: Uuid) -> Self {
        Self {
            model: "Booking".to_string(),
            id,
        }
    }
}

/// Stored notification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Uuid>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub related_to: RelatedTo,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification creation request consumed by the sink
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient: Uuid,
    pub sender: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub related_to: RelatedTo,
}
