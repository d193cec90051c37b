//! Notification sink

use crate::{models::notification::CreateNotification, repository::Repository};

/// Fire-and-forget notification delivery.
///
/// Notifications are a side effect of booking operations, never part of
/// their correctness: a failed insert is logged and swallowed.
#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
}

impl NotificationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn notify(&self, notification: CreateNotification) {
        if let Err(err) = self.repository.notifications.insert(&notification).await {
            tracing::error!(
                recipient = %notification.recipient,
                error = %err,
                "failed to deliver notification"
            );
        }
    }
}
