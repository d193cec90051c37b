//! Notifications repository

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::notification::{CreateNotification, Notification},
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a notification row
    pub async fn insert(&self, data: &CreateNotification) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient: data.recipient,
            sender: data.sender,
            notification_type: data.notification_type,
            title: data.title.clone(),
            content: data.content.clone(),
            related_to: data.related_to.clone(),
            read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, sender_id, notification_type, title,
                content, related_model, related_id, read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(notification.id)
        .bind(notification.recipient)
        .bind(notification.sender)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(&notification.related_to.model)
        .bind(notification.related_to.id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }
}
