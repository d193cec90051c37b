//! Users repository: short profiles and provider client rosters

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{error::AppResult, models::user::UserShort};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Short profile for notification content and checkout emails
    pub async fn find_short(&self, id: Uuid) -> AppResult<Option<UserShort>> {
        let user = sqlx::query_as::<_, UserShort>(
            "SELECT id, first_name, last_name, email, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Enroll a client in a provider's roster; repeat enrollments are no-ops
    pub async fn add_provider_client(&self, provider_id: Uuid, client_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO provider_clients (provider_id, client_id)
            VALUES ($1, $2)
            ON CONFLICT (provider_id, client_id) DO NOTHING
            "#,
        )
        .bind(provider_id)
        .bind(client_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
