//! Bookings repository for database operations

use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, Payment},
};

fn booking_from_row(row: &PgRow) -> Booking {
    Booking {
        id: row.get("id"),
        user_id: row.get("user_id"),
        service_id: row.get("service_id"),
        sport_field_id: row.get("sport_field_id"),
        date: row.get("date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        participants: row.get("participants"),
        status: row.get("status"),
        payment: Payment {
            amount: row.get("payment_amount"),
            method: row.get("payment_method"),
            status: row.get("payment_status"),
            transaction_id: row.get("payment_transaction_id"),
        },
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    }
}

const SELECT_BOOKING: &str = r#"
    SELECT id, user_id, service_id, sport_field_id, date, start_time,
           end_time, participants, status, payment_amount, payment_method,
           payment_status, payment_transaction_id, notes, created_at
    FROM bookings
"#;

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find a booking by id
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_BOOKING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(booking_from_row))
    }

    /// Get a booking by id, failing when absent
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Booking> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    /// Insert a freshly created booking
    pub async fn insert(&self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, user_id, service_id, sport_field_id, date, start_time,
                end_time, participants, status, payment_amount, payment_method,
                payment_status, payment_transaction_id, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.service_id)
        .bind(booking.sport_field_id)
        .bind(booking.date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.participants)
        .bind(booking.status)
        .bind(booking.payment.amount)
        .bind(booking.payment.method)
        .bind(booking.payment.status)
        .bind(&booking.payment.transaction_id)
        .bind(&booking.notes)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist mutable booking state (status and payment fields)
    pub async fn save(&self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET status = $1,
                payment_status = $2,
                payment_transaction_id = $3,
                notes = $4
            WHERE id = $5
            "#,
        )
        .bind(booking.status)
        .bind(booking.payment.status)
        .bind(&booking.payment.transaction_id)
        .bind(&booking.notes)
        .bind(booking.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bookings made by a user
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = $1 ORDER BY date, start_time",
            SELECT_BOOKING
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(booking_from_row).collect())
    }

    /// Bookings against any of the given services
    pub async fn list_for_services(&self, service_ids: &[Uuid]) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{} WHERE service_id = ANY($1) ORDER BY date, start_time",
            SELECT_BOOKING
        ))
        .bind(service_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(booking_from_row).collect())
    }

    /// Bookings against a sport field
    pub async fn list_for_sport_field(&self, field_id: Uuid) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{} WHERE sport_field_id = $1 ORDER BY date, start_time",
            SELECT_BOOKING
        ))
        .bind(field_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(booking_from_row).collect())
    }
}
