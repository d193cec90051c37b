//! Booking model, embedded payment, and lifecycle transition rules

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::availability::hhmm;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

crate::models::impl_text_type!(BookingStatus);

/// How the client pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Online,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Online => "online",
            PaymentMethod::Cash => "cash",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(PaymentMethod::Online),
            "cash" => Ok(PaymentMethod::Cash),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

crate::models::impl_text_type!(PaymentMethod);

/// Payment settlement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

crate::models::impl_text_type!(PaymentStatus);

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// Payment details embedded in a booking
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// Reference to the booked resource; a booking targets exactly one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Service(Uuid),
    SportField(Uuid),
}

/// A user's reservation against a service or sport field
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport_field_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub participants: i32,
    pub status: BookingStatus,
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Create a pending booking for a resource
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        resource: ResourceRef,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        participants: i32,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Self {
        let (service_id, sport_field_id) = match resource {
            ResourceRef::Service(id) => (Some(id), None),
            ResourceRef::SportField(id) => (None, Some(id)),
        };

        Self {
            id: Uuid::new_v4(),
            user_id,
            service_id,
            sport_field_id,
            date,
            start_time,
            end_time,
            participants,
            status: BookingStatus::Pending,
            payment: Payment {
                amount,
                method,
                status: PaymentStatus::Pending,
                transaction_id: None,
            },
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// The booked resource reference
    pub fn resource(&self) -> AppResult<ResourceRef> {
        match (self.service_id, self.sport_field_id) {
            (Some(id), None) => Ok(ResourceRef::Service(id)),
            (None, Some(id)) => Ok(ResourceRef::SportField(id)),
            _ => Err(AppError::Internal(format!(
                "Booking {} does not reference exactly one resource",
                self.id
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Completed | BookingStatus::Cancelled
        )
    }

    /// Reject transitions out of a terminal state, naming the existing state
    pub fn ensure_active(&self) -> AppResult<()> {
        if self.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Booking is already {}",
                self.status
            )));
        }
        Ok(())
    }

    /// Cash confirmation: the booking is confirmed immediately, payment is
    /// settled in person so it stays pending.
    pub fn confirm_cash(&mut self) {
        self.status = BookingStatus::Confirmed;
        self.payment.status = PaymentStatus::Pending;
    }

    /// Apply a successful online payment (webhook or redirect fallback).
    ///
    /// Only a pending booking transitions; anything else is a no-op and
    /// returns `false`, which makes repeated webhook deliveries harmless.
    pub fn apply_payment_success(&mut self, transaction_id: Option<String>) -> bool {
        if self.status != BookingStatus::Pending {
            return false;
        }
        self.status = BookingStatus::Confirmed;
        self.payment.status = PaymentStatus::Completed;
        if transaction_id.is_some() {
            self.payment.transaction_id = transaction_id;
        }
        true
    }

    pub fn cancel(&mut self) {
        self.status = BookingStatus::Cancelled;
    }

    pub fn complete(&mut self) {
        self.status = BookingStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(method: PaymentMethod) -> Booking {
        Booking::new(
            Uuid::new_v4(),
            ResourceRef::Service(Uuid::new_v4()),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            1,
            Decimal::from(50),
            method,
        )
    }

    #[test]
    fn new_booking_starts_pending() {
        let b = booking(PaymentMethod::Online);
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.payment.status, PaymentStatus::Pending);
        assert!(b.payment.transaction_id.is_none());
    }

    #[test]
    fn cash_confirmation_leaves_payment_pending() {
        let mut b = booking(PaymentMethod::Cash);
        b.confirm_cash();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn payment_success_confirms_and_records_transaction() {
        let mut b = booking(PaymentMethod::Online);
        assert!(b.apply_payment_success(Some("pi_123".to_string())));
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.payment.status, PaymentStatus::Completed);
        assert_eq!(b.payment.transaction_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn repeated_payment_success_is_a_noop() {
        let mut b = booking(PaymentMethod::Online);
        assert!(b.apply_payment_success(Some("pi_123".to_string())));
        // Second delivery of the same event must not change anything
        assert!(!b.apply_payment_success(Some("pi_456".to_string())));
        assert_eq!(b.payment.transaction_id.as_deref(), Some("pi_123"));
        assert_eq!(b.status, BookingStatus::Confirmed);
    }

    #[test]
    fn payment_success_on_cancelled_booking_is_rejected() {
        let mut b = booking(PaymentMethod::Online);
        b.cancel();
        assert!(!b.apply_payment_success(Some("pi_123".to_string())));
        assert_eq!(b.status, BookingStatus::Cancelled);
        assert_eq!(b.payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn redirect_fallback_confirms_without_transaction_id() {
        let mut b = booking(PaymentMethod::Online);
        assert!(b.apply_payment_success(None));
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.payment.status, PaymentStatus::Completed);
        assert!(b.payment.transaction_id.is_none());
    }

    #[test]
    fn terminal_states_refuse_further_transitions() {
        let mut completed = booking(PaymentMethod::Cash);
        completed.complete();
        let err = completed.ensure_active().unwrap_err();
        assert!(err.to_string().contains("already completed"));

        let mut cancelled = booking(PaymentMethod::Cash);
        cancelled.cancel();
        let err = cancelled.ensure_active().unwrap_err();
        assert!(err.to_string().contains("already cancelled"));
    }

    #[test]
    fn resource_ref_resolves_the_set_side() {
        let b = booking(PaymentMethod::Cash);
        assert!(matches!(b.resource().unwrap(), ResourceRef::Service(_)));

        let f = Booking::new(
            Uuid::new_v4(),
            ResourceRef::SportField(Uuid::new_v4()),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            4,
            Decimal::from(40),
            PaymentMethod::Online,
        );
        assert!(matches!(f.resource().unwrap(), ResourceRef::SportField(_)));
    }
}
