//! Booking engine: reservation coordination, webhook reconciliation,
//! cancellation and completion

use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::StripeConfig,
    error::{AppError, AppResult},
    models::{
        availability::{day_for, day_for_mut, Weekday},
        booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus, ResourceRef},
        notification::{CreateNotification, NotificationType, RelatedTo},
        resource::Resource,
        user::{Role, UserClaims},
    },
    repository::Repository,
    services::{
        notifications::NotificationService,
        payments::{CheckoutSession, CheckoutSessionObject, CheckoutSessionRequest, PaymentGateway},
    },
};

/// Bounded retries for the availability compare-and-swap loop
const AVAILABILITY_CAS_RETRIES: usize = 3;

/// Validated reservation input
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub resource: ResourceRef,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i32,
    pub payment_method: PaymentMethod,
}

/// Result of a reservation: the booking, plus a checkout session for
/// online payments
#[derive(Debug, Clone)]
pub struct ReservationOutcome {
    pub booking: Booking,
    pub session: Option<CheckoutSession>,
}

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationService,
    stripe: StripeConfig,
}

impl BookingsService {
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn PaymentGateway>,
        notifications: NotificationService,
        stripe: StripeConfig,
    ) -> Self {
        Self {
            repository,
            gateway,
            notifications,
            stripe,
        }
    }

    /// Reserve a slot against a service or sport field.
    ///
    /// Cash reservations are confirmed synchronously with their slot
    /// committed; online reservations stay pending with a free slot until
    /// the gateway confirms payment, so an abandoned checkout never holds
    /// inventory.
    pub async fn create_reservation(
        &self,
        claims: &UserClaims,
        input: CreateReservation,
    ) -> AppResult<ReservationOutcome> {
        if input.end_time <= input.start_time {
            return Err(AppError::Validation(
                "endTime must be after startTime".to_string(),
            ));
        }

        let resource = self.load_resource(input.resource).await?;
        let weekday = Weekday::from_date(input.date);

        let day = day_for(resource.availability(), weekday).ok_or_else(|| {
            AppError::Availability(format!(
                "{} is not available on this day",
                resource.kind_label()
            ))
        })?;

        match &resource {
            Resource::Service(_) => {
                if !day.slot_free(input.start_time) {
                    return Err(AppError::Availability(
                        "The slot is not available".to_string(),
                    ));
                }
            }
            Resource::SportField(_) => {
                if !day.range_free(input.start_time, input.end_time) {
                    return Err(AppError::Availability(
                        "One or more slots are not available".to_string(),
                    ));
                }
            }
        }

        let amount = resource.price_for(input.start_time, input.end_time);

        let mut booking = Booking::new(
            claims.sub,
            input.resource,
            input.date,
            input.start_time,
            input.end_time,
            input.participants,
            amount,
            input.payment_method,
        );
        self.repository.bookings.insert(&booking).await?;

        match input.payment_method {
            PaymentMethod::Cash => {
                // Inventory first: if the slot was raced away, the booking
                // stays pending and unpaid like an abandoned checkout.
                self.commit_slots(&booking).await?;

                booking.confirm_cash();
                self.repository.bookings.save(&booking).await?;

                self.notify_new_booking(
                    &booking,
                    resource.provider_id(),
                    claims.sub,
                    &claims.full_name(),
                )
                .await;

                Ok(ReservationOutcome {
                    booking,
                    session: None,
                })
            }
            PaymentMethod::Online => {
                let session = self
                    .gateway
                    .create_checkout_session(CheckoutSessionRequest {
                        success_url: format!("{}?booking={}", self.stripe.success_url, booking.id),
                        cancel_url: format!("{}?booking={}", self.stripe.cancel_url, booking.id),
                        customer_email: claims.email.clone(),
                        client_reference_id: booking.id.to_string(),
                        product_name: resource.product_name(),
                        product_description: format!(
                            "Booking for {} at {}",
                            booking.date,
                            booking.start_time.format("%H:%M")
                        ),
                        amount,
                        currency: self.stripe.currency.clone(),
                    })
                    .await?;

                Ok(ReservationOutcome {
                    booking,
                    session: Some(session),
                })
            }
        }
    }

    /// Apply a `checkout.session.completed` event.
    ///
    /// Every exit short of a storage failure is a deliberate no-op: the
    /// gateway redelivers on anything but an ack, and a deleted booking or
    /// an already-confirmed one must not turn into a retry storm.
    pub async fn confirm_from_webhook(&self, session: CheckoutSessionObject) -> AppResult<()> {
        let Some(reference) = session.client_reference_id else {
            tracing::warn!("checkout event without client_reference_id");
            return Ok(());
        };

        let Ok(booking_id) = Uuid::parse_str(&reference) else {
            tracing::warn!(reference = %reference, "unparseable booking reference in checkout event");
            return Ok(());
        };

        let Some(mut booking) = self.repository.bookings.find_by_id(booking_id).await? else {
            tracing::warn!(booking = %booking_id, "checkout event for unknown booking");
            return Ok(());
        };

        if booking.status != BookingStatus::Pending {
            tracing::debug!(
                booking = %booking.id,
                status = %booking.status,
                "checkout event already processed"
            );
            return Ok(());
        }

        // Commit inventory before the state transition, so a lost slot race
        // leaves the booking pending rather than confirmed without a slot.
        self.commit_slots(&booking).await?;

        booking.apply_payment_success(session.payment_intent);
        self.repository.bookings.save(&booking).await?;

        self.after_confirmation(&booking).await;
        Ok(())
    }

    /// Fallback confirmation after the browser returns from checkout, for
    /// the case where the webhook is delayed or never arrives.
    pub async fn confirm_success_redirect(&self, booking_id: Uuid) -> AppResult<Booking> {
        let mut booking = self.repository.bookings.get_by_id(booking_id).await?;

        if booking.status == BookingStatus::Pending {
            // No transaction id is available on this path
            self.commit_slots(&booking).await?;
            booking.apply_payment_success(None);
            self.repository.bookings.save(&booking).await?;

            self.after_confirmation(&booking).await;
        }

        Ok(booking)
    }

    /// The checkout was abandoned; drop the pending booking.
    pub async fn cancel_redirect(&self, booking_id: Uuid) -> AppResult<Booking> {
        let mut booking = self.repository.bookings.get_by_id(booking_id).await?;

        if booking.status == BookingStatus::Pending {
            // The slot was never committed for an unpaid checkout, only the
            // booking record needs to move.
            booking.cancel();
            self.repository.bookings.save(&booking).await?;
        }

        Ok(booking)
    }

    /// Cancel a booking on behalf of its owner (or an admin), releasing
    /// inventory and refunding online payments best-effort.
    pub async fn cancel_booking(&self, booking_id: Uuid, claims: &UserClaims) -> AppResult<Booking> {
        let mut booking = self.repository.bookings.get_by_id(booking_id).await?;

        if booking.user_id != claims.sub && !claims.is_admin() {
            return Err(AppError::Authorization(
                "You are not allowed to cancel this booking".to_string(),
            ));
        }

        booking.ensure_active()?;

        // Release inventory before the terminal mark. A pending booking
        // never committed its slot.
        if booking.status == BookingStatus::Confirmed {
            self.release_slots(&booking).await?;
        }

        booking.cancel();
        self.repository.bookings.save(&booking).await?;

        if let Ok(Some(resource)) = self.repository.resources.find_resource(booking.resource()?).await
        {
            self.notifications
                .notify(CreateNotification {
                    recipient: resource.provider_id(),
                    sender: Some(claims.sub),
                    notification_type: NotificationType::BookingCancelled,
                    title: "Booking cancelled".to_string(),
                    content: format!(
                        "The booking from {} for {} at {} has been cancelled.",
                        claims.full_name(),
                        booking.date,
                        booking.start_time.format("%H:%M")
                    ),
                    related_to: RelatedTo::booking(booking.id),
                })
                .await;
        }

        if refund_online_payment(self.gateway.as_ref(), &mut booking).await {
            self.repository.bookings.save(&booking).await?;
        }

        Ok(booking)
    }

    /// Mark a session as held, on behalf of the resource's provider (or an
    /// admin), prompting the client for a review.
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        claims: &UserClaims,
    ) -> AppResult<Booking> {
        let mut booking = self.repository.bookings.get_by_id(booking_id).await?;

        let resource = self
            .repository
            .resources
            .find_resource(booking.resource()?)
            .await?;
        let is_provider = resource
            .as_ref()
            .map(|r| r.provider_id() == claims.sub)
            .unwrap_or(false);

        if !is_provider && !claims.is_admin() {
            return Err(AppError::Authorization(
                "You are not allowed to complete this booking".to_string(),
            ));
        }

        booking.ensure_active()?;

        booking.complete();
        self.repository.bookings.save(&booking).await?;

        self.notifications
            .notify(CreateNotification {
                recipient: booking.user_id,
                sender: Some(claims.sub),
                notification_type: NotificationType::ReminderSession,
                title: "Session completed".to_string(),
                content: format!(
                    "Your session on {} at {} has been marked as completed. Feel free to leave a review!",
                    booking.date,
                    booking.start_time.format("%H:%M")
                ),
                related_to: RelatedTo::booking(booking.id),
            })
            .await;

        Ok(booking)
    }

    /// Bookings made by the authenticated user
    pub async fn my_bookings(&self, user_id: Uuid) -> AppResult<Vec<Booking>> {
        self.repository.bookings.list_for_user(user_id).await
    }

    /// Bookings received by a provider, dispatched on role
    pub async fn provider_bookings(&self, claims: &UserClaims) -> AppResult<Vec<Booking>> {
        match claims.role {
            Role::Coach | Role::HealthSpecialist | Role::GymOwner => {
                let service_ids = self
                    .repository
                    .resources
                    .service_ids_for_provider(claims.sub)
                    .await?;
                if service_ids.is_empty() {
                    return Ok(Vec::new());
                }
                self.repository.bookings.list_for_services(&service_ids).await
            }
            Role::SportFieldOwner => {
                self.repository.bookings.list_for_sport_field(claims.sub).await
            }
            _ => Err(AppError::Authorization(
                "This endpoint is reserved to providers".to_string(),
            )),
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn load_resource(&self, resource_ref: ResourceRef) -> AppResult<Resource> {
        let missing = match resource_ref {
            ResourceRef::Service(_) => "Service not found",
            ResourceRef::SportField(_) => "Sport field not found",
        };
        self.repository
            .resources
            .find_resource(resource_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(missing.to_string()))
    }

    /// Mark the booking's slot(s) as occupied.
    ///
    /// Runs a compare-and-swap loop over the resource's availability
    /// document: the occupancy re-check inside the loop turns a lost race
    /// into an availability rejection instead of a silent double booking.
    async fn commit_slots(&self, booking: &Booking) -> AppResult<()> {
        let resource_ref = booking.resource()?;
        let weekday = Weekday::from_date(booking.date);

        for _ in 0..AVAILABILITY_CAS_RETRIES {
            let mut resource = self.load_resource(resource_ref).await?;
            let kind_label = resource.kind_label();

            let day = day_for_mut(resource.availability_mut(), weekday).ok_or_else(|| {
                AppError::Availability(format!("{} is not available on this day", kind_label))
            })?;

            let committed = match resource_ref {
                ResourceRef::Service(_) => day.book_slot(booking.start_time),
                ResourceRef::SportField(_) => {
                    day.book_range(booking.start_time, booking.end_time, booking.id)
                }
            };

            if !committed {
                return Err(AppError::Availability(
                    "The slot is no longer available".to_string(),
                ));
            }

            if self.repository.resources.store_availability(&resource).await? {
                return Ok(());
            }
            // Lost the version race; reload and retry
        }

        Err(AppError::Conflict(
            "Availability was updated concurrently, please retry".to_string(),
        ))
    }

    /// Free the booking's slot(s); the inverse of [`Self::commit_slots`].
    async fn release_slots(&self, booking: &Booking) -> AppResult<()> {
        let resource_ref = booking.resource()?;
        let weekday = Weekday::from_date(booking.date);

        for _ in 0..AVAILABILITY_CAS_RETRIES {
            let Some(mut resource) =
                self.repository.resources.find_resource(resource_ref).await?
            else {
                tracing::warn!(booking = %booking.id, "resource is gone, no slot to release");
                return Ok(());
            };

            let Some(day) = day_for_mut(resource.availability_mut(), weekday) else {
                return Ok(());
            };

            match resource_ref {
                ResourceRef::Service(_) => {
                    day.release_slot(booking.start_time);
                }
                ResourceRef::SportField(_) => {
                    day.release_range(booking.start_time, booking.end_time);
                }
            }

            if self.repository.resources.store_availability(&resource).await? {
                return Ok(());
            }
        }

        Err(AppError::Conflict(
            "Availability was updated concurrently, please retry".to_string(),
        ))
    }

    /// Side effects of a confirmed online payment: roster enrollment and
    /// notifications. Failures here are logged, never bubbled into the
    /// webhook ack.
    async fn after_confirmation(&self, booking: &Booking) {
        self.notifications
            .notify(CreateNotification {
                recipient: booking.user_id,
                sender: None,
                notification_type: NotificationType::BookingConfirmed,
                title: "Booking confirmed".to_string(),
                content: format!(
                    "Your booking for {} at {} has been confirmed!",
                    booking.date,
                    booking.start_time.format("%H:%M")
                ),
                related_to: RelatedTo::booking(booking.id),
            })
            .await;

        let resource_ref = match booking.resource() {
            Ok(r) => r,
            Err(err) => {
                tracing::error!(booking = %booking.id, error = %err, "confirmed booking without resource");
                return;
            }
        };

        let resource = match self.repository.resources.find_resource(resource_ref).await {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                tracing::warn!(booking = %booking.id, "confirmed booking against a vanished resource");
                return;
            }
            Err(err) => {
                tracing::error!(booking = %booking.id, error = %err, "failed to load resource after confirmation");
                return;
            }
        };

        if let Resource::Service(service) = &resource {
            if service.provider_kind.tracks_clients() {
                if let Err(err) = self
                    .repository
                    .users
                    .add_provider_client(service.provider, booking.user_id)
                    .await
                {
                    tracing::error!(
                        provider = %service.provider,
                        client = %booking.user_id,
                        error = %err,
                        "failed to enroll client in provider roster"
                    );
                }
            }
        }

        let client_name = match self.repository.users.find_short(booking.user_id).await {
            Ok(Some(user)) => user.full_name(),
            _ => "A client".to_string(),
        };

        self.notify_new_booking(booking, resource.provider_id(), booking.user_id, &client_name)
            .await;
    }

    async fn notify_new_booking(
        &self,
        booking: &Booking,
        provider_id: Uuid,
        sender: Uuid,
        client_name: &str,
    ) {
        self.notifications
            .notify(CreateNotification {
                recipient: provider_id,
                sender: Some(sender),
                notification_type: NotificationType::BookingConfirmed,
                title: "New booking".to_string(),
                content: format!(
                    "You have a new booking from {} for {} at {}",
                    client_name,
                    booking.date,
                    booking.start_time.format("%H:%M")
                ),
                related_to: RelatedTo::booking(booking.id),
            })
            .await;
    }
}

/// Refund a cancelled booking's online payment, tolerating gateway failure.
///
/// Returns whether the booking changed. A failed refund is logged and
/// swallowed: the cancellation itself already happened, and support can
/// replay the refund from the gateway dashboard.
pub async fn refund_online_payment(gateway: &dyn PaymentGateway, booking: &mut Booking) -> bool {
    if booking.payment.method != PaymentMethod::Online
        || booking.payment.status != PaymentStatus::Completed
    {
        return false;
    }

    let Some(transaction_id) = booking.payment.transaction_id.clone() else {
        return false;
    };

    match gateway
        .create_refund(&transaction_id, "requested_by_customer")
        .await
    {
        Ok(refund) => {
            tracing::info!(booking = %booking.id, refund = %refund.id, "payment refunded");
            booking.payment.status = PaymentStatus::Refunded;
            true
        }
        Err(err) => {
            tracing::warn!(
                booking = %booking.id,
                error = %err,
                "refund failed, booking remains cancelled"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::availability::{DayAvailability, Slot};
    use crate::services::payments::{MockPaymentGateway, Refund};
    use rust_decimal::Decimal;

    fn online_booking() -> Booking {
        let mut booking = Booking::new(
            Uuid::new_v4(),
            ResourceRef::Service(Uuid::new_v4()),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            1,
            Decimal::from(50),
            PaymentMethod::Online,
        );
        booking.apply_payment_success(Some("pi_123".to_string()));
        booking
    }

    #[tokio::test]
    async fn successful_refund_marks_payment_refunded() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_refund()
            .withf(|txid, reason| txid == "pi_123" && reason == "requested_by_customer")
            .times(1)
            .returning(|_, _| Ok(Refund { id: "re_1".to_string() }));

        let mut booking = online_booking();
        booking.cancel();

        assert!(refund_online_payment(&gateway, &mut booking).await);
        assert_eq!(booking.payment.status, PaymentStatus::Refunded);
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn failed_refund_leaves_the_cancellation_intact() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_refund()
            .times(1)
            .returning(|_, _| Err(AppError::Gateway("card network unavailable".to_string())));

        let mut booking = online_booking();
        booking.cancel();

        assert!(!refund_online_payment(&gateway, &mut booking).await);
        // The failed refund must not undo the cancellation or fake a refund
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment.status, PaymentStatus::Completed);
        assert_eq!(booking.payment.transaction_id.as_deref(), Some("pi_123"));
    }

    #[tokio::test]
    async fn cash_bookings_never_reach_the_gateway() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_refund().times(0);

        let mut booking = Booking::new(
            Uuid::new_v4(),
            ResourceRef::SportField(Uuid::new_v4()),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            4,
            Decimal::from(40),
            PaymentMethod::Cash,
        );
        booking.confirm_cash();
        booking.cancel();

        assert!(!refund_online_payment(&gateway, &mut booking).await);
        assert_eq!(booking.payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn cash_reservation_commits_the_slot_and_cancellation_frees_it() {
        let service_id = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        let mut day = DayAvailability {
            day: Weekday::Monday,
            slots: vec![Slot {
                start_time: nine,
                end_time: ten,
                is_booked: false,
                booking: None,
            }],
        };

        let mut booking = Booking::new(
            Uuid::new_v4(),
            ResourceRef::Service(service_id),
            monday,
            nine,
            ten,
            1,
            Decimal::from(50),
            PaymentMethod::Cash,
        );

        // Reservation: the slot is free, gets committed, and the booking
        // confirms synchronously
        assert!(day.slot_free(nine));
        assert!(day.book_slot(nine));
        booking.confirm_cash();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(!day.slot_free(nine));

        // Owner cancellation: the slot is released before the terminal mark
        booking.ensure_active().unwrap();
        assert!(day.release_slot(nine));
        booking.cancel();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert!(day.slot_free(nine));
    }

    #[tokio::test]
    async fn unsettled_online_payments_are_not_refunded() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_refund().times(0);

        // Online booking cancelled before the webhook ever confirmed it
        let mut booking = Booking::new(
            Uuid::new_v4(),
            ResourceRef::Service(Uuid::new_v4()),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            1,
            Decimal::from(50),
            PaymentMethod::Online,
        );
        booking.cancel();

        assert!(!refund_online_payment(&gateway, &mut booking).await);
        assert_eq!(booking.payment.status, PaymentStatus::Pending);
    }
}
