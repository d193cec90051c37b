//! Booking endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        availability::parse_time,
        booking::{Booking, PaymentMethod, ResourceRef},
    },
    services::{bookings::CreateReservation, payments::CheckoutSession},
};

use super::AuthenticatedUser;

/// Reservation request
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    /// Service to book (exclusive with `sportFieldId`)
    pub service_id: Option<Uuid>,
    /// Sport field to book (exclusive with `serviceId`)
    pub sport_field_id: Option<Uuid>,
    /// Reservation date (YYYY-MM-DD)
    pub date: Option<String>,
    /// Start time (HH:MM)
    pub start_time: Option<String>,
    /// End time (HH:MM)
    pub end_time: Option<String>,
    #[validate(range(min = 1))]
    pub participants: Option<i32>,
    /// Defaults to online
    pub payment_method: Option<PaymentMethod>,
}

/// Reservation response; `session` is present for online payments
#[derive(Serialize, ToSchema)]
pub struct ReservationResponse {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<CheckoutSession>,
}

/// Single booking response
#[derive(Serialize, ToSchema)]
pub struct BookingResponse {
    pub booking: Booking,
}

/// Booking list response
#[derive(Serialize, ToSchema)]
pub struct BookingsListResponse {
    pub results: usize,
    pub bookings: Vec<Booking>,
}

/// Query parameters of the checkout redirect endpoints
#[derive(Deserialize, IntoParams)]
pub struct RedirectQuery {
    /// Booking ID
    pub booking: Option<Uuid>,
}

impl CreateReservationRequest {
    fn into_input(self) -> AppResult<CreateReservation> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let (date, start_time, end_time) = match (&self.date, &self.start_time, &self.end_time) {
            (Some(date), Some(start), Some(end)) => (date, start, end),
            _ => {
                return Err(AppError::Validation(
                    "Please provide date, startTime and endTime".to_string(),
                ))
            }
        };

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date))
        })?;
        let start_time = parse_time(start_time).map_err(AppError::Validation)?;
        let end_time = parse_time(end_time).map_err(AppError::Validation)?;

        let resource = match (self.service_id, self.sport_field_id) {
            (Some(id), None) => ResourceRef::Service(id),
            (None, Some(id)) => ResourceRef::SportField(id),
            _ => {
                return Err(AppError::Validation(
                    "Please provide either serviceId or sportFieldId".to_string(),
                ))
            }
        };

        Ok(CreateReservation {
            resource,
            date,
            start_time,
            end_time,
            participants: self.participants.unwrap_or(1),
            payment_method: self.payment_method.unwrap_or(PaymentMethod::Online),
        })
    }
}

/// Reserve a slot, creating a checkout session for online payments
#[utoipa::path(
    post,
    path = "/bookings/payment-session",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation created", body = ReservationResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Service or sport field not found"),
        (status = 409, description = "Requested slot unavailable")
    )
)]
pub async fn create_payment_session(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    let input = request.into_input()?;

    let outcome = state
        .services
        .bookings
        .create_reservation(&claims, input)
        .await?;

    Ok(Json(ReservationResponse {
        booking: outcome.booking,
        session: outcome.session,
    }))
}

/// Checkout success redirect; confirms the booking when the webhook has
/// not arrived yet
#[utoipa::path(
    get,
    path = "/bookings/success",
    tag = "bookings",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Booking state after the redirect", body = BookingResponse),
        (status = 400, description = "Missing booking id"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn booking_success(
    State(state): State<crate::AppState>,
    Query(query): Query<RedirectQuery>,
) -> AppResult<Json<BookingResponse>> {
    let booking_id = query
        .booking
        .ok_or_else(|| AppError::Validation("Booking id not provided".to_string()))?;

    let booking = state
        .services
        .bookings
        .confirm_success_redirect(booking_id)
        .await?;

    Ok(Json(BookingResponse { booking }))
}

/// Checkout cancel redirect; drops a still-pending booking
#[utoipa::path(
    get,
    path = "/bookings/cancel",
    tag = "bookings",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Booking state after the redirect", body = BookingResponse),
        (status = 400, description = "Missing booking id"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn booking_cancel(
    State(state): State<crate::AppState>,
    Query(query): Query<RedirectQuery>,
) -> AppResult<Json<BookingResponse>> {
    let booking_id = query
        .booking
        .ok_or_else(|| AppError::Validation("Booking id not provided".to_string()))?;

    let booking = state.services.bookings.cancel_redirect(booking_id).await?;

    Ok(Json(BookingResponse { booking }))
}

/// Cancel a booking (owner or admin)
#[utoipa::path(
    patch,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 403, description = "Not the booking owner"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already completed or cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    claims.require_cancel_rights()?;

    let booking = state
        .services
        .bookings
        .cancel_booking(booking_id, &claims)
        .await?;

    Ok(Json(BookingResponse { booking }))
}

/// Mark a booking as completed (provider or admin)
#[utoipa::path(
    patch,
    path = "/bookings/{id}/complete",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking completed", body = BookingResponse),
        (status = 403, description = "Not the resource provider"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already completed or cancelled")
    )
)]
pub async fn complete_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    claims.require_completion_rights()?;

    let booking = state
        .services
        .bookings
        .complete_booking(booking_id, &claims)
        .await?;

    Ok(Json(BookingResponse { booking }))
}

/// List the authenticated user's bookings
#[utoipa::path(
    get,
    path = "/bookings/my-bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The user's bookings", body = BookingsListResponse)
    )
)]
pub async fn my_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BookingsListResponse>> {
    let bookings = state.services.bookings.my_bookings(claims.sub).await?;

    Ok(Json(BookingsListResponse {
        results: bookings.len(),
        bookings,
    }))
}

/// List bookings received as a provider
#[utoipa::path(
    get,
    path = "/bookings/provider-bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bookings against the provider's resources", body = BookingsListResponse),
        (status = 403, description = "Not a provider account")
    )
)]
pub async fn provider_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BookingsListResponse>> {
    claims.require_provider_rights()?;

    let bookings = state.services.bookings.provider_bookings(&claims).await?;

    Ok(Json(BookingsListResponse {
        results: bookings.len(),
        bookings,
    }))
}
