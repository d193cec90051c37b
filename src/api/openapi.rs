//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, health, webhooks};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FlexMatch API",
        version = "1.0.0",
        description = "Sports & Coaching Marketplace Booking REST API",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "FlexMatch Team", email = "dev@flexmatch.tn")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Bookings
        bookings::create_payment_session,
        bookings::booking_success,
        bookings::booking_cancel,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::my_bookings,
        bookings::provider_bookings,
        // Webhooks
        webhooks::webhook_checkout,
    ),
    components(
        schemas(
            // Bookings
            bookings::CreateReservationRequest,
            bookings::ReservationResponse,
            bookings::BookingResponse,
            bookings::BookingsListResponse,
            crate::models::booking::Booking,
            crate::models::booking::Payment,
            crate::models::booking::BookingStatus,
            crate::models::booking::PaymentMethod,
            crate::models::booking::PaymentStatus,
            crate::models::availability::Slot,
            crate::models::availability::DayAvailability,
            crate::models::availability::Weekday,
            crate::services::payments::CheckoutSession,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "bookings", description = "Reservation and booking lifecycle"),
        (name = "webhooks", description = "Payment gateway callbacks")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
