//! Payment gateway webhook endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Receive a gateway checkout event.
///
/// The body must stay raw: the signature covers the exact bytes the
/// gateway sent. Once the signature verifies, the endpoint always acks
/// with 200 so the gateway stops redelivering; reconciliation failures
/// are logged instead of surfaced.
#[utoipa::path(
    post,
    path = "/webhook-checkout",
    tag = "webhooks",
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Invalid signature or payload")
    )
)]
pub async fn webhook_checkout(
    State(state): State<crate::AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let event = match state.services.payments.verify_webhook(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "rejected webhook delivery");
            return (StatusCode::BAD_REQUEST, format!("Webhook error: {}", err)).into_response();
        }
    };

    if event.event_type == "checkout.session.completed" {
        if let Err(err) = state
            .services
            .bookings
            .confirm_from_webhook(event.data.object)
            .await
        {
            tracing::error!(error = %err, "failed to reconcile checkout event");
        }
    }

    Json(json!({ "received": true })).into_response()
}
