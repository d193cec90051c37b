//! API integration tests
//!
//! These run against a server started locally with the default
//! development configuration (`cargo run`), hence the `#[ignore]`s.

use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use flexmatch_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const DEV_JWT_SECRET: &str = "change-this-secret-in-production";

/// Mint a bearer token the way the auth frontend would
fn token_for(role: Role) -> String {
    let claims = UserClaims {
        sub: Uuid::new_v4(),
        email: "test@flexmatch.tn".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    claims.to_token(DEV_JWT_SECRET).expect("Failed to sign token")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_reservation_requires_authentication() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings/payment-session", BASE_URL))
        .json(&json!({
            "serviceId": Uuid::new_v4(),
            "date": "2025-06-02",
            "startTime": "09:00",
            "endTime": "10:00"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_reservation_requires_date_and_times() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings/payment-session", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_for(Role::Client)))
        .json(&json!({
            "serviceId": Uuid::new_v4()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("date, startTime and endTime"));
}

#[tokio::test]
#[ignore]
async fn test_reservation_requires_exactly_one_resource() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings/payment-session", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_for(Role::Client)))
        .json(&json!({
            "serviceId": Uuid::new_v4(),
            "sportFieldId": Uuid::new_v4(),
            "date": "2025-06-02",
            "startTime": "09:00",
            "endTime": "10:00"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("serviceId or sportFieldId"));
}

#[tokio::test]
#[ignore]
async fn test_reservation_against_unknown_service_is_404() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings/payment-session", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_for(Role::Client)))
        .json(&json!({
            "serviceId": Uuid::new_v4(),
            "date": "2025-06-02",
            "startTime": "09:00",
            "endTime": "10:00",
            "paymentMethod": "cash"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_cancel_unknown_booking_is_404() {
    let client = Client::new();

    let response = client
        .patch(format!("{}/bookings/{}/cancel", BASE_URL, Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", token_for(Role::Client)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_provider_bookings_rejects_clients() {
    let client = Client::new();

    let response = client
        .get(format!("{}/bookings/provider-bookings", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_for(Role::Client)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_webhook_rejects_an_unsigned_delivery() {
    let client = Client::new();

    let response = client
        .post("http://localhost:8080/webhook-checkout")
        .header("Content-Type", "application/json")
        .body(r#"{"type":"checkout.session.completed","data":{"object":{}}}"#)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_success_redirect_requires_booking_id() {
    let client = Client::new();

    let response = client
        .get(format!("{}/bookings/success", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
