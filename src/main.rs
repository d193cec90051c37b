//! FlexMatch Server - Sports & Coaching Marketplace
//!
//! REST API server for the FlexMatch booking backend.

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flexmatch_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::payments::{PaymentGateway, StripeGateway},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("flexmatch_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FlexMatch Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository, payment gateway and services
    let repository = Repository::new(pool);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(config.stripe.clone()));
    let services = Services::new(repository, gateway, config.stripe.clone())
        .expect("Failed to create services");

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Per-IP rate limiting: 100 requests per rolling hour
    let governor_conf = Box::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(36))
            .burst_size(100)
            .finish()
            .expect("Invalid rate limiter configuration"),
    );

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Bookings
        .route("/bookings/payment-session", post(api::bookings::create_payment_session))
        .route("/bookings/success", get(api::bookings::booking_success))
        .route("/bookings/cancel", get(api::bookings::booking_cancel))
        .route("/bookings/my-bookings", get(api::bookings::my_bookings))
        .route("/bookings/provider-bookings", get(api::bookings::provider_bookings))
        .route("/bookings/:id/cancel", patch(api::bookings::cancel_booking))
        .route("/bookings/:id/complete", patch(api::bookings::complete_booking))
        .layer(GovernorLayer {
            config: Box::leak(governor_conf),
        })
        .with_state(state.clone());

    // The gateway webhook stays outside the rate-limited tree and receives
    // the raw request body for signature verification
    let webhooks = Router::new()
        .route("/webhook-checkout", post(api::webhooks::webhook_checkout))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhooks)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
