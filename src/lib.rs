//! FlexMatch Booking Server
//!
//! A Rust implementation of the FlexMatch marketplace booking backend,
//! providing a REST JSON API for reserving coaching services and sport
//! fields, reconciling payment-gateway webhooks, and managing the booking
//! lifecycle.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
