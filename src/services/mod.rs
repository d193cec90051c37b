//! Business logic services

pub mod bookings;
pub mod notifications;
pub mod payments;

use std::sync::Arc;

use crate::{config::StripeConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub bookings: bookings::BookingsService,
    pub notifications: notifications::NotificationService,
    pub payments: Arc<dyn payments::PaymentGateway>,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository and payment gateway
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn payments::PaymentGateway>,
        stripe_config: StripeConfig,
    ) -> AppResult<Self> {
        let notifications = notifications::NotificationService::new(repository.clone());

        Ok(Self {
            bookings: bookings::BookingsService::new(
                repository.clone(),
                gateway.clone(),
                notifications.clone(),
                stripe_config,
            ),
            notifications,
            payments: gateway,
            repository,
        })
    }
}
