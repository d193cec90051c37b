//! Provider kinds for bookable services

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of account a service belongs to.
///
/// Replaces the original discriminator-model pair (`provider` +
/// `providerModel`) with a tagged enum; wire values keep the historical
/// PascalCase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ProviderKind {
    Coach,
    HealthSpecialist,
    Gym,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Coach" => Ok(ProviderKind::Coach),
            "HealthSpecialist" => Ok(ProviderKind::HealthSpecialist),
            "Gym" => Ok(ProviderKind::Gym),
            _ => Err(format!("Invalid provider kind: {}", s)),
        }
    }
}

crate::models::impl_text_type!(ProviderKind);

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Coach => "Coach",
            ProviderKind::HealthSpecialist => "HealthSpecialist",
            ProviderKind::Gym => "Gym",
        }
    }

    /// Whether confirmed bookings enroll the client in the provider's
    /// client roster (gyms track members through subscriptions instead).
    pub fn tracks_clients(&self) -> bool {
        matches!(self, ProviderKind::Coach | ProviderKind::HealthSpecialist)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
