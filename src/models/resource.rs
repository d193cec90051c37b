//! Bookable resources: coaching services and sport fields

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::availability::DayAvailability;
use super::provider::ProviderKind;

/// A coaching/health/gym service with a weekly availability schedule
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub provider: Uuid,
    pub provider_kind: ProviderKind,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub max_participants: i32,
    pub availability: Vec<DayAvailability>,
    pub active: bool,
    /// Optimistic-lock counter for the availability document
    #[serde(skip)]
    pub availability_version: i64,
}

/// Sport type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SportType {
    Football,
    Tennis,
    Basketball,
    Padel,
    Volleyball,
    Swimming,
    Other,
}

impl SportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Football => "football",
            SportType::Tennis => "tennis",
            SportType::Basketball => "basketball",
            SportType::Padel => "padel",
            SportType::Volleyball => "volleyball",
            SportType::Swimming => "swimming",
            SportType::Other => "other",
        }
    }
}

impl std::fmt::Display for SportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "football" => Ok(SportType::Football),
            "tennis" => Ok(SportType::Tennis),
            "basketball" => Ok(SportType::Basketball),
            "padel" => Ok(SportType::Padel),
            "volleyball" => Ok(SportType::Volleyball),
            "swimming" => Ok(SportType::Swimming),
            "other" => Ok(SportType::Other),
            _ => Err(format!("Invalid sport type: {}", s)),
        }
    }
}

crate::models::impl_text_type!(SportType);

/// A rentable sport field.
///
/// The field record shares its id with the owning user account, so the id
/// doubles as the provider identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SportField {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub sport_type: SportType,
    pub capacity: i32,
    pub hourly_rate: Decimal,
    pub availability: Vec<DayAvailability>,
    #[serde(skip)]
    pub availability_version: i64,
}

/// Either bookable resource, dispatched by kind
#[derive(Debug, Clone)]
pub enum Resource {
    Service(Service),
    SportField(SportField),
}

impl Resource {
    /// User account that provides this resource
    pub fn provider_id(&self) -> Uuid {
        match self {
            Resource::Service(s) => s.provider,
            Resource::SportField(f) => f.id,
        }
    }

    /// Product label shown on the checkout session
    pub fn product_name(&self) -> String {
        match self {
            Resource::Service(s) => s.title.clone(),
            Resource::SportField(f) => format!("{} - {}", f.name, f.sport_type),
        }
    }

    /// Short label used in availability error messages
    pub fn kind_label(&self) -> &'static str {
        match self {
            Resource::Service(_) => "Service",
            Resource::SportField(_) => "Sport field",
        }
    }

    pub fn availability(&self) -> &[DayAvailability] {
        match self {
            Resource::Service(s) => &s.availability,
            Resource::SportField(f) => &f.availability,
        }
    }

    pub fn availability_mut(&mut self) -> &mut Vec<DayAvailability> {
        match self {
            Resource::Service(s) => &mut s.availability,
            Resource::SportField(f) => &mut f.availability,
        }
    }

    pub fn availability_version(&self) -> i64 {
        match self {
            Resource::Service(s) => s.availability_version,
            Resource::SportField(f) => f.availability_version,
        }
    }

    /// Price of a reservation over `[start, end)`.
    ///
    /// Services have a fixed price per session; fields bill their hourly
    /// rate pro rata in minutes.
    pub fn price_for(&self, start: NaiveTime, end: NaiveTime) -> Decimal {
        match self {
            Resource::Service(s) => s.price,
            Resource::SportField(f) => {
                let minutes = (end - start).num_minutes();
                f.hourly_rate * Decimal::from(minutes) / Decimal::from(60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn field(hourly_rate: i64) -> Resource {
        Resource::SportField(SportField {
            id: Uuid::new_v4(),
            name: "Central Arena".to_string(),
            description: String::new(),
            sport_type: SportType::Padel,
            capacity: 4,
            hourly_rate: Decimal::from(hourly_rate),
            availability: Vec::new(),
            availability_version: 0,
        })
    }

    #[test]
    fn field_price_supports_fractional_hours() {
        // 90 minutes at 40/hour
        assert_eq!(field(40).price_for(t(10, 0), t(11, 30)), Decimal::from(60));
    }

    #[test]
    fn field_price_full_hours() {
        assert_eq!(field(25).price_for(t(14, 0), t(16, 0)), Decimal::from(50));
    }

    #[test]
    fn service_price_is_fixed() {
        let resource = Resource::Service(Service {
            id: Uuid::new_v4(),
            title: "Personal training".to_string(),
            description: String::new(),
            provider: Uuid::new_v4(),
            provider_kind: ProviderKind::Coach,
            price: Decimal::from(80),
            duration_minutes: 60,
            max_participants: 1,
            availability: Vec::new(),
            active: true,
            availability_version: 0,
        });
        // Duration does not change a service's price
        assert_eq!(resource.price_for(t(9, 0), t(12, 0)), Decimal::from(80));
    }
}
