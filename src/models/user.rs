//! User roles, JWT claims, and short profiles

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Client,
    Coach,
    HealthSpecialist,
    GymOwner,
    SportFieldOwner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Coach => "coach",
            Role::HealthSpecialist => "healthSpecialist",
            Role::GymOwner => "gymOwner",
            Role::SportFieldOwner => "sportFieldOwner",
            Role::Admin => "admin",
        }
    }

    /// Roles that own bookable resources
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Role::Coach | Role::HealthSpecialist | Role::GymOwner | Role::SportFieldOwner
        )
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "coach" => Ok(Role::Coach),
            "healthSpecialist" => Ok(Role::HealthSpecialist),
            "gymOwner" => Ok(Role::GymOwner),
            "sportFieldOwner" => Ok(Role::SportFieldOwner),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

crate::models::impl_text_type!(Role);

/// JWT claims carried by every authenticated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub role: Role,
    /// Expiry (seconds since epoch)
    pub exp: usize,
}

impl UserClaims {
    /// Decode and validate a bearer token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let data = decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Sign these claims into a bearer token
    pub fn to_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Cancellation is a client-facing action (or admin override)
    pub fn require_cancel_rights(&self) -> AppResult<()> {
        if self.role == Role::Client || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only clients can cancel their bookings".to_string(),
            ))
        }
    }

    /// Completion is reserved to providers (or admin override)
    pub fn require_completion_rights(&self) -> AppResult<()> {
        if self.role.is_provider() || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only providers can complete bookings".to_string(),
            ))
        }
    }

    /// Provider-only listings
    pub fn require_provider_rights(&self) -> AppResult<()> {
        if self.role.is_provider() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "This endpoint is reserved to providers".to_string(),
            ))
        }
    }
}

/// Short user profile used in notifications and provider rosters
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserShort {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl UserShort {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
