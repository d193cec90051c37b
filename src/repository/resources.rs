//! Services and sport fields repository, including the availability
//! document store with its optimistic version check

use sqlx::{types::Json, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        availability::DayAvailability,
        booking::ResourceRef,
        resource::{Resource, Service, SportField},
    },
};

#[derive(Clone)]
pub struct ResourcesRepository {
    pool: Pool<Postgres>,
}

impl ResourcesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load an active service with its availability document
    pub async fn find_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, provider_id, provider_kind, price,
                   duration_minutes, max_participants, availability,
                   availability_version, active
            FROM services
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let Json(availability): Json<Vec<DayAvailability>> = row.get("availability");
            Service {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                provider: row.get("provider_id"),
                provider_kind: row.get("provider_kind"),
                price: row.get("price"),
                duration_minutes: row.get("duration_minutes"),
                max_participants: row.get("max_participants"),
                availability,
                active: row.get("active"),
                availability_version: row.get("availability_version"),
            }
        }))
    }

    /// Load a sport field with its availability document
    pub async fn find_sport_field(&self, id: Uuid) -> AppResult<Option<SportField>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, sport_type, capacity, hourly_rate,
                   availability, availability_version
            FROM sport_fields
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let Json(availability): Json<Vec<DayAvailability>> = row.get("availability");
            SportField {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
                sport_type: row.get("sport_type"),
                capacity: row.get("capacity"),
                hourly_rate: row.get("hourly_rate"),
                availability,
                availability_version: row.get("availability_version"),
            }
        }))
    }

    /// Load either resource kind by reference
    pub async fn find_resource(&self, resource: ResourceRef) -> AppResult<Option<Resource>> {
        match resource {
            ResourceRef::Service(id) => {
                Ok(self.find_service(id).await?.map(Resource::Service))
            }
            ResourceRef::SportField(id) => {
                Ok(self.find_sport_field(id).await?.map(Resource::SportField))
            }
        }
    }

    /// Persist a resource's availability document.
    ///
    /// Conditional on the version the document was loaded at; returns
    /// `false` when a concurrent writer got there first, in which case the
    /// caller reloads and retries.
    pub async fn store_availability(&self, resource: &Resource) -> AppResult<bool> {
        let result = match resource {
            Resource::Service(service) => {
                sqlx::query(
                    r#"
                    UPDATE services
                    SET availability = $1,
                        availability_version = availability_version + 1
                    WHERE id = $2 AND availability_version = $3
                    "#,
                )
                .bind(Json(&service.availability))
                .bind(service.id)
                .bind(service.availability_version)
                .execute(&self.pool)
                .await?
            }
            Resource::SportField(field) => {
                sqlx::query(
                    r#"
                    UPDATE sport_fields
                    SET availability = $1,
                        availability_version = availability_version + 1
                    WHERE id = $2 AND availability_version = $3
                    "#,
                )
                .bind(Json(&field.availability))
                .bind(field.id)
                .bind(field.availability_version)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }

    /// Ids of all services offered by a provider
    pub async fn service_ids_for_provider(&self, provider_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM services WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
