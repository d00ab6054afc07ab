//! Agency offices and branches.
//!
//! Locations are tenant-scoped: the organization always comes from the
//! request context, never from the payload. An organization has at most one
//! default location; marking another one as default releases the flag in the
//! same transaction.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocation {
    pub name: String,
    pub address: Address,
    pub timezone: Option<String>,
    pub is_default: bool,
}

/// Partial edit. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationChanges {
    pub name: Option<String>,
    pub address: Address,
    pub timezone: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocationRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_region: Option<String>,
    pub address_postal_code: Option<String>,
    pub address_country: Option<String>,
    pub timezone: Option<String>,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SELECT_COLUMNS: &str = "SELECT id, organization_id, name, address_street, address_city, address_region,
            address_postal_code, address_country, timezone, is_default, created_at, updated_at
     FROM locations";

/// Newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_locations(pool: &PgPool, organization_id: Uuid) -> ServiceResult<Vec<LocationRow>> {
    let sql = format!("{SELECT_COLUMNS} WHERE organization_id = $1 ORDER BY created_at DESC");
    Ok(sqlx::query_as::<_, LocationRow>(&sql).bind(organization_id).fetch_all(pool).await?)
}

/// # Errors
///
/// Returns `NotFound` if the location does not exist in this organization.
pub async fn get_location(pool: &PgPool, organization_id: Uuid, location_id: Uuid) -> ServiceResult<LocationRow> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1 AND organization_id = $2");
    sqlx::query_as::<_, LocationRow>(&sql)
        .bind(location_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("location", location_id))
}

/// Drop the default flag from every location in the organization except `keep`.
async fn clear_other_defaults(conn: &mut PgConnection, organization_id: Uuid, keep: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE locations SET is_default = FALSE, updated_at = now()
         WHERE organization_id = $1 AND is_default AND id <> $2",
    )
    .bind(organization_id)
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_location(pool: &PgPool, organization_id: Uuid, new: NewLocation) -> ServiceResult<LocationRow> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    if new.is_default {
        clear_other_defaults(&mut tx, organization_id, id).await?;
    }
    sqlx::query(
        "INSERT INTO locations (
            id, organization_id, name, address_street, address_city, address_region,
            address_postal_code, address_country, timezone, is_default
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(&new.name)
    .bind(&new.address.street)
    .bind(&new.address.city)
    .bind(&new.address.region)
    .bind(&new.address.postal_code)
    .bind(&new.address.country)
    .bind(&new.timezone)
    .bind(new.is_default)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%id, %organization_id, is_default = new.is_default, "location created");
    get_location(pool, organization_id, id).await
}

/// # Errors
///
/// Returns `NotFound` for an unknown location.
pub async fn update_location(
    pool: &PgPool,
    organization_id: Uuid,
    location_id: Uuid,
    changes: LocationChanges,
) -> ServiceResult<LocationRow> {
    let current = get_location(pool, organization_id, location_id).await?;
    let is_default = changes.is_default.unwrap_or(current.is_default);

    let mut tx = pool.begin().await?;
    if is_default {
        clear_other_defaults(&mut tx, organization_id, location_id).await?;
    }
    sqlx::query(
        "UPDATE locations SET
            name = COALESCE($3, name),
            address_street = COALESCE($4, address_street),
            address_city = COALESCE($5, address_city),
            address_region = COALESCE($6, address_region),
            address_postal_code = COALESCE($7, address_postal_code),
            address_country = COALESCE($8, address_country),
            timezone = COALESCE($9, timezone),
            is_default = $10,
            updated_at = now()
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(location_id)
    .bind(organization_id)
    .bind(changes.name)
    .bind(changes.address.street)
    .bind(changes.address.city)
    .bind(changes.address.region)
    .bind(changes.address.postal_code)
    .bind(changes.address.country)
    .bind(changes.timezone)
    .bind(is_default)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    get_location(pool, organization_id, location_id).await
}

/// # Errors
///
/// Returns `NotFound` if nothing was deleted.
pub async fn delete_location(pool: &PgPool, organization_id: Uuid, location_id: Uuid) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM locations WHERE id = $1 AND organization_id = $2")
        .bind(location_id)
        .bind(organization_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("location", location_id));
    }
    info!(%location_id, %organization_id, "deleted location");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_serializes_flat_address_fields() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let row = LocationRow {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            name: "North Office".into(),
            address_street: Some("12 Main St".into()),
            address_city: Some("Pune".into()),
            address_region: None,
            address_postal_code: None,
            address_country: Some("IN".into()),
            timezone: None,
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["address_city"], "Pune");
        assert_eq!(json["is_default"], true);
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }

    #[cfg(feature = "live-db-tests")]
    mod live {
        use super::*;
        use crate::state::test_helpers::live_app_state;

        fn office(name: &str, is_default: bool) -> NewLocation {
            NewLocation { name: name.into(), address: Address::default(), timezone: None, is_default }
        }

        #[tokio::test]
        async fn new_default_releases_previous_and_delete_is_scoped() {
            let state = live_app_state().await;
            let org = Uuid::nil();
            let first = create_location(&state.pool, org, office("First", true)).await.unwrap();
            let second = create_location(&state.pool, org, office("Second", true)).await.unwrap();

            let first = get_location(&state.pool, org, first.id).await.unwrap();
            assert!(!first.is_default);
            assert!(second.is_default);

            let err = delete_location(&state.pool, Uuid::new_v4(), second.id).await.unwrap_err();
            assert!(matches!(err, ServiceError::NotFound { .. }));
            delete_location(&state.pool, org, first.id).await.unwrap();
            delete_location(&state.pool, org, second.id).await.unwrap();
        }
    }
}
