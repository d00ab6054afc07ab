//! Location (office/branch) routes.
//!
//! The payload's `organization_id`, if any, is ignored; locations are always
//! written to the caller's organization.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam};
use crate::error::ApiResult;
use crate::services::location::{self, Address, LocationChanges, LocationRow, NewLocation};
use crate::state::AppState;
use crate::validate::{Validated, ValidationError, max_len, optional_text, required};

pub const NAME_MAX: usize = 200;
pub const STREET_MAX: usize = 200;
pub const CITY_MAX: usize = 100;
pub const REGION_MAX: usize = 100;
pub const POSTAL_CODE_MAX: usize = 20;
pub const TIMEZONE_MAX: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct AddressBody {
    #[serde(default, alias = "addressStreet")]
    pub address_street: Option<String>,
    #[serde(default, alias = "addressCity")]
    pub address_city: Option<String>,
    #[serde(default, alias = "addressRegion")]
    pub address_region: Option<String>,
    #[serde(default, alias = "addressPostalCode")]
    pub address_postal_code: Option<String>,
    #[serde(default, alias = "addressCountry")]
    pub address_country: Option<String>,
}

/// ISO 3166-1 alpha-2, stored uppercase.
fn country_code(value: Option<String>) -> Validated<Option<String>> {
    let Some(code) = optional_text(value) else {
        return Ok(None);
    };
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ValidationError::Rule("address_country must be a two-letter country code".into()));
    }
    Ok(Some(code.to_ascii_uppercase()))
}

impl AddressBody {
    fn validate(self) -> Validated<Address> {
        let address = Address {
            street: optional_text(self.address_street),
            city: optional_text(self.address_city),
            region: optional_text(self.address_region),
            postal_code: optional_text(self.address_postal_code),
            country: country_code(self.address_country)?,
        };
        max_len("address_street", address.street.as_deref(), STREET_MAX)?;
        max_len("address_city", address.city.as_deref(), CITY_MAX)?;
        max_len("address_region", address.region.as_deref(), REGION_MAX)?;
        max_len("address_postal_code", address.postal_code.as_deref(), POSTAL_CODE_MAX)?;
        Ok(address)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLocationBody {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub address: AddressBody,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, alias = "isDefault")]
    pub is_default: bool,
}

impl CreateLocationBody {
    fn validate(self) -> Validated<NewLocation> {
        let name = required("name", &self.name)?;
        max_len("name", Some(&name), NAME_MAX)?;
        let timezone = optional_text(self.timezone);
        max_len("timezone", timezone.as_deref(), TIMEZONE_MAX)?;
        Ok(NewLocation { name, address: self.address.validate()?, timezone, is_default: self.is_default })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLocationBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub address: AddressBody,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, alias = "isDefault")]
    pub is_default: Option<bool>,
}

impl UpdateLocationBody {
    fn validate(self) -> Validated<LocationChanges> {
        let name = optional_text(self.name);
        max_len("name", name.as_deref(), NAME_MAX)?;
        let timezone = optional_text(self.timezone);
        max_len("timezone", timezone.as_deref(), TIMEZONE_MAX)?;
        Ok(LocationChanges { name, address: self.address.validate()?, timezone, is_default: self.is_default })
    }
}

/// `GET /api/locations`
pub async fn list_locations(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Json<Vec<LocationRow>>> {
    Ok(Json(location::list_locations(&state.pool, ctx.organization_id).await?))
}

/// `POST /api/locations`
pub async fn create_location(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateLocationBody>,
) -> ApiResult<(StatusCode, Json<LocationRow>)> {
    let new = body.validate()?;
    let row = location::create_location(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/locations/{id}`
pub async fn get_location(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(location_id): PathParam<Uuid>,
) -> ApiResult<Json<LocationRow>> {
    Ok(Json(location::get_location(&state.pool, ctx.organization_id, location_id).await?))
}

/// `PATCH /api/locations/{id}`
pub async fn update_location(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(location_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateLocationBody>,
) -> ApiResult<Json<LocationRow>> {
    let changes = body.validate()?;
    Ok(Json(location::update_location(&state.pool, ctx.organization_id, location_id, changes).await?))
}

/// `DELETE /api/locations/{id}`
pub async fn delete_location(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(location_id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    location::delete_location(&state.pool, ctx.organization_id, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_organization_is_ignored() {
        let body: CreateLocationBody = serde_json::from_value(serde_json::json!({
            "organization_id": Uuid::new_v4(),
            "name": " North Office ",
            "addressCity": "Pune",
            "address_country": "in",
            "isDefault": true
        }))
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.name, "North Office");
        assert_eq!(new.address.city.as_deref(), Some("Pune"));
        assert_eq!(new.address.country.as_deref(), Some("IN"));
        assert!(new.is_default);
    }

    #[test]
    fn name_is_required() {
        let body = CreateLocationBody { name: "  ".into(), ..Default::default() };
        assert_eq!(body.validate().unwrap_err(), ValidationError::Required("name"));
    }

    #[test]
    fn country_must_be_two_letters() {
        let body = UpdateLocationBody {
            address: AddressBody { address_country: Some("IND".into()), ..Default::default() },
            ..Default::default()
        };
        assert!(body.validate().is_err());
        assert_eq!(country_code(Some(String::new())).unwrap(), None);
    }

    #[test]
    fn long_postal_code_is_rejected() {
        let body = UpdateLocationBody {
            address: AddressBody { address_postal_code: Some("9".repeat(21)), ..Default::default() },
            ..Default::default()
        };
        assert_eq!(
            body.validate().unwrap_err(),
            ValidationError::TooLong { field: "address_postal_code", max: POSTAL_CODE_MAX }
        );
    }
}
