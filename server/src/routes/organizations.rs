//! Organization (tenant) settings routes.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::error::ApiResult;
use crate::services::organization::{self, OrganizationChanges, OrganizationKind, OrganizationRow, slugify};
use crate::state::AppState;
use crate::validate::{Validated, ValidationError, optional_email, optional_phone, optional_text};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganizationBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, alias = "primaryPhone", alias = "phone")]
    pub primary_phone: Option<String>,
    #[serde(default, alias = "primaryEmail", alias = "email")]
    pub primary_email: Option<String>,
}

impl UpdateOrganizationBody {
    fn validate(self) -> Validated<OrganizationChanges> {
        let slug = match optional_text(self.slug) {
            Some(raw) => {
                let slug = slugify(&raw);
                if slug.is_empty() {
                    return Err(ValidationError::Rule("slug must contain letters or digits".into()));
                }
                Some(slug)
            }
            None => None,
        };
        Ok(OrganizationChanges {
            name: optional_text(self.name),
            kind: OrganizationKind::parse_optional("type", self.kind.as_deref())?,
            slug,
            timezone: optional_text(self.timezone),
            primary_phone: optional_phone("primary_phone", self.primary_phone)?,
            primary_email: optional_email("primary_email", self.primary_email)?,
        })
    }
}

/// `GET /api/organizations`
pub async fn list_organizations(State(state): State<AppState>) -> ApiResult<Json<Vec<OrganizationRow>>> {
    Ok(Json(organization::list_organizations(&state.pool).await?))
}

/// `GET /api/organizations/{id}`
pub async fn get_organization(
    State(state): State<AppState>,
    PathParam(organization_id): PathParam<Uuid>,
) -> ApiResult<Json<OrganizationRow>> {
    Ok(Json(organization::get_organization(&state.pool, organization_id).await?))
}

/// `PATCH /api/organizations/{id}`: the settings page.
pub async fn update_organization(
    State(state): State<AppState>,
    PathParam(organization_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateOrganizationBody>,
) -> ApiResult<Json<OrganizationRow>> {
    let changes = body.validate()?;
    Ok(Json(organization::update_organization(&state.pool, organization_id, changes).await?))
}
