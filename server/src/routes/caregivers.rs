//! Caregiver registration and directory routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use super::profile::{ProfileBody, ProfileChangesBody};
use crate::error::ApiResult;
use crate::services::caregiver::{self, CaregiverChanges, CaregiverRow, Credentials, NewCaregiver};
use crate::services::listing::{ListQuery, Page, PageWindow, like_pattern};
use crate::state::AppState;
use crate::validate::{Validated, optional_text};

/// Onboarding fields as the registration form names them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsBody {
    #[serde(default, alias = "addressProof")]
    pub address_proof: Option<String>,
    #[serde(default, alias = "bankName")]
    pub bank_name: Option<String>,
    #[serde(default, alias = "accountNumber")]
    pub account_number: Option<String>,
    #[serde(default, alias = "ifscCode")]
    pub ifsc_code: Option<String>,
    #[serde(default, alias = "priorExperience")]
    pub prior_experience: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default, alias = "qualificationProof")]
    pub qualification_proof: Option<String>,
}

impl CredentialsBody {
    fn normalize(self) -> Credentials {
        Credentials {
            address_proof: optional_text(self.address_proof),
            bank_name: optional_text(self.bank_name),
            account_number: optional_text(self.account_number),
            ifsc_code: optional_text(self.ifsc_code).map(|code| code.to_ascii_uppercase()),
            prior_experience: optional_text(self.prior_experience),
            qualification: optional_text(self.qualification),
            qualification_proof: optional_text(self.qualification_proof),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCaregiverBody {
    #[serde(flatten)]
    pub profile: ProfileBody,
    #[serde(flatten)]
    pub credentials: CredentialsBody,
}

impl CreateCaregiverBody {
    fn validate(self) -> Validated<NewCaregiver> {
        Ok(NewCaregiver { profile: self.profile.validate()?, credentials: self.credentials.normalize() })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaregiverBody {
    #[serde(flatten)]
    pub profile: ProfileChangesBody,
    #[serde(flatten)]
    pub credentials: CredentialsBody,
}

impl UpdateCaregiverBody {
    fn validate(self) -> Validated<CaregiverChanges> {
        Ok(CaregiverChanges { profile: self.profile.validate()?, credentials: self.credentials.normalize() })
    }
}

/// `GET /api/caregivers`: paged directory with optional search.
pub async fn list_caregivers(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<Page<CaregiverRow>>> {
    let window = PageWindow::resolve(query.page, query.per_page, state.default_page_size());
    let pattern = like_pattern(query.search.as_deref());
    let page = caregiver::list_caregivers(&state.pool, ctx.organization_id, pattern.as_deref(), window).await?;
    Ok(Json(page))
}

/// `POST /api/caregivers`
pub async fn create_caregiver(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateCaregiverBody>,
) -> ApiResult<(StatusCode, Json<CaregiverRow>)> {
    let new = body.validate()?;
    let row = caregiver::create_caregiver(&state.pool, ctx.organization_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/caregivers/{id}`
pub async fn get_caregiver(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(caregiver_id): PathParam<Uuid>,
) -> ApiResult<Json<CaregiverRow>> {
    Ok(Json(caregiver::get_caregiver(&state.pool, ctx.organization_id, caregiver_id).await?))
}

/// `PATCH /api/caregivers/{id}`
pub async fn update_caregiver(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(caregiver_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateCaregiverBody>,
) -> ApiResult<Json<CaregiverRow>> {
    let changes = body.validate()?;
    let row = caregiver::update_caregiver(&state.pool, ctx.organization_id, caregiver_id, changes).await?;
    Ok(Json(row))
}

/// `DELETE /api/caregivers/{id}`
pub async fn delete_caregiver(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(caregiver_id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    caregiver::delete_caregiver(&state.pool, ctx.organization_id, caregiver_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
