//! Membership routes for the caller's organization.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam};
use crate::error::ApiResult;
use crate::services::membership::{
    self, MembershipChanges, MembershipRole, MembershipRow, MembershipStatus, NewMembership,
};
use crate::state::AppState;
use crate::validate::{Validated, optional_text, required};

#[derive(Debug, Deserialize)]
pub struct CreateMembershipBody {
    #[serde(alias = "personId")]
    pub person_id: Uuid,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateMembershipBody {
    fn validate(self) -> Validated<NewMembership> {
        Ok(NewMembership {
            person_id: self.person_id,
            role: MembershipRole::parse("role", &required("role", &self.role)?)?,
            title: optional_text(self.title),
            status: MembershipStatus::parse_optional("status", self.status.as_deref())?
                .unwrap_or(MembershipStatus::Invited),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMembershipBody {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateMembershipBody {
    fn validate(self) -> Validated<MembershipChanges> {
        Ok(MembershipChanges {
            role: MembershipRole::parse_optional("role", self.role.as_deref())?,
            title: optional_text(self.title),
            status: MembershipStatus::parse_optional("status", self.status.as_deref())?,
        })
    }
}

/// `GET /api/memberships`
pub async fn list_memberships(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<MembershipRow>>> {
    Ok(Json(membership::list_memberships(&state.pool, ctx.organization_id).await?))
}

/// `POST /api/memberships`: the caller is recorded as inviter.
pub async fn create_membership(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateMembershipBody>,
) -> ApiResult<(StatusCode, Json<MembershipRow>)> {
    let new = body.validate()?;
    let row = membership::create_membership(&state.pool, ctx.organization_id, ctx.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/memberships/{id}`
pub async fn get_membership(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(membership_id): PathParam<Uuid>,
) -> ApiResult<Json<MembershipRow>> {
    Ok(Json(membership::get_membership(&state.pool, ctx.organization_id, membership_id).await?))
}

/// `PATCH /api/memberships/{id}`
pub async fn update_membership(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(membership_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateMembershipBody>,
) -> ApiResult<Json<MembershipRow>> {
    let changes = body.validate()?;
    let row = membership::update_membership(&state.pool, ctx.organization_id, membership_id, changes).await?;
    Ok(Json(row))
}
