//! Person directory and invite routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::listing::{ListQuery, Page, PageWindow, like_pattern};
use crate::services::person::{self, InvitedPerson, NewPerson, PersonChanges, PersonRow, PersonStatus};
use crate::state::AppState;
use crate::validate::{Validated, email, optional_phone, optional_text, required};

#[derive(Debug, Deserialize)]
pub struct InvitePersonBody {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl InvitePersonBody {
    fn validate(self) -> Validated<NewPerson> {
        Ok(NewPerson {
            email: email("email", &self.email)?,
            first_name: required("first_name", &self.first_name)?,
            last_name: required("last_name", &self.last_name)?,
            display_name: optional_text(self.display_name),
            phone: optional_phone("phone", self.phone)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonBody {
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdatePersonBody {
    fn validate(self) -> Validated<PersonChanges> {
        Ok(PersonChanges {
            first_name: optional_text(self.first_name),
            last_name: optional_text(self.last_name),
            display_name: optional_text(self.display_name),
            phone: optional_phone("phone", self.phone)?,
            status: PersonStatus::parse_optional("status", self.status.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteBody {
    #[serde(default)]
    pub token: String,
}

/// `GET /api/persons`
pub async fn list_persons(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<Page<PersonRow>>> {
    let window = PageWindow::resolve(query.page, query.per_page, state.default_page_size());
    let pattern = like_pattern(query.search.as_deref());
    Ok(Json(person::list_persons(&state.pool, pattern.as_deref(), window).await?))
}

/// `POST /api/persons`: invite. The raw token appears only in this response.
pub async fn invite_person(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<InvitePersonBody>,
) -> ApiResult<(StatusCode, Json<InvitedPerson>)> {
    let new = body.validate()?;
    let invited = person::invite_person(&state.pool, new, state.config.invite_token_bytes).await?;
    Ok((StatusCode::CREATED, Json(invited)))
}

/// `GET /api/persons/{id}`
pub async fn get_person(State(state): State<AppState>, PathParam(person_id): PathParam<Uuid>) -> ApiResult<Json<PersonRow>> {
    Ok(Json(person::get_person(&state.pool, person_id).await?))
}

/// `PATCH /api/persons/{id}`
pub async fn update_person(
    State(state): State<AppState>,
    PathParam(person_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdatePersonBody>,
) -> ApiResult<Json<PersonRow>> {
    let changes = body.validate()?;
    Ok(Json(person::update_person(&state.pool, person_id, changes).await?))
}

/// `POST /api/invites/accept`
pub async fn accept_invite(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<AcceptInviteBody>,
) -> ApiResult<Json<PersonRow>> {
    let token = required("token", &body.token)?;
    Ok(Json(person::accept_invite(&state.pool, &token).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn invite_normalizes_email() {
        let body: InvitePersonBody = serde_json::from_value(serde_json::json!({
            "email": " Ana.Lee@Example.COM ",
            "firstName": "Ana",
            "lastName": "Lee",
            "phone": ""
        }))
        .unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.email, "ana.lee@example.com");
        assert_eq!(new.phone, None);
    }

    #[test]
    fn invite_requires_email() {
        let body: InvitePersonBody =
            serde_json::from_value(serde_json::json!({"firstName": "Ana", "lastName": "Lee"})).unwrap();
        assert_eq!(body.validate().unwrap_err(), ValidationError::Required("email"));
    }

    #[test]
    fn update_rejects_unknown_status() {
        let body = UpdatePersonBody { status: Some("deleted".into()), ..Default::default() };
        assert!(body.validate().is_err());
    }
}
