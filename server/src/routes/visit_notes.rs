//! Visit note routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::visit_note::{self, NoteFields, VisitNoteRow};
use crate::state::AppState;
use crate::validate::{Validated, max_len, optional_text};

pub const FIELD_MAX: usize = 5000;

#[derive(Debug, Default, Deserialize)]
pub struct VisitNoteQuery {
    pub schedule_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoteFieldsBody {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub incidents: Option<String>,
    #[serde(default, alias = "nextSteps")]
    pub next_steps: Option<String>,
}

impl NoteFieldsBody {
    fn validate(self) -> Validated<NoteFields> {
        let fields = NoteFields {
            summary: optional_text(self.summary),
            mood: optional_text(self.mood),
            incidents: optional_text(self.incidents),
            next_steps: optional_text(self.next_steps),
        };
        max_len("summary", fields.summary.as_deref(), FIELD_MAX)?;
        max_len("mood", fields.mood.as_deref(), FIELD_MAX)?;
        max_len("incidents", fields.incidents.as_deref(), FIELD_MAX)?;
        max_len("next_steps", fields.next_steps.as_deref(), FIELD_MAX)?;
        Ok(fields)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitNoteBody {
    #[serde(alias = "scheduleId")]
    pub schedule_id: Uuid,
    #[serde(default, alias = "authorId")]
    pub author_id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: NoteFieldsBody,
}

/// `GET /api/visit-notes`
pub async fn list_visit_notes(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<VisitNoteQuery>,
) -> ApiResult<Json<Vec<VisitNoteRow>>> {
    Ok(Json(visit_note::list_visit_notes(&state.pool, ctx.organization_id, query.schedule_id).await?))
}

/// `POST /api/visit-notes`: the author defaults to the caller.
pub async fn create_visit_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateVisitNoteBody>,
) -> ApiResult<(StatusCode, Json<VisitNoteRow>)> {
    let fields = body.fields.validate()?;
    let author_id = body.author_id.unwrap_or(ctx.user_id);
    let row =
        visit_note::create_visit_note(&state.pool, ctx.organization_id, body.schedule_id, author_id, fields).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/visit-notes/{id}`
pub async fn get_visit_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(note_id): PathParam<Uuid>,
) -> ApiResult<Json<VisitNoteRow>> {
    Ok(Json(visit_note::get_visit_note(&state.pool, ctx.organization_id, note_id).await?))
}

/// `PATCH /api/visit-notes/{id}`
pub async fn update_visit_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(note_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<NoteFieldsBody>,
) -> ApiResult<Json<VisitNoteRow>> {
    let fields = body.validate()?;
    Ok(Json(visit_note::update_visit_note(&state.pool, ctx.organization_id, note_id, fields).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_dropped() {
        let body = NoteFieldsBody { summary: Some("  Ate well ".into()), mood: Some(String::new()), ..Default::default() };
        let fields = body.validate().unwrap();
        assert_eq!(fields.summary.as_deref(), Some("Ate well"));
        assert_eq!(fields.mood, None);
    }

    #[test]
    fn oversized_summary_is_rejected() {
        let body = NoteFieldsBody { summary: Some("x".repeat(FIELD_MAX + 1)), ..Default::default() };
        assert!(body.validate().is_err());
    }
}
