//! Conversation and message routes. Visibility is by participation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam};
use crate::error::ApiResult;
use crate::services::message::{
    self, BODY_MAX, ConversationKind, ConversationRow, MessageRow, NewConversation,
};
use crate::state::AppState;
use crate::validate::{Validated, max_len, optional_text, required};

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, alias = "patientId")]
    pub patient_id: Option<Uuid>,
    #[serde(default, alias = "participantIds")]
    pub participant_ids: Vec<Uuid>,
}

impl CreateConversationBody {
    fn validate(self) -> Validated<NewConversation> {
        Ok(NewConversation {
            title: optional_text(self.title),
            kind: ConversationKind::parse_optional("kind", self.kind.as_deref())?
                .unwrap_or(ConversationKind::Direct),
            patient_id: self.patient_id,
            participant_ids: self.participant_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageBody {
    #[serde(default)]
    pub body: String,
}

impl PostMessageBody {
    fn validate(self) -> Validated<String> {
        let body = required("body", &self.body)?;
        max_len("body", Some(&body), BODY_MAX)?;
        Ok(body)
    }
}

/// `GET /api/conversations`
pub async fn list_conversations(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<ConversationRow>>> {
    let rows = message::list_conversations(&state.pool, ctx.organization_id, ctx.user_id).await?;
    Ok(Json(rows))
}

/// `POST /api/conversations`
pub async fn create_conversation(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateConversationBody>,
) -> ApiResult<(StatusCode, Json<ConversationRow>)> {
    let new = body.validate()?;
    let row = message::create_conversation(&state.pool, ctx.organization_id, ctx.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/conversations/{id}`
pub async fn get_conversation(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(conversation_id): PathParam<Uuid>,
) -> ApiResult<Json<ConversationRow>> {
    let row = message::get_conversation(&state.pool, ctx.organization_id, conversation_id, ctx.user_id).await?;
    Ok(Json(row))
}

/// `GET /api/conversations/{id}/messages`
pub async fn list_messages(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(conversation_id): PathParam<Uuid>,
) -> ApiResult<Json<Vec<MessageRow>>> {
    let rows = message::list_messages(&state.pool, ctx.organization_id, conversation_id, ctx.user_id).await?;
    Ok(Json(rows))
}

/// `POST /api/conversations/{id}/messages`
pub async fn post_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(conversation_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<PostMessageBody>,
) -> ApiResult<(StatusCode, Json<MessageRow>)> {
    let text = body.validate()?;
    let row = message::post_message(&state.pool, ctx.organization_id, conversation_id, ctx.user_id, text).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn kind_defaults_to_direct() {
        let body: CreateConversationBody =
            serde_json::from_value(serde_json::json!({"participantIds": [Uuid::nil()]})).unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.kind, ConversationKind::Direct);
        assert_eq!(new.participant_ids, vec![Uuid::nil()]);
    }

    #[test]
    fn message_body_is_trimmed() {
        let body = PostMessageBody { body: "  running late  ".into() };
        assert_eq!(body.validate().unwrap(), "running late");
    }

    #[test]
    fn blank_message_is_rejected() {
        let body = PostMessageBody { body: "   ".into() };
        assert_eq!(body.validate().unwrap_err(), ValidationError::Required("body"));
    }

    #[test]
    fn oversized_message_is_rejected() {
        let body = PostMessageBody { body: "x".repeat(BODY_MAX + 1) };
        assert_eq!(body.validate().unwrap_err(), ValidationError::TooLong { field: "body", max: BODY_MAX });
    }
}
