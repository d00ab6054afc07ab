//! Care task routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::ApiResult;
use crate::services::task::{
    self, DESCRIPTION_MAX, NOTES_MAX, NewTask, TITLE_MAX, TaskCategory, TaskChanges, TaskFilter, TaskRow, TaskStatus,
};
use crate::state::AppState;
use crate::validate::{Validated, date, max_len, optional_date, optional_text, required};

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub patient_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
    pub care_relationship_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    #[serde(alias = "patientId")]
    pub patient_id: Uuid,
    #[serde(default, alias = "scheduleId")]
    pub schedule_id: Option<Uuid>,
    #[serde(default, alias = "careRelationshipId")]
    pub care_relationship_id: Option<Uuid>,
    #[serde(default, alias = "taskDate")]
    pub task_date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<i32>,
}

impl CreateTaskBody {
    fn validate(self) -> Validated<NewTask> {
        task::check_scope(self.schedule_id, self.care_relationship_id)?;
        let title = required("title", &self.title)?;
        let description = optional_text(self.description);
        let notes = optional_text(self.notes);
        check_lengths(Some(&title), description.as_deref(), notes.as_deref())?;
        Ok(NewTask {
            patient_id: self.patient_id,
            schedule_id: self.schedule_id,
            care_relationship_id: self.care_relationship_id,
            task_date: date("task_date", &required("task_date", &self.task_date)?)?,
            title,
            description,
            category: TaskCategory::parse_optional("category", self.category.as_deref())?,
            frequency: optional_text(self.frequency),
            status: TaskStatus::parse_optional("status", self.status.as_deref())?.unwrap_or(TaskStatus::Pending),
            notes,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskBody {
    #[serde(default, alias = "scheduleId")]
    pub schedule_id: Option<Uuid>,
    #[serde(default, alias = "careRelationshipId")]
    pub care_relationship_id: Option<Uuid>,
    #[serde(default, alias = "taskDate")]
    pub task_date: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<i32>,
}

impl UpdateTaskBody {
    fn validate(self) -> Validated<TaskChanges> {
        let title = optional_text(self.title);
        let description = optional_text(self.description);
        let notes = optional_text(self.notes);
        check_lengths(title.as_deref(), description.as_deref(), notes.as_deref())?;
        Ok(TaskChanges {
            schedule_id: self.schedule_id,
            care_relationship_id: self.care_relationship_id,
            task_date: optional_date("task_date", self.task_date)?,
            title,
            description,
            category: TaskCategory::parse_optional("category", self.category.as_deref())?,
            frequency: optional_text(self.frequency),
            status: TaskStatus::parse_optional("status", self.status.as_deref())?,
            notes,
            sort_order: self.sort_order,
        })
    }
}

fn check_lengths(title: Option<&str>, description: Option<&str>, notes: Option<&str>) -> Validated<()> {
    max_len("title", title, TITLE_MAX)?;
    max_len("description", description, DESCRIPTION_MAX)?;
    max_len("notes", notes, NOTES_MAX)
}

/// `GET /api/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    ctx: RequestContext,
    QueryParams(query): QueryParams<TaskQuery>,
) -> ApiResult<Json<Vec<TaskRow>>> {
    let filter = TaskFilter {
        patient_id: query.patient_id,
        schedule_id: query.schedule_id,
        care_relationship_id: query.care_relationship_id,
    };
    Ok(Json(task::list_tasks(&state.pool, ctx.organization_id, &filter).await?))
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateTaskBody>,
) -> ApiResult<(StatusCode, Json<TaskRow>)> {
    let new = body.validate()?;
    let row = task::create_task(&state.pool, ctx.organization_id, ctx.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(task_id): PathParam<Uuid>,
) -> ApiResult<Json<TaskRow>> {
    Ok(Json(task::get_task(&state.pool, ctx.organization_id, task_id).await?))
}

/// `PATCH /api/tasks/{id}`: completing stamps the caller as finisher.
pub async fn update_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParam(task_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateTaskBody>,
) -> ApiResult<Json<TaskRow>> {
    let changes = body.validate()?;
    Ok(Json(task::update_task(&state.pool, ctx.organization_id, task_id, ctx.user_id, changes).await?))
}
