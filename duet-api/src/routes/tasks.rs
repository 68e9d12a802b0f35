/// Owner-scoped task and action endpoints
///
/// Every handler here runs behind the request gate and receives the
/// authenticated identity as an `AuthUser` extension. The identity - never
/// anything from the request body - is what scopes each store operation, so
/// a caller can only ever observe and mutate their own rows.
///
/// A task that is absent and a task that belongs to someone else produce
/// the same 404 with the same message. Deletes report whether a row was
/// removed instead of erroring, so retried deletes are harmless.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use duet_shared::auth::middleware::AuthUser;
use duet_shared::models::action::{Action, ActionKind, CreateAction};
use duet_shared::models::task::{CreateTask, Task, TaskKind, UpdateTask};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for task reads
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    /// Narrow the result to one kind (`task` or `habit`)
    #[serde(default)]
    pub kind: Option<TaskKind>,

    /// Load each task's actions; off by default so plain reads stay one query
    #[serde(default)]
    pub with_actions: Option<bool>,
}

impl TaskQuery {
    fn with_actions(&self) -> bool {
        self.with_actions.unwrap_or(false)
    }
}

/// Response for deletes: whether a row was actually removed
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// True when a row existed and is now gone
    pub deleted: bool,
}

/// Body for recording an action on a task
///
/// The task id comes from the path, never the body.
#[derive(Debug, Deserialize)]
pub struct ActionBody {
    /// Event kind
    pub kind: ActionKind,

    /// When the event happened; defaults to now
    #[serde(default, rename = "when")]
    pub occurred_at: Option<DateTime<Utc>>,
}

fn task_not_found() -> ApiError {
    // One message for "absent" and "not owned"
    ApiError::NotFound("task not found".to_string())
}

/// `GET /v1/tasks` - lists the caller's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list(&state.db, user.id, query.kind, query.with_actions()).await?;

    Ok(Json(tasks))
}

/// `GET /v1/tasks/:id` - fetches one of the caller's tasks
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Task>> {
    let task = Task::find(&state.db, task_id, user.id, query.kind, query.with_actions())
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// `POST /v1/tasks` - creates a task owned by the caller
///
/// The owner is stamped from the authenticated identity; any owner field in
/// the payload is discarded during deserialization.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(data): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = Task::create(&state.db, user.id, data).await?;

    tracing::debug!(user_id = user.id, task_id = %task.id, "task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// `PATCH /v1/tasks/:id` - applies a partial update to one of the caller's tasks
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(patch): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    let task = Task::update(&state.db, task_id, user.id, patch)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// `DELETE /v1/tasks/:id` - removes one of the caller's tasks
///
/// Always 200; the body says whether anything was there to remove.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = Task::delete(&state.db, task_id, user.id).await?;

    Ok(Json(DeleteResponse { deleted }))
}

/// `POST /v1/tasks/:id/actions` - records an action on one of the caller's tasks
///
/// 404 (and no row written) when the task is absent or foreign.
pub async fn create_action(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<ActionBody>,
) -> ApiResult<(StatusCode, Json<Action>)> {
    let action = Action::create(
        &state.db,
        user.id,
        CreateAction {
            task_id,
            kind: body.kind,
            occurred_at: body.occurred_at,
        },
    )
    .await?
    .ok_or_else(task_not_found)?;

    Ok((StatusCode::CREATED, Json(action)))
}

/// `DELETE /v1/actions/:id` - removes an action, scoped through its task's owner
pub async fn delete_action(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(action_id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = Action::delete(&state.db, action_id, user.id).await?;

    Ok(Json(DeleteResponse { deleted }))
}
