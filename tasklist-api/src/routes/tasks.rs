/// Task endpoints
///
/// Every route here sits behind the bearer gate and receives the caller as an
/// [`AuthContext`]. Handlers that address a single task follow the same steps:
///
/// 1. parse the id (`400 Invalid task ID`)
/// 2. fetch the task
/// 3. [`require_ownership`]; absent and foreign tasks both become
///    `404 Task not found`
/// 4. act
///
/// # Endpoints
///
/// - `POST   /api/v1/tasks` - Create a task owned by the caller
/// - `GET    /api/v1/tasks?limit&offset` - List the caller's tasks
/// - `GET    /api/v1/tasks/:id` - Fetch one task
/// - `PATCH  /api/v1/tasks/:id` - Partially update a task (204)
/// - `DELETE /api/v1/tasks/:id` - Delete a task (204)

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tasklist_shared::{
    auth::{
        authorization::{require_ownership, TaskAction},
        middleware::AuthContext,
    },
    models::task::{
        validate_deadline, CreateTask, Task, TaskStatus, UpdateTask, MAX_DESCRIPTION_LENGTH,
        MAX_NAME_LENGTH,
    },
    store::TaskStore,
};
use tracing::info;
use validator::Validate;

/// Page size when `limit` is absent or out of range
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest accepted `limit`
pub const MAX_LIMIT: i64 = 100;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(max = MAX_NAME_LENGTH, message = "Name must be at most 30 characters"))]
    pub name: String,

    #[validate(length(
        max = MAX_DESCRIPTION_LENGTH,
        message = "Description must be at most 150 characters"
    ))]
    pub description: Option<String>,

    /// RFC 3339 timestamp, strictly in the future
    pub deadline: DateTime<Utc>,
}

/// Partial update request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = MAX_NAME_LENGTH, message = "Name must be at most 30 characters"))]
    pub name: Option<String>,

    #[validate(length(
        max = MAX_DESCRIPTION_LENGTH,
        message = "Description must be at most 150 characters"
    ))]
    pub description: Option<String>,

    pub deadline: Option<DateTime<Utc>>,

    pub status: Option<TaskStatus>,
}

/// Pagination parameters, parsed leniently
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    /// Resolves to `(limit, offset)`; anything unparseable or out of range
    /// falls back to the default
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| (1..=MAX_LIMIT).contains(limit))
            .unwrap_or(DEFAULT_LIMIT);

        let offset = self
            .offset
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|offset| *offset >= 0)
            .unwrap_or(0);

        (limit, offset)
    }
}

/// Parses a task id path segment
pub fn parse_task_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| ApiError::BadRequest("Invalid task ID".to_string()))
}

/// Checks the rules the derive can't express: non-blank name, future deadline
fn check_task_fields(
    name: Option<&str>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    let mut details = Vec::new();

    if let Some(name) = name {
        if name.trim().is_empty() {
            details.push(ValidationErrorDetail::new("name", "Name is required"));
        }
    }

    if let Some(deadline) = deadline {
        if let Err(message) = validate_deadline(deadline, now) {
            details.push(ValidationErrorDetail::new("deadline", message));
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(details))
    }
}

/// Fetches a task and enforces ownership in one step
async fn load_owned_task(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    action: TaskAction,
) -> ApiResult<Task> {
    let task = state
        .store
        .find_task_by_id(id)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    require_ownership(auth, task.owner_id, action)?;

    Ok(task)
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/tasks
/// Authorization: Bearer <token>
///
/// { "name": "X", "description": "optional", "deadline": "2030-01-01T00:00:00Z" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: invalid body, blank or long name, past deadline
/// - `401 Unauthorized`: gate failure
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    check_task_fields(Some(&req.name), Some(req.deadline), Utc::now())?;

    let task = state
        .store
        .create_task(CreateTask {
            owner_id: auth.user_id,
            name: req.name,
            description: req.description.unwrap_or_default(),
            deadline: req.deadline,
        })
        .await?;

    info!(task_id = task.id, owner_id = task.owner_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// List the caller's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let (limit, offset) = params.resolve();

    let tasks = state
        .store
        .list_tasks_by_owner(auth.user_id, limit, offset)
        .await?;

    Ok(Json(tasks))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let task = load_owned_task(&state, &auth, id, TaskAction::Read).await?;

    Ok(Json(task))
}

/// Partially update a task
///
/// An empty body is accepted and changes nothing. Status may move between any
/// two values.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_task_id(&id)?;
    load_owned_task(&state, &auth, id, TaskAction::Update).await?;

    req.validate()?;
    check_task_fields(req.name.as_deref(), req.deadline, Utc::now())?;

    let new_status = req.status.map(|status| status.as_str());
    let changes = UpdateTask {
        name: req.name,
        description: req.description,
        deadline: req.deadline,
        status: req.status,
    };

    if changes.is_empty() {
        return Ok(StatusCode::NO_CONTENT);
    }

    state
        .store
        .update_task(id, changes)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    info!(
        task_id = id,
        owner_id = auth.user_id,
        status = new_status,
        "Task updated"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_task_id(&id)?;
    load_owned_task(&state, &auth, id, TaskAction::Delete).await?;

    if !state.store.delete_task(id).await? {
        return Err(ApiError::task_not_found());
    }

    info!(task_id = id, owner_id = auth.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}
