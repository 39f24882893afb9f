use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use taskpilot_core::tasks::{NewTask, Task, TaskPatch};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::CurrentUser;
use crate::state::AppState;
use crate::store::TaskStore;

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/api/todos", get(list_tasks))
        .route("/api/todos/{id}", get(get_task))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/api/todos", post(create_task))
        .route("/api/todos/{id}", put(update_task).delete(delete_task))
}

/// Load a task and check that `user` owns it: 404 when absent, 403 when
/// it belongs to someone else.
pub(crate) async fn owned_task(
    store: &dyn TaskStore,
    id: &str,
    user: &CurrentUser,
) -> Result<Task, AppError> {
    let task = store.get(id).await?.ok_or_else(|| AppError::NotFound {
        resource: "Task".to_string(),
        id: id.to_string(),
    })?;

    if task.user_id != user.login {
        tracing::warn!(task_id = %id, user_id = %user.login, "task belongs to another user");
        return Err(AppError::Forbidden {
            message: format!("Task '{id}' belongs to another user"),
        });
    }
    Ok(task)
}

pub(crate) fn validate_new_task(task: &NewTask) -> Result<(), AppError> {
    if task.title.trim().is_empty() {
        return Err(AppError::Validation {
            message: "title must not be empty".to_string(),
            field: Some("title".to_string()),
            received: Some(serde_json::Value::String(task.title.clone())),
            docs_hint: None,
        });
    }
    Ok(())
}

/// Merge `patch` over the caller's task and store the result.
pub(crate) async fn apply_patch(
    store: &dyn TaskStore,
    id: &str,
    patch: &TaskPatch,
    user: &CurrentUser,
) -> Result<Task, AppError> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation {
            message: "title must not be empty".to_string(),
            field: Some("title".to_string()),
            received: None,
            docs_hint: Some("Omit title to keep the current one.".to_string()),
        });
    }

    let existing = owned_task(store, id, user).await?;
    let updated = store
        .update(patch.apply(&existing))
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource: "Task".to_string(),
            id: id.to_string(),
        })?;
    tracing::info!(task_id = %id, user_id = %user.login, "task updated");
    Ok(updated)
}

pub(crate) async fn remove_task(
    store: &dyn TaskStore,
    id: &str,
    user: &CurrentUser,
) -> Result<(), AppError> {
    owned_task(store, id, user).await?;
    if !store.delete(id).await? {
        // Raced with another delete.
        return Err(AppError::NotFound {
            resource: "Task".to_string(),
            id: id.to_string(),
        });
    }
    tracing::info!(task_id = %id, user_id = %user.login, "task deleted");
    Ok(())
}

/// GET /api/todos: the caller's tasks in creation order
#[utoipa::path(
    get,
    path = "/api/todos",
    responses(
        (status = 200, description = "The caller's tasks", body = Vec<Task>),
        (status = 401, description = "Missing or invalid X-GitHub-Token"),
    ),
    security(("github_token" = [])),
    tag = "tasks"
)]
pub async fn list_tasks(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.store.list(&user.login).await?;
    tracing::info!(user_id = %user.login, count = tasks.len(), "tasks listed");
    Ok(Json(tasks))
}

/// GET /api/todos/{id}
#[utoipa::path(
    get,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "The task", body = Task),
        (status = 401, description = "Missing or invalid X-GitHub-Token"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
    ),
    security(("github_token" = [])),
    tag = "tasks"
)]
pub async fn get_task(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(owned_task(state.store.as_ref(), &id, &user).await?))
}

/// POST /api/todos: create a task owned by the caller
#[utoipa::path(
    post,
    path = "/api/todos",
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid X-GitHub-Token"),
    ),
    security(("github_token" = [])),
    tag = "tasks"
)]
pub async fn create_task(
    user: CurrentUser,
    State(state): State<AppState>,
    AppJson(task): AppJson<NewTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    validate_new_task(&task)?;
    let created = state.store.create(task, &user.login).await?;
    tracing::info!(task_id = %created.id, user_id = %user.login, "task created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/todos/{id} (merge-patch, absent fields keep their values)
#[utoipa::path(
    put,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Task id")),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 400, description = "Invalid body"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
    ),
    security(("github_token" = [])),
    tag = "tasks"
)]
pub async fn update_task(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(patch): AppJson<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(
        apply_patch(state.store.as_ref(), &id, &patch, &user).await?,
    ))
}

/// DELETE /api/todos/{id}
#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
    ),
    security(("github_token" = [])),
    tag = "tasks"
)]
pub async fn delete_task(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    remove_task(state.store.as_ref(), &id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
