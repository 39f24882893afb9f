//! POST-only task surface for skillset callers. The caller is still
//! identified by `X-GitHub-Token`; the request body is additionally signed
//! when an authenticator is configured.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use taskpilot_auth::SignatureAuthLayer;
use taskpilot_core::tasks::{NewTask, Task, TaskUpdate};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::CurrentUser;
use crate::routes::tasks::{apply_patch, remove_task, validate_new_task};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TaskIdBody {
    pub id: String,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/skillset/todos/list", post(list))
        .route("/skillset/todos/add", post(add))
        .route("/skillset/todos/update", post(update))
        .route("/skillset/todos/delete", post(delete));

    match &state.skillset_auth {
        Some(authenticator) => routes.route_layer(SignatureAuthLayer::new(authenticator.clone())),
        None => {
            tracing::warn!("skillset routes are accepting unsigned requests");
            routes
        }
    }
}

/// POST /skillset/todos/list
#[utoipa::path(
    post,
    path = "/skillset/todos/list",
    responses(
        (status = 200, description = "The caller's tasks", body = Vec<Task>),
        (status = 401, description = "Bad signature or missing token"),
    ),
    tag = "skillset"
)]
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.store.list(&user.login).await?;
    tracing::info!(user_id = %user.login, count = tasks.len(), "skillset list");
    Ok(Json(tasks))
}

/// POST /skillset/todos/add
#[utoipa::path(
    post,
    path = "/skillset/todos/add",
    request_body = NewTask,
    responses(
        (status = 200, description = "Task created", body = Task),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Bad signature or missing token"),
    ),
    tag = "skillset"
)]
pub async fn add(
    user: CurrentUser,
    State(state): State<AppState>,
    AppJson(task): AppJson<NewTask>,
) -> Result<Json<Task>, AppError> {
    validate_new_task(&task)?;
    let created = state.store.create(task, &user.login).await?;
    tracing::info!(task_id = %created.id, user_id = %user.login, "skillset add");
    Ok(Json(created))
}

/// POST /skillset/todos/update: absent fields keep their stored values
#[utoipa::path(
    post,
    path = "/skillset/todos/update",
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
    ),
    tag = "skillset"
)]
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    AppJson(update): AppJson<TaskUpdate>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(
        apply_patch(state.store.as_ref(), &update.id, &update.patch, &user).await?,
    ))
}

/// POST /skillset/todos/delete
#[utoipa::path(
    post,
    path = "/skillset/todos/delete",
    request_body = TaskIdBody,
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
    ),
    tag = "skillset"
)]
pub async fn delete(
    user: CurrentUser,
    State(state): State<AppState>,
    AppJson(body): AppJson<TaskIdBody>,
) -> Result<StatusCode, AppError> {
    remove_task(state.store.as_ref(), &body.id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
