use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use homestock_core::category::Category;
use homestock_core::task::{NewTask, Task, TaskUpdate};
use homestock_core::types::{CategoryId, TaskId};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::categories;
use super::error::{deleted, json_body, not_found, store_error, ApiError, ApiResult};
use crate::app::AppState;

const KIND: &str = "Task";

#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub category: Option<Category>,
}

fn views(state: &AppState, tasks: Vec<Task>) -> Result<Vec<TaskView>, ApiError> {
    let categories = categories::lookup_table(state)?;
    Ok(tasks
        .into_iter()
        .map(|task| TaskView {
            category: categories.get(&task.category_id).cloned(),
            task,
        })
        .collect())
}

fn view(state: &AppState, task: Task) -> Result<TaskView, ApiError> {
    let category = state.categories.get(&task.category_id).map_err(store_error)?;
    Ok(TaskView { task, category })
}

/// GET /api/tasks
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<TaskView>> {
    let tasks = state.tasks.list().map_err(store_error)?;
    views(&state, tasks).map(Json)
}

/// GET /api/tasks/category/{id}
pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TaskView>> {
    let tasks = state
        .tasks
        .list_by_category(&CategoryId(id))
        .map_err(store_error)?;
    views(&state, tasks).map(Json)
}

/// GET /api/tasks/status/{status}: `completed`, anything else means pending.
pub async fn list_by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> ApiResult<Vec<TaskView>> {
    let tasks = state
        .tasks
        .list_by_status(status == "completed")
        .map_err(store_error)?;
    views(&state, tasks).map(Json)
}

/// GET /api/tasks/{id}
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let task = state
        .tasks
        .get(&TaskId(id))
        .map_err(store_error)?
        .ok_or_else(|| not_found(KIND))?;
    view(&state, task).map(Json)
}

/// POST /api/tasks
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let new = json_body(payload)?;
    let task = state.tasks.create(new).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(view(&state, task)?)))
}

/// PUT /api/tasks/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<TaskView> {
    let patch = json_body(payload)?;
    let task = state
        .tasks
        .update(&TaskId(id), patch)
        .map_err(store_error)?;
    view(&state, task).map(Json)
}

/// DELETE /api/tasks/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.tasks.delete(&TaskId(id)).map_err(store_error)?;
    Ok(deleted(KIND))
}

/// POST /api/tasks/{id}/toggle
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let task = state.tasks.toggle(&TaskId(id)).map_err(store_error)?;
    view(&state, task).map(Json)
}
