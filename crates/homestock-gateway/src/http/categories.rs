use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use homestock_core::category::{Category, CategoryKind, CategoryUpdate, NewCategory};
use homestock_core::types::CategoryId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{bad_request, deleted, json_body, not_found, store_error, ApiError, ApiResult};
use crate::app::AppState;

const KIND: &str = "Category";

/// Every category keyed by id, for resolving item references in bulk.
pub(crate) fn lookup_table(state: &AppState) -> Result<HashMap<CategoryId, Category>, ApiError> {
    Ok(state
        .categories
        .list()
        .map_err(store_error)?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect())
}

/// GET /api/categories
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Category>> {
    state.categories.list().map(Json).map_err(store_error)
}

/// GET /api/categories/type/{kind}
pub async fn list_by_kind(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<Vec<Category>> {
    let kind: CategoryKind = kind.parse().map_err(bad_request)?;
    state
        .categories
        .list_by_kind(kind)
        .map(Json)
        .map_err(store_error)
}

/// GET /api/categories/{id}
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    state
        .categories
        .get(&CategoryId(id))
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found(KIND))
}

/// POST /api/categories
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let new = json_body(payload)?;
    let category = state.categories.create(new).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Category> {
    let patch = json_body(payload)?;
    state
        .categories
        .update(&CategoryId(id), patch)
        .map(Json)
        .map_err(store_error)
}

/// DELETE /api/categories/{id}: items keep their (now dangling) reference.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .categories
        .delete(&CategoryId(id))
        .map_err(store_error)?;
    Ok(deleted(KIND))
}
