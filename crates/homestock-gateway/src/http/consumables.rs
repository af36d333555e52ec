use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use homestock_core::category::Category;
use homestock_core::consumable::{
    validate_decrease_amount, validate_refill_amount, Consumable, ConsumableUpdate, NewConsumable,
};
use homestock_core::depletion::Projection;
use homestock_core::types::{CategoryId, ConsumableId};
use homestock_scheduler::{run_sweep, SweepError, SweepReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::categories;
use super::error::{bad_request, deleted, json_body, not_found, store_error, ApiError, ApiResult};
use crate::app::AppState;

const KIND: &str = "Consumable";
const DEFAULT_DECREASE: f64 = 1.0;

/// A consumable as the client sees it: stored fields, the resolved
/// category and today's depletion projection.
#[derive(Debug, Serialize)]
pub struct ConsumableView {
    #[serde(flatten)]
    pub item: Consumable,
    /// `None` when the referenced category no longer exists.
    pub category: Option<Category>,
    #[serde(flatten)]
    pub projection: Projection,
}

impl ConsumableView {
    fn new(item: Consumable, category: Option<Category>, today: NaiveDate) -> Self {
        let projection = item.projection(today);
        Self {
            item,
            category,
            projection,
        }
    }
}

fn views(state: &AppState, items: Vec<Consumable>) -> Result<Vec<ConsumableView>, ApiError> {
    let categories = categories::lookup_table(state)?;
    let today = Utc::now().date_naive();
    Ok(items
        .into_iter()
        .map(|item| {
            let category = categories.get(&item.category_id).cloned();
            ConsumableView::new(item, category, today)
        })
        .collect())
}

fn view(state: &AppState, item: Consumable) -> Result<ConsumableView, ApiError> {
    let category = state.categories.get(&item.category_id).map_err(store_error)?;
    Ok(ConsumableView::new(item, category, Utc::now().date_naive()))
}

/// Body of `decrease` / `refill`. An empty body is accepted.
#[derive(Debug, Default, Deserialize)]
struct AmountBody {
    amount: Option<f64>,
}

fn amount_body(body: &Bytes) -> Result<AmountBody, ApiError> {
    if body.is_empty() {
        return Ok(AmountBody::default());
    }
    serde_json::from_slice(body).map_err(|e| bad_request(e.to_string()))
}

/// GET /api/consumables
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ConsumableView>> {
    let items = state.consumables.list().map_err(store_error)?;
    views(&state, items).map(Json)
}

/// GET /api/consumables/category/{id}
pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ConsumableView>> {
    let items = state
        .consumables
        .list_by_category(&CategoryId(id))
        .map_err(store_error)?;
    views(&state, items).map(Json)
}

/// GET /api/consumables/{id}
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ConsumableView> {
    let item = state
        .consumables
        .get(&ConsumableId(id))
        .map_err(store_error)?
        .ok_or_else(|| not_found(KIND))?;
    view(&state, item).map(Json)
}

/// POST /api/consumables
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewConsumable>, JsonRejection>,
) -> Result<(StatusCode, Json<ConsumableView>), ApiError> {
    let new = json_body(payload)?;
    let item = state.consumables.create(new).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(view(&state, item)?)))
}

/// PUT /api/consumables/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ConsumableUpdate>, JsonRejection>,
) -> ApiResult<ConsumableView> {
    let patch = json_body(payload)?;
    let item = state
        .consumables
        .update(&ConsumableId(id), patch)
        .map_err(store_error)?;
    view(&state, item).map(Json)
}

/// DELETE /api/consumables/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .consumables
        .delete(&ConsumableId(id))
        .map_err(store_error)?;
    Ok(deleted(KIND))
}

/// POST /api/consumables/{id}/decrease: `{amount?}`, default 1.
pub async fn decrease(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<ConsumableView> {
    let amount = amount_body(&body)?.amount.unwrap_or(DEFAULT_DECREASE);
    validate_decrease_amount(amount).map_err(|e| bad_request(e.to_string()))?;
    let item = state
        .consumables
        .decrease(&ConsumableId(id), amount)
        .map_err(store_error)?;
    view(&state, item).map(Json)
}

/// POST /api/consumables/{id}/refill: `{amount}` sets the level.
pub async fn refill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<ConsumableView> {
    let id = ConsumableId(id);
    // unknown id wins over a bad amount
    if state.consumables.get(&id).map_err(store_error)?.is_none() {
        return Err(not_found(KIND));
    }
    let amount = amount_body(&body)?.amount.unwrap_or(0.0);
    validate_refill_amount(amount).map_err(|e| bad_request(e.to_string()))?;
    let item = state.consumables.refill(&id, amount).map_err(store_error)?;
    view(&state, item).map(Json)
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: SweepReport,
}

/// POST /api/consumables/auto-decrease: run one sweep pass now.
pub async fn auto_decrease(State(state): State<Arc<AppState>>) -> ApiResult<SweepResponse> {
    let report = run_sweep(state.consumables.as_ref(), Utc::now())
        .map_err(|SweepError::List(e)| store_error(e))?;
    info!(
        examined = report.examined,
        decayed = report.decayed,
        failed = report.failed,
        "on-demand sweep"
    );
    Ok(Json(SweepResponse {
        message: "Auto-decrease completed",
        report,
    }))
}
