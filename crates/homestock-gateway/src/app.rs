use axum::{
    routing::{get, post},
    Router,
};
use homestock_store::{CategoryManager, ConsumableManager, TaskManager};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::http::{categories, consumables, health, root, tasks};

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub categories: CategoryManager,
    /// Shared with the sweep engine.
    pub consumables: Arc<ConsumableManager>,
    pub tasks: TaskManager,
}

impl AppState {
    pub fn new(
        categories: CategoryManager,
        consumables: Arc<ConsumableManager>,
        tasks: TaskManager,
    ) -> Self {
        Self {
            categories,
            consumables,
            tasks,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root::index))
        .route("/health", get(health::health_handler))
        // categories
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route("/api/categories/type/{kind}", get(categories::list_by_kind))
        .route(
            "/api/categories/{id}",
            get(categories::get_one)
                .put(categories::update)
                .delete(categories::delete),
        )
        // consumables
        .route(
            "/api/consumables",
            get(consumables::list).post(consumables::create),
        )
        .route(
            "/api/consumables/auto-decrease",
            post(consumables::auto_decrease),
        )
        .route(
            "/api/consumables/category/{id}",
            get(consumables::list_by_category),
        )
        .route(
            "/api/consumables/{id}",
            get(consumables::get_one)
                .put(consumables::update)
                .delete(consumables::delete),
        )
        .route("/api/consumables/{id}/decrease", post(consumables::decrease))
        .route("/api/consumables/{id}/refill", post(consumables::refill))
        // tasks
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/category/{id}", get(tasks::list_by_category))
        .route("/api/tasks/status/{status}", get(tasks::list_by_status))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_one).put(tasks::update).delete(tasks::delete),
        )
        .route("/api/tasks/{id}/toggle", post(tasks::toggle))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
