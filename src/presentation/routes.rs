// HTTP routes
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    generate_export, generate_from_panels, health_check, list_fields, list_indices, list_panels,
    panel_data,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/reports/panels", get(list_panels))
        .route("/reports/panel-data", get(panel_data))
        .route("/reports/generate-from-panels", post(generate_from_panels))
        .route("/reports/indices", get(list_indices))
        .route("/reports/fields", get(list_fields))
        .route("/reports/generate", post(generate_export))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
