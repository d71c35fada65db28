//! Router assembly.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{ai_edit, edit, health};
use crate::state::AppState;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ai-edit/generate", post(ai_edit::generate))
        .route("/ai-edit/plan/:job_id", get(ai_edit::get_plan))
        .route("/ai-edit/apply/:job_id", post(ai_edit::apply))
        .route("/edit/:edit_job_id", get(edit::get_edit_job));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
