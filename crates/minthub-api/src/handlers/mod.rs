//! Route handlers and router construction.

pub mod jobs;
pub mod tokens;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use minthub_db::Database;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle; producers and inspection go through `db.jobs`.
    pub db: Database,
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Producer surface: enqueue a token operation, 202 + job record
        .route("/api/v1/tokens/mint", post(tokens::mint))
        .route("/api/v1/tokens/burn", post(tokens::burn))
        .route("/api/v1/tokens/distribute", post(tokens::distribute))
        .route("/api/v1/tokens/freeze", post(tokens::freeze))
        .route("/api/v1/tokens/transfer", post(tokens::transfer))
        // Generic producer + inspection surface
        .route("/api/v1/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/v1/jobs/stats", get(jobs::queue_stats))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::get_job).delete(jobs::delete_job),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
