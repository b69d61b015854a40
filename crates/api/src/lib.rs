pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Encounter routes (100 MB body limit for audio uploads)
    let encounter_routes = Router::new()
        .route("/process", post(routes::encounter::process))
        .route("/", post(routes::encounter::save))
        .route("/{encounter_id}", get(routes::encounter::get))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024));

    let api = Router::new().nest("/encounter", encounter_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
