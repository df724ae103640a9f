use crate::state::AppState;
use crate::{logging, monitor};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

async fn health() -> &'static str {
    "ok"
}

pub fn build_http_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(monitor::api::monitor_routes())
        .layer(middleware::from_fn(logging::request_logging))
        .layer(cors)
        .with_state(state)
}
