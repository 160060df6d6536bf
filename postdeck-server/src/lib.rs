//! HTTP API over the postdeck workflow
//!
//! Exposed as a library so integration tests can drive the router in-process.

pub mod error;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router with middleware applied
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home::index))
        .merge(routes::posts::router())
        .merge(routes::compose::router())
        .merge(routes::workspaces::router())
        .merge(routes::keys::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
