//! Axum router construction for the Switchboard server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for the browser front end.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the server.
///
/// The router includes:
/// - `GET /` -- plain-text banner
/// - `GET {ws_path}` -- observer `WebSocket` (default `/ws`)
/// - `GET /switches` -- list switches
/// - `GET /switches/{id}` -- single switch
/// - `PUT /switches/{id}` -- set status
///
/// CORS allows any origin, method, and header.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_path = state.ws_path.clone();

    Router::new()
        .route("/", get(handlers::index))
        .route(&ws_path, get(ws::ws_switches))
        .route("/switches", get(handlers::list_switches))
        .route(
            "/switches/{id}",
            get(handlers::get_switch).put(handlers::put_switch),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
