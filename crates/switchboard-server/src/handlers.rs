//! REST API endpoint handlers for the Switchboard server.
//!
//! All handlers go through the shared [`Registry`](switchboard_core::Registry).
//! A successful `PUT` is broadcast to observers by the registry's mutation
//! hook, not by the handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text banner |
//! | `GET` | `/switches` | List all switches |
//! | `GET` | `/switches/{id}` | Get one switch |
//! | `PUT` | `/switches/{id}` | Set status, body `{"status": "ON"\|"OFF"}` |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::Value;
use switchboard_types::Switch;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Banner served at `GET /`.
pub async fn index() -> &'static str {
    "Switchboard server"
}

/// Return every switch as a JSON array.
pub async fn list_switches(State(state): State<Arc<AppState>>) -> Json<Vec<Switch>> {
    Json(state.registry.list())
}

/// Return one switch, or 404.
pub async fn get_switch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Switch>, ApiError> {
    Ok(Json(state.registry.get(&id)?))
}

/// Set a switch's status.
///
/// The id is resolved before the body is looked at, so an unknown id is a
/// 404 whatever the body holds. A body that is not JSON is
/// [`ApiError::InvalidBody`]; a JSON body whose `status` is missing, not a
/// string, or not `ON`/`OFF` is [`ApiError::InvalidStatus`]. Other fields
/// are ignored, which also means a `TOGGLE_SWITCH` message sent here is
/// rejected for lack of a `status`.
pub async fn put_switch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Switch>, ApiError> {
    state.registry.get(&id)?;

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        debug!(switch_id = %id, error = %e, "rejecting unparseable PUT body");
        ApiError::InvalidBody
    })?;
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or(ApiError::InvalidStatus)?;

    Ok(Json(state.registry.set_status(&id, status)?))
}
