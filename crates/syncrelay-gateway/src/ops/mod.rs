//! Operational HTTP endpoints.
//!
//! - `/healthz`     : liveness
//! - `/v1/channels` : live channels with member / stale counts

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::error_response;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn channels(State(state): State<AppState>) -> Response {
    match state.broker().snapshot().await {
        Ok(channels) => {
            let count = channels.len();
            Json(json!({ "count": count, "channels": channels })).into_response()
        }
        Err(e) => error_response(&e),
    }
}
