//! Axum router wiring (HTTP -> WS upgrade, ops).

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/:channel", get(transport::ws::ws_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/v1/channels", get(ops::channels))
        .with_state(state)
}
