//! HTTP rendering of `SyncRelayError` for the non-WebSocket paths
//! (rejected upgrades, ops endpoints).

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use syncrelay_core::error::SyncRelayError;

pub fn status_for(err: &SyncRelayError) -> StatusCode {
    match err {
        SyncRelayError::BadRequest(_) | SyncRelayError::Decode(_) => StatusCode::BAD_REQUEST,
        SyncRelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        SyncRelayError::BrokerUnavailable | SyncRelayError::SendQueueFull => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SyncRelayError::ConnectionClosed | SyncRelayError::Transport(_) => StatusCode::BAD_GATEWAY,
        SyncRelayError::UnsupportedVersion | SyncRelayError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn error_response(err: &SyncRelayError) -> Response {
    let body = Json(json!({
        "error": err.client_code().as_str(),
        "message": err.to_string(),
    }));
    let mut resp = (status_for(err), body).into_response();
    if let SyncRelayError::RateLimited { retry_after_secs } = err {
        resp.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
    }
    resp
}
