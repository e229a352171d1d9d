//! Shared error type across syncRelay crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Too many handshakes.
    RateLimited,
    /// The peer connection is gone.
    ConnectionClosed,
    /// Relay cannot accept work right now.
    Unavailable,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::RateLimited => "RATE_LIMITED",
            ClientCode::ConnectionClosed => "CONNECTION_CLOSED",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SyncRelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum SyncRelayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A frame arrived but did not hold a valid message. Recoverable.
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("transport: {0}")]
    Transport(String),
    #[error("outbound queue full")]
    SendQueueFull,
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },
    #[error("broker unavailable")]
    BrokerUnavailable,
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SyncRelayError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SyncRelayError::BadRequest(_) | SyncRelayError::Decode(_) => ClientCode::BadRequest,
            SyncRelayError::ConnectionClosed | SyncRelayError::Transport(_) => {
                ClientCode::ConnectionClosed
            }
            SyncRelayError::SendQueueFull | SyncRelayError::BrokerUnavailable => {
                ClientCode::Unavailable
            }
            SyncRelayError::RateLimited { .. } => ClientCode::RateLimited,
            SyncRelayError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SyncRelayError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Recoverable errors are noise on an otherwise healthy connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncRelayError::Decode(_))
    }
}
