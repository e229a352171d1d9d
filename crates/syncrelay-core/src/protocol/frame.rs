//! Forgiving frame decoding.
//!
//! Every failure here is `SyncRelayError::Decode`: the frame is bad, the
//! connection is not. Readers skip such frames and keep reading.

use crate::error::{Result, SyncRelayError};
use crate::protocol::message::Message;

/// Decode a text frame body into a message.
pub fn decode_text(s: &str) -> Result<Message> {
    let msg: Message = serde_json::from_str(s)
        .map_err(|e| SyncRelayError::Decode(format!("invalid message json: {e}")))?;
    validate(msg)
}

/// Decode a binary frame body. Binary frames must hold UTF-8 JSON.
pub fn decode_binary(buf: &[u8]) -> Result<Message> {
    let msg: Message = serde_json::from_slice(buf)
        .map_err(|e| SyncRelayError::Decode(format!("invalid message bytes: {e}")))?;
    validate(msg)
}

fn validate(msg: Message) -> Result<Message> {
    if msg.msg_type.is_empty() {
        return Err(SyncRelayError::Decode("message type must not be empty".into()));
    }
    Ok(msg)
}
