//! WebSocket frame -> relay message.
//!
//! - Text / Binary frames => `Message` (binary must hold UTF-8 JSON)
//! - Ping / Pong => nothing to deliver (`Ok(None)`); axum answers pings itself
//! - Close => `ConnectionClosed`

use axum::extract::ws::Message as WsMessage;
use syncrelay_core::{
    error::{Result, SyncRelayError},
    protocol::frame,
    Message,
};

pub fn decode(msg: WsMessage) -> Result<Option<Message>> {
    match msg {
        WsMessage::Text(s) => frame::decode_text(&s).map(Some),
        WsMessage::Binary(b) => frame::decode_binary(&b).map(Some),
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Err(SyncRelayError::ConnectionClosed),
    }
}
