//! Relay message envelope (JSON).
//!
//! `meta` and `payload` are opaque to the relay. The only field the core reads
//! is `type`, and the only field it writes is the `relayed` annotation in
//! `meta`, applied to a copy per recipient.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SyncRelayError};

/// Reserved tag: ask one synchronized peer to produce current state.
pub const CATCH_UP_REQUEST: &str = "sync/request";
/// Reserved tag: state for stale members; delivery clears their staleness.
pub const CATCH_UP_REPLY: &str = "sync/reply";
/// `meta` key set on every message the relay delivers.
pub const RELAYED_KEY: &str = "relayed";

/// How the delivery policy treats a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    CatchUpRequest,
    CatchUpReply,
    Ordinary,
}

/// Wire message (one JSON object per frame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Application-defined tag (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Free-form metadata, forwarded verbatim apart from the relay annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    /// Opaque application payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            meta: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The relay-originated request sent on behalf of a new joiner.
    pub fn catch_up_request() -> Self {
        Self::new(CATCH_UP_REQUEST)
    }

    pub fn kind(&self) -> MessageKind {
        match self.msg_type.as_str() {
            CATCH_UP_REQUEST => MessageKind::CatchUpRequest,
            CATCH_UP_REPLY => MessageKind::CatchUpReply,
            _ => MessageKind::Ordinary,
        }
    }

    /// Copy of this message as delivered to one recipient: `meta` is
    /// materialized and marked as relayed. `self` is left untouched so a single
    /// message can fan out to many recipients.
    pub fn annotated(&self) -> Self {
        let mut out = self.clone();
        out.meta
            .get_or_insert_with(Map::new)
            .insert(RELAYED_KEY.to_string(), Value::Bool(true));
        out
    }

    /// Serialize to a text frame body.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SyncRelayError::Internal(format!("json encode failed: {e}")))
    }
}
