use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use syncrelay_core::Message;

/// Per-connection identity. Generated on upgrade, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unit of work for a dispatch worker: one message bound for one channel.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// `None` for relay-originated messages (catch-up requests on join).
    pub sender: Option<ClientId>,
    pub channel: Arc<str>,
    pub message: Message,
}

impl Envelope {
    pub fn new(sender: Option<ClientId>, channel: impl Into<Arc<str>>, message: Message) -> Self {
        Self {
            sender,
            channel: channel.into(),
            message,
        }
    }

    /// Catch-up request addressed to `channel` on behalf of a new joiner.
    pub fn catch_up_request(channel: impl Into<Arc<str>>) -> Self {
        Self::new(None, channel, Message::catch_up_request())
    }
}

/// What a session learns about its own admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// First member of a fresh channel; admitted synchronized.
    pub founder: bool,
    /// Member count right after admission.
    pub members: usize,
}

/// Result of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<ClientId>,
    pub skipped: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

/// Point-in-time view of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    pub members: usize,
    pub stale: usize,
}
