use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};

use syncrelay_core::error::{Result, SyncRelayError};
use syncrelay_core::Message;

use crate::realtime::types::ClientId;
use crate::transport::codec;

/// Outbound half of one connection.
///
/// The dispatch worker writes through `send`; the connection's writer task
/// drains the queue into the socket. Writes never block the worker: a full
/// queue is reported as `SendQueueFull`.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    channel: Arc<str>,
    tx: mpsc::Sender<WsMessage>,
    closed: AtomicBool,
}

impl Client {
    pub fn new(channel: impl Into<Arc<str>>, tx: mpsc::Sender<WsMessage>) -> Self {
        Self {
            id: ClientId::new(),
            channel: channel.into(),
            tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Client plus the receiving end of its outbound queue.
    pub fn with_queue(
        channel: impl Into<Arc<str>>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(channel, tx), rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    /// Annotate a copy of `msg` as relayed and queue it.
    ///
    /// Channel fan-out encodes once and goes through `send_text` instead.
    pub fn send(&self, msg: &Message) -> Result<()> {
        let text = msg.annotated().to_json()?;
        self.send_text(text)
    }

    /// Queue an already annotated and encoded frame (fan-out encodes once).
    pub(crate) fn send_text(&self, text: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SyncRelayError::ConnectionClosed);
        }
        self.tx.try_send(WsMessage::Text(text)).map_err(|e| match e {
            TrySendError::Full(_) => SyncRelayError::SendQueueFull,
            TrySendError::Closed(_) => SyncRelayError::ConnectionClosed,
        })
    }

    /// Ask the writer to close the socket. Only the first call has an effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // A full queue still drains; the writer stops once every sender is gone.
        let _ = self.tx.try_send(WsMessage::Close(None));
    }
}

/// Inbound half of one connection, owned by its session task.
pub struct ClientReader<S> {
    stream: S,
    client: ClientId,
    noise: u64,
}

impl<S, E> ClientReader<S>
where
    S: Stream<Item = std::result::Result<WsMessage, E>> + Unpin,
    E: Display,
{
    pub fn new(client: ClientId, stream: S) -> Self {
        Self {
            stream,
            client,
            noise: 0,
        }
    }

    /// Frames dropped as malformed so far.
    pub fn noise(&self) -> u64 {
        self.noise
    }

    /// Read the next message. Malformed frames and control frames are skipped;
    /// only a closed or broken connection ends the read with an error.
    pub async fn receive(&mut self) -> Result<Message> {
        loop {
            let frame = match self.stream.next().await {
                None => return Err(SyncRelayError::ConnectionClosed),
                Some(Err(e)) => return Err(SyncRelayError::Transport(e.to_string())),
                Some(Ok(frame)) => frame,
            };

            match codec::decode(frame) {
                Ok(Some(msg)) => return Ok(msg),
                Ok(None) => continue,
                Err(e) if e.is_recoverable() => {
                    self.noise += 1;
                    tracing::debug!(client = %self.client, error = %e, "dropping malformed frame");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
