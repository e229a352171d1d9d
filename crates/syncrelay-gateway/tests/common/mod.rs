//! Shared helpers for gateway integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as WsMessage;
use futures_util::{stream, Stream};
use serde_json::Value;
use tokio::sync::mpsc;

use syncrelay_gateway::realtime::{Broker, ChannelSnapshot, Client, ClientId};

/// A client whose outbound queue the test reads directly.
pub struct Peer {
    pub client: Arc<Client>,
    pub rx: mpsc::Receiver<WsMessage>,
}

impl Peer {
    pub fn new(channel: &str) -> Self {
        let (client, rx) = Client::with_queue(channel, 4096);
        Self {
            client: Arc::new(client),
            rx,
        }
    }

    pub fn id(&self) -> ClientId {
        self.client.id()
    }

    /// Everything queued so far, decoded.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let WsMessage::Text(t) = msg {
                out.push(serde_json::from_str(&t).unwrap());
            }
        }
        out
    }

    /// Wait for the next text frame.
    pub async fn next(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("outbound queue closed");
            if let WsMessage::Text(t) = msg {
                return serde_json::from_str(&t).unwrap();
            }
        }
    }
}

/// Round-trip through every worker: all earlier commands have been applied.
pub async fn settle(broker: &Broker) -> Vec<ChannelSnapshot> {
    broker.snapshot().await.unwrap()
}

pub fn find<'a>(snap: &'a [ChannelSnapshot], name: &str) -> Option<&'a ChannelSnapshot> {
    snap.iter().find(|c| c.name == name)
}

/// Poll the broker until `pred` holds.
pub async fn wait_until(broker: &Broker, pred: impl Fn(&[ChannelSnapshot]) -> bool) {
    for _ in 0..200 {
        if pred(settle(broker).await.as_slice()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("broker never reached the expected state");
}

pub type Inbound = Pin<Box<dyn Stream<Item = Result<WsMessage, String>> + Send>>;

/// A fake socket read half fed by the returned sender.
pub fn inbound() -> (mpsc::Sender<Result<WsMessage, String>>, Inbound) {
    let (tx, rx) = mpsc::channel(16);
    let s: Inbound = Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|m| (m, rx))
    }));
    (tx, s)
}

pub fn text(s: &str) -> Result<WsMessage, String> {
    Ok(WsMessage::Text(s.to_string()))
}
