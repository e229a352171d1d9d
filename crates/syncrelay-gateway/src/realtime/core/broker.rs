//! Broker: the only way into channel state.
//!
//! Sessions hold a cloneable `Broker` and turn join / leave / publish into
//! commands. Each dispatch worker owns a `Registry` outright and applies its
//! commands one at a time, so membership, staleness and delivery never race.
//!
//! Queues have capacity 1: `submit` completes only once the worker has taken
//! the previous command. With one shard the worker sees side effects in
//! submission order across all channels; with N shards a channel is pinned to
//! one worker and ordering holds per channel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use syncrelay_core::error::{Result, SyncRelayError};
use syncrelay_core::Message;

use crate::config::DispatchSection;
use crate::realtime::core::{Client, Registry};
use crate::realtime::types::{ChannelSnapshot, ClientId, Envelope, JoinOutcome};

const HANDOFF_CAPACITY: usize = 1;

enum Command {
    Join {
        client: Arc<Client>,
        reply: oneshot::Sender<JoinOutcome>,
    },
    Leave {
        channel: Arc<str>,
        client: ClientId,
    },
    Publish(Envelope),
    Snapshot {
        reply: oneshot::Sender<Vec<ChannelSnapshot>>,
    },
}

#[derive(Clone)]
pub struct Broker {
    shards: Arc<[mpsc::Sender<Command>]>,
}

impl Broker {
    /// Start the dispatch workers described by `cfg`.
    pub fn spawn(cfg: &DispatchSection) -> (Self, Vec<JoinHandle<()>>) {
        Self::spawn_sharded(cfg.shards)
    }

    pub fn spawn_sharded(shards: usize) -> (Self, Vec<JoinHandle<()>>) {
        let n = shards.max(1);
        let mut senders = Vec::with_capacity(n);
        let mut workers = Vec::with_capacity(n);
        for shard in 0..n {
            let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
            senders.push(tx);
            workers.push(tokio::spawn(run(shard, rx)));
        }
        (
            Self {
                shards: senders.into(),
            },
            workers,
        )
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, channel: &str) -> &mpsc::Sender<Command> {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        let mut h = DefaultHasher::new();
        channel.hash(&mut h);
        &self.shards[(h.finish() % self.shards.len() as u64) as usize]
    }

    async fn submit(&self, channel: &str, cmd: Command) -> Result<()> {
        self.shard(channel)
            .send(cmd)
            .await
            .map_err(|_| SyncRelayError::BrokerUnavailable)
    }

    /// Admit `client` to its channel, creating the channel if needed. A joiner
    /// of a non-empty channel causes one catch-up request to be delivered.
    pub async fn join(&self, client: Arc<Client>) -> Result<JoinOutcome> {
        let channel = client.channel().to_owned();
        let (reply, rx) = oneshot::channel();
        self.submit(&channel, Command::Join { client, reply }).await?;
        rx.await.map_err(|_| SyncRelayError::BrokerUnavailable)
    }

    pub async fn leave(&self, channel: &str, client: ClientId) -> Result<()> {
        let cmd = Command::Leave {
            channel: channel.into(),
            client,
        };
        self.submit(channel, cmd).await
    }

    /// Fire-and-forget: returns once the envelope is queued, not delivered.
    pub async fn publish(&self, sender: ClientId, channel: &str, message: Message) -> Result<()> {
        let env = Envelope::new(Some(sender), channel, message);
        self.submit(channel, Command::Publish(env)).await
    }

    /// Live channels across all shards, sorted by name.
    pub async fn snapshot(&self) -> Result<Vec<ChannelSnapshot>> {
        let mut out = Vec::new();
        for tx in self.shards.iter() {
            let (reply, rx) = oneshot::channel();
            tx.send(Command::Snapshot { reply })
                .await
                .map_err(|_| SyncRelayError::BrokerUnavailable)?;
            out.extend(rx.await.map_err(|_| SyncRelayError::BrokerUnavailable)?);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

/// Dispatch worker. Runs until every `Broker` handle is dropped.
async fn run(shard: usize, mut rx: mpsc::Receiver<Command>) {
    tracing::info!(shard, "dispatch worker started");
    let mut registry = Registry::new();
    while let Some(cmd) = rx.recv().await {
        apply(&mut registry, cmd);
    }
    tracing::info!(shard, "dispatch worker stopped");
}

fn apply(registry: &mut Registry, cmd: Command) {
    match cmd {
        Command::Join { client, reply } => {
            let id = client.id();
            let admission = registry.join(client);
            tracing::debug!(
                client = %id,
                founder = admission.outcome.founder,
                members = admission.outcome.members,
                "admitted"
            );
            // A cancelled joiner still became a member; its leave guard removes it.
            let _ = reply.send(admission.outcome);
            if let Some(env) = admission.catch_up {
                registry.deliver(&env);
            }
        }
        Command::Leave { channel, client } => {
            registry.leave(&channel, client);
        }
        Command::Publish(env) => {
            let report = registry.deliver(&env);
            tracing::trace!(
                channel = %env.channel,
                msg_type = %env.message.msg_type,
                delivered = report.delivered_count(),
                skipped = report.skipped,
                failed = report.failed,
                "published"
            );
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(registry.snapshot());
        }
    }
    debug_assert!(registry.invariant_holds(), "stale set escaped its member set");
}

/// Submits `Leave` for a session on every exit path.
///
/// Call `leave` on the normal path. If the guard is dropped still armed
/// (early return, `?`, cancellation) the leave is submitted from a spawned task.
pub struct LeaveGuard {
    broker: Broker,
    channel: Arc<str>,
    client: ClientId,
    armed: bool,
}

impl LeaveGuard {
    pub fn new(broker: Broker, channel: impl Into<Arc<str>>, client: ClientId) -> Self {
        Self {
            broker,
            channel: channel.into(),
            client,
            armed: true,
        }
    }

    pub async fn leave(mut self) -> Result<()> {
        self.armed = false;
        self.broker.leave(&self.channel, self.client).await
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let broker = self.broker.clone();
        let channel = Arc::clone(&self.channel);
        let client = self.client;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = broker.leave(&channel, client).await {
                        tracing::debug!(%channel, %client, error = %e, "deferred leave not submitted");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(%channel, %client, "no runtime to submit leave");
            }
        }
    }
}
