//! Channel registry: name -> live channel.
//!
//! Owned by one dispatch worker. Channels appear on first join and vanish when
//! their last member leaves, so a reused name always starts clean.

use std::collections::HashMap;
use std::sync::Arc;

use crate::realtime::core::{Channel, Client, Membership};
use crate::realtime::types::{ChannelSnapshot, ClientId, DeliveryReport, Envelope, JoinOutcome};

/// Result of admitting a client.
#[derive(Debug)]
pub struct Admission {
    pub outcome: JoinOutcome,
    /// Present when a new member joined a populated channel: to be delivered
    /// right after the admission.
    pub catch_up: Option<Envelope>,
}

#[derive(Default)]
pub struct Registry {
    channels: HashMap<String, Channel>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn join(&mut self, client: Arc<Client>) -> Admission {
        let name = client.channel().to_string();
        let channel = self
            .channels
            .entry(name.clone())
            .or_insert_with(|| Channel::new(name.as_str()));

        let membership = channel.admit(client);
        let outcome = JoinOutcome {
            founder: membership == Membership::Founded,
            members: channel.len(),
        };
        let catch_up =
            (membership == Membership::Joined).then(|| Envelope::catch_up_request(name));

        Admission { outcome, catch_up }
    }

    /// Returns whether `id` was a member of `name`.
    pub fn leave(&mut self, name: &str, id: ClientId) -> bool {
        let Some(channel) = self.channels.get_mut(name) else {
            tracing::debug!(channel = %name, client = %id, "leave for unknown channel");
            return false;
        };
        let removed = channel.remove(id);
        if channel.is_empty() {
            self.channels.remove(name);
            tracing::debug!(channel = %name, "channel dropped");
        }
        removed
    }

    pub fn deliver(&mut self, env: &Envelope) -> DeliveryReport {
        match self.channels.get_mut(&*env.channel) {
            Some(channel) => channel.deliver(env),
            None => {
                tracing::debug!(channel = %env.channel, "publish to missing channel dropped");
                DeliveryReport::default()
            }
        }
    }

    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        self.channels.values().map(Channel::snapshot).collect()
    }

    pub fn invariant_holds(&self) -> bool {
        self.channels
            .values()
            .all(|c| !c.is_empty() && c.invariant_holds())
    }
}
