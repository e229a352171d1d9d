//! One channel: members, their staleness, and the delivery policy.
//!
//! Not synchronized. A `Channel` lives inside a `Registry` owned by exactly one
//! dispatch worker.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use syncrelay_core::MessageKind;

use crate::realtime::core::Client;
use crate::realtime::types::{ChannelSnapshot, ClientId, DeliveryReport, Envelope};

/// How `Channel::admit` placed a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// First member of an empty channel; starts synchronized.
    Founded,
    /// Joined a populated channel; starts stale.
    Joined,
    /// Was a member already; nothing changed.
    AlreadyMember,
}

pub struct Channel {
    name: Arc<str>,
    members: HashMap<ClientId, Arc<Client>>,
    /// Members that have not received catch-up state yet. Always ⊆ `members`.
    stale: HashSet<ClientId>,
}

impl Channel {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
            stale: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn is_stale(&self, id: ClientId) -> bool {
        self.stale.contains(&id)
    }

    pub fn stale_len(&self) -> usize {
        self.stale.len()
    }

    /// Stale set is a subset of the member set.
    pub fn invariant_holds(&self) -> bool {
        self.stale.iter().all(|id| self.members.contains_key(id))
    }

    /// Add a member. The founder of an empty channel has nothing to catch up
    /// on and starts synchronized; every later joiner starts stale.
    ///
    /// Admitting a client that is already a member changes nothing.
    pub fn admit(&mut self, client: Arc<Client>) -> Membership {
        let id = client.id();
        if self.members.contains_key(&id) {
            return Membership::AlreadyMember;
        }
        if self.members.is_empty() {
            self.members.insert(id, client);
            return Membership::Founded;
        }
        self.members.insert(id, client);
        self.stale.insert(id);
        Membership::Joined
    }

    /// Drop a member. Returns whether it was one.
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.stale.remove(&id);
        self.members.remove(&id).is_some()
    }

    /// Delivery eligibility:
    /// - the sender itself is never skipped by this rule;
    /// - a stale recipient only takes the catch-up reply;
    /// - a synchronized recipient takes everything but the catch-up reply.
    pub fn skip_delivery(&self, recipient: ClientId, env: &Envelope) -> bool {
        if env.sender == Some(recipient) {
            return false;
        }
        let is_reply = env.message.kind() == MessageKind::CatchUpReply;
        if self.stale.contains(&recipient) {
            !is_reply
        } else {
            is_reply
        }
    }

    /// Fan `env` out to every eligible member other than the sender.
    ///
    /// A successful write marks the recipient synchronized. A failed write is
    /// logged and the fan-out continues. A catch-up request stops after its
    /// first successful write, so exactly one synchronized peer is asked.
    pub fn deliver(&mut self, env: &Envelope) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let text = match env.message.annotated().to_json() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(channel = %self.name, error = %e, "encode failed, message dropped");
                return report;
            }
        };
        let single_target = env.message.kind() == MessageKind::CatchUpRequest;

        for (id, client) in &self.members {
            if env.sender == Some(*id) || self.skip_delivery(*id, env) {
                report.skipped += 1;
                continue;
            }

            match client.send_text(text.clone()) {
                Ok(()) => {
                    self.stale.remove(id);
                    report.delivered.push(*id);
                    if single_target {
                        break;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        channel = %self.name,
                        recipient = %id,
                        msg_type = %env.message.msg_type,
                        error = %e,
                        "delivery failed"
                    );
                }
            }
        }

        if single_target && report.delivered.is_empty() {
            tracing::debug!(channel = %self.name, "catch-up request has no synchronized peer to answer it");
        }

        report
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            name: self.name.to_string(),
            members: self.members.len(),
            stale: self.stale.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message as WsMessage;
    use serde_json::json;
    use syncrelay_core::Message;
    use tokio::sync::mpsc;

    use super::*;

    struct Peer {
        client: Arc<Client>,
        rx: mpsc::Receiver<WsMessage>,
    }

    impl Peer {
        fn new() -> Self {
            let (client, rx) = Client::with_queue("room1", 16);
            Self {
                client: Arc::new(client),
                rx,
            }
        }

        fn id(&self) -> ClientId {
            self.client.id()
        }

        fn drain(&mut self) -> Vec<serde_json::Value> {
            let mut out = Vec::new();
            while let Ok(WsMessage::Text(t)) = self.rx.try_recv() {
                out.push(serde_json::from_str(&t).unwrap());
            }
            out
        }
    }

    fn env(sender: Option<ClientId>, msg_type: &str) -> Envelope {
        Envelope::new(sender, "room1", Message::new(msg_type))
    }

    #[test]
    fn founder_is_synchronized_joiners_are_stale() {
        let mut ch = Channel::new("room1");
        let (a, b) = (Peer::new(), Peer::new());

        assert_eq!(ch.admit(a.client.clone()), Membership::Founded);
        assert_eq!(ch.admit(b.client.clone()), Membership::Joined);
        assert!(!ch.is_stale(a.id()));
        assert!(ch.is_stale(b.id()));
        assert!(ch.invariant_holds());

        // re-admission is a no-op
        assert_eq!(ch.admit(b.client.clone()), Membership::AlreadyMember);
        assert_eq!(ch.admit(a.client.clone()), Membership::AlreadyMember);
        assert!(!ch.is_stale(a.id()));
        assert_eq!(ch.len(), 2);
        assert_eq!(ch.stale_len(), 1);
    }

    #[test]
    fn remove_clears_staleness() {
        let mut ch = Channel::new("room1");
        let (a, b) = (Peer::new(), Peer::new());
        ch.admit(a.client.clone());
        ch.admit(b.client.clone());

        assert!(ch.remove(b.id()));
        assert!(!ch.remove(b.id()));
        assert_eq!(ch.stale_len(), 0);
        assert!(ch.invariant_holds());
        assert!(ch.remove(a.id()));
        assert!(ch.is_empty());
    }

    #[test]
    fn skip_rules() {
        let mut ch = Channel::new("room1");
        let (a, b) = (Peer::new(), Peer::new());
        ch.admit(a.client.clone());
        ch.admit(b.client.clone());

        // sender is never skipped by the predicate
        assert!(!ch.skip_delivery(b.id(), &env(Some(b.id()), "chat")));

        // stale: only the reply gets through
        assert!(ch.skip_delivery(b.id(), &env(Some(a.id()), "chat")));
        assert!(ch.skip_delivery(b.id(), &env(None, "sync/request")));
        assert!(!ch.skip_delivery(b.id(), &env(Some(a.id()), "sync/reply")));

        // synchronized: everything but the reply
        assert!(!ch.skip_delivery(a.id(), &env(Some(b.id()), "chat")));
        assert!(!ch.skip_delivery(a.id(), &env(None, "sync/request")));
        assert!(ch.skip_delivery(a.id(), &env(Some(b.id()), "sync/reply")));
    }

    #[test]
    fn ordinary_message_reaches_synchronized_members_only() {
        let mut ch = Channel::new("room1");
        let (mut a, mut b, mut c) = (Peer::new(), Peer::new(), Peer::new());
        ch.admit(a.client.clone());
        ch.admit(b.client.clone());
        ch.admit(c.client.clone());

        // promote c
        ch.deliver(&env(Some(a.id()), "sync/reply"));
        b.drain();
        c.drain();
        assert!(!ch.is_stale(b.id()) && !ch.is_stale(c.id()));

        let d = Peer::new();
        ch.admit(d.client.clone());

        let report = ch.deliver(&Envelope::new(
            Some(a.id()),
            "room1",
            Message::new("chat").with_payload(json!("hi")),
        ));
        assert_eq!(report.delivered_count(), 2);
        assert!(a.drain().is_empty());
        assert_eq!(b.drain()[0]["payload"], json!("hi"));
        assert_eq!(c.drain()[0]["meta"]["relayed"], json!(true));
        assert!(ch.is_stale(d.id()));
        assert!(ch.invariant_holds());
    }

    #[test]
    fn catch_up_request_goes_to_exactly_one_synchronized_member() {
        let mut ch = Channel::new("room1");
        let mut peers: Vec<Peer> = (0..4).map(|_| Peer::new()).collect();
        for p in &peers {
            ch.admit(p.client.clone());
        }
        // synchronize everyone but the last joiner
        ch.deliver(&env(Some(peers[0].id()), "sync/reply"));
        let joiner = Peer::new();
        ch.admit(joiner.client.clone());
        for p in peers.iter_mut() {
            p.drain();
        }

        let report = ch.deliver(&Envelope::catch_up_request("room1"));
        assert_eq!(report.delivered_count(), 1);
        let chosen = report.delivered[0];
        assert_ne!(chosen, joiner.id());
        assert!(!ch.is_stale(chosen));

        let got: usize = peers.iter_mut().map(|p| p.drain().len()).sum();
        assert_eq!(got, 1);
    }

    #[test]
    fn catch_up_request_without_synchronized_peer_goes_nowhere() {
        let mut ch = Channel::new("room1");
        let (a, b) = (Peer::new(), Peer::new());
        ch.admit(a.client.clone());
        ch.admit(b.client.clone());
        ch.remove(a.id());

        let report = ch.deliver(&Envelope::catch_up_request("room1"));
        assert!(report.delivered.is_empty());
        assert!(ch.is_stale(b.id()));
    }

    #[test]
    fn failed_write_does_not_stop_fan_out() {
        let mut ch = Channel::new("room1");
        let a = Peer::new();
        let b = Peer::new();
        let mut c = Peer::new();
        ch.admit(a.client.clone());
        ch.admit(b.client.clone());
        ch.admit(c.client.clone());

        let Peer { client: b_client, rx: b_rx } = b;
        drop(b_rx);

        let report = ch.deliver(&env(Some(a.id()), "sync/reply"));
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, vec![c.id()]);
        assert_eq!(c.drain().len(), 1);

        // a failed recipient stays a stale member until its own session leaves
        assert!(ch.contains(b_client.id()));
        assert!(ch.is_stale(b_client.id()));
        assert!(!ch.is_stale(c.id()));
    }

    #[test]
    fn catch_up_request_falls_through_failed_peer() {
        let mut ch = Channel::new("room1");
        let a = Peer::new();
        ch.admit(a.client.clone());
        let joiner = Peer::new();
        ch.admit(joiner.client.clone());

        let Peer { client: _a_client, rx: a_rx } = a;
        drop(a_rx);

        let report = ch.deliver(&Envelope::catch_up_request("room1"));
        assert_eq!(report.failed, 1);
        assert!(report.delivered.is_empty());
    }
}
