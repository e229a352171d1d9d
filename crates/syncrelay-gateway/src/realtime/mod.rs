//! Realtime runtime for syncRelay Gateway.
//!
//! Clients, channels with their staleness model, the worker-owned registry,
//! and the broker handle sessions use to reach it.

pub mod core;
pub mod types;

pub use self::core::{Broker, Channel, Client, ClientReader, Registry};
pub use types::{ChannelSnapshot, ClientId, DeliveryReport, Envelope, JoinOutcome};
