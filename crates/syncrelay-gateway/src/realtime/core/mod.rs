//! Realtime core components for Gateway runtime.
//!
//! Everything in `channel` and `registry` is single-writer state: only a
//! dispatch worker spawned by `broker` ever touches it.

mod broker;
mod channel;
mod client;
mod registry;

pub use broker::{Broker, LeaveGuard};
pub use channel::{Channel, Membership};
pub use client::{Client, ClientReader};
pub use registry::{Admission, Registry};
