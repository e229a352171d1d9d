//! Top-level facade crate for syncRelay.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use syncrelay_core::*;
}

pub mod gateway {
    pub use syncrelay_gateway::*;
}
