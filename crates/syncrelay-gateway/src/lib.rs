//! syncRelay gateway library entry.
//!
//! Wires the transport, the broker and its dispatch workers, and the ops
//! endpoints into one axum service. Used by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
