//! syncRelay core: transport-agnostic message contracts and error types.
//!
//! This crate defines the wire-level message envelope, the reserved catch-up
//! tags, and the error surface shared by the gateway and its tests. It carries
//! no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `SyncRelayError`/`Result` so a malformed frame
//! from one peer cannot take the relay down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SyncRelayError};
pub use protocol::message::{Message, MessageKind};
