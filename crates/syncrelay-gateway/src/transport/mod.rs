//! Transport layer (WebSocket).
//!
//! Upgrade handler and session driver, the frame codec, and the pre-upgrade
//! handshake defender.

pub mod codec;
pub mod handshake;
pub mod ws;
