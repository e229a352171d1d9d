//! Protocol modules (message envelope + frame decoding).
//!
//! - `message`: the JSON envelope exchanged between peers, reserved catch-up
//!   tags, and the copy-on-send relay annotation.
//! - `frame`: forgiving decoders that turn raw frame bodies into messages.
//!
//! Decoders never panic; malformed input is reported as
//! `SyncRelayError::Decode` so callers can treat it as recoverable noise.

pub mod frame;
pub mod message;
