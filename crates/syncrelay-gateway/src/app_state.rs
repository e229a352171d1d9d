//! Shared application state for syncRelay Gateway.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::realtime::Broker;
use crate::transport::handshake::HandshakeDefender;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    broker: Broker,
}

struct AppStateInner {
    cfg: GatewayConfig,
    handshake: HandshakeDefender,
}

impl AppState {
    /// `broker` must already have its dispatch workers running.
    pub fn new(cfg: GatewayConfig, broker: Broker) -> Self {
        let handshake = HandshakeDefender::new(cfg.handshake.clone());
        Self {
            inner: Arc::new(AppStateInner { cfg, handshake }),
            broker,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn handshake(&self) -> &HandshakeDefender {
        &self.inner.handshake
    }
}
