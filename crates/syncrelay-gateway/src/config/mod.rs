//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;

use syncrelay_core::error::{Result, SyncRelayError};

pub use schema::{
    DispatchSection, GatewayConfig, GatewaySection, HandshakeConfig, LimitsSection,
};

/// Env var naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "SYNCRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "syncrelay.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SyncRelayError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| SyncRelayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the gateway config.
///
/// An explicit `$SYNCRELAY_CONFIG` must name a readable, valid file. Without
/// it `syncrelay.yaml` is tried, and a missing default file means defaults.
pub fn load() -> Result<GatewayConfig> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        tracing::info!(%path, "loading config");
        return load_from_file(&path);
    }
    match fs::read_to_string(DEFAULT_CONFIG_PATH) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = DEFAULT_CONFIG_PATH, "config file not found, using defaults");
            Ok(GatewayConfig::default())
        }
        Err(e) => Err(SyncRelayError::Internal(format!("read config failed: {e}"))),
    }
}

/// Resolve the listen address, letting `PORT` override the configured port.
pub fn listen_addr(cfg: &GatewayConfig, port_env: Option<&str>) -> Result<SocketAddr> {
    let mut addr: SocketAddr = cfg.gateway.listen.parse().map_err(|_| {
        SyncRelayError::BadRequest(format!("gateway.listen is not a socket address: {}", cfg.gateway.listen))
    })?;
    if let Some(p) = port_env {
        let port: u16 = p
            .trim()
            .parse()
            .map_err(|_| SyncRelayError::BadRequest(format!("PORT is not a valid port: {p}")))?;
        addr.set_port(port);
    }
    Ok(addr)
}
