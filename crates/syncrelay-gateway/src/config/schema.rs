use serde::Deserialize;
use syncrelay_core::error::{Result, SyncRelayError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub handshake: HandshakeConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            dispatch: DispatchSection::default(),
            limits: LimitsSection::default(),
            handshake: HandshakeConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SyncRelayError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.dispatch.validate()?;
        self.limits.validate()?;
        self.handshake.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Per-client outbound frame queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(SyncRelayError::BadRequest(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_outbound_queue() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    /// Number of dispatch workers; a channel always maps to the same one.
    #[serde(default = "default_shards")]
    pub shards: usize,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            shards: default_shards(),
        }
    }
}

impl DispatchSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.shards) {
            return Err(SyncRelayError::BadRequest(
                "dispatch.shards must be between 1 and 64".into(),
            ));
        }
        Ok(())
    }
}

fn default_shards() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_max_channel_name_len")]
    pub max_channel_name_len: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
            max_channel_name_len: default_max_channel_name_len(),
        }
    }
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1024..=16 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(SyncRelayError::BadRequest(
                "limits.max_frame_bytes must be between 1024 and 16777216".into(),
            ));
        }
        if !(1..=1024).contains(&self.max_channel_name_len) {
            return Err(SyncRelayError::BadRequest(
                "limits.max_channel_name_len must be between 1 and 1024".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_frame_bytes() -> usize {
    65536
}
fn default_max_channel_name_len() -> usize {
    128
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandshakeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_global_rps")]
    pub global_rps: u32,
    #[serde(default = "default_global_burst")]
    pub global_burst: u32,

    #[serde(default = "default_per_ip_rps")]
    pub per_ip_rps: u32,
    #[serde(default = "default_per_ip_burst")]
    pub per_ip_burst: u32,

    #[serde(default = "default_max_ip_entries")]
    pub max_ip_entries: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            global_rps: default_global_rps(),
            global_burst: default_global_burst(),
            per_ip_rps: default_per_ip_rps(),
            per_ip_burst: default_per_ip_burst(),
            max_ip_entries: default_max_ip_entries(),
        }
    }
}

impl HandshakeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.global_rps == 0 || self.per_ip_rps == 0 {
            return Err(SyncRelayError::BadRequest(
                "handshake rps values must be positive".into(),
            ));
        }
        if self.global_burst == 0 || self.per_ip_burst == 0 {
            return Err(SyncRelayError::BadRequest(
                "handshake burst values must be positive".into(),
            ));
        }
        if self.max_ip_entries == 0 {
            return Err(SyncRelayError::BadRequest(
                "handshake.max_ip_entries must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_global_rps() -> u32 {
    1000
}
fn default_global_burst() -> u32 {
    2000
}
fn default_per_ip_rps() -> u32 {
    2
}
fn default_per_ip_burst() -> u32 {
    100
}
fn default_max_ip_entries() -> usize {
    100_000
}
