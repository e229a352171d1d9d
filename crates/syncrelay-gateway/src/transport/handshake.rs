//! Handshake Defender (pre-upgrade DoS guard).
//!
//! - Per-IP + global leaky-bucket limiter, checked before the WebSocket upgrade.
//! - Rejections become HTTP 429 with a `Retry-After` hint.
//! - The per-IP map is trimmed inline once it exceeds `max_ip_entries`:
//!   buckets that have refilled completely belong to idle peers and go first.

use std::net::IpAddr;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex;

use syncrelay_core::error::{Result, SyncRelayError};

use crate::config::HandshakeConfig;

/// Simple leaky bucket (capacity/refill, best-effort).
#[derive(Debug)]
pub struct LeakyBucket {
    capacity: u32,
    tokens: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl LeakyBucket {
    pub fn new(capacity: u32, refill_per_sec: u32) -> Self {
        let cap = capacity.max(1);
        Self {
            capacity: cap,
            tokens: cap as f64,
            refill_per_sec: refill_per_sec.max(1) as f64,
            last: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity as f64);
    }

    fn is_full(&mut self) -> bool {
        self.refill();
        self.tokens >= self.capacity as f64
    }

    /// Consume `cost` tokens. Returns Err with retry-after seconds (ceil, min 1).
    pub fn try_take(&mut self, cost: u32) -> std::result::Result<(), u64> {
        self.refill();
        let c = cost.max(1) as f64;
        if self.tokens >= c {
            self.tokens -= c;
            Ok(())
        } else {
            let missing = c - self.tokens;
            let wait = (missing / self.refill_per_sec).ceil();
            Err(wait.max(1.0) as u64)
        }
    }
}

#[derive(Debug)]
pub struct HandshakeDefender {
    cfg: HandshakeConfig,
    global: Mutex<LeakyBucket>,
    per_ip: DashMap<IpAddr, Mutex<LeakyBucket>>,
}

impl HandshakeDefender {
    pub fn new(cfg: HandshakeConfig) -> Self {
        Self {
            global: Mutex::new(LeakyBucket::new(cfg.global_burst, cfg.global_rps)),
            per_ip: DashMap::new(),
            cfg,
        }
    }

    pub fn tracked_ips(&self) -> usize {
        self.per_ip.len()
    }

    /// Check handshake allowance for `ip`.
    pub async fn check(&self, ip: IpAddr) -> Result<()> {
        if !self.cfg.enabled {
            return Ok(());
        }

        self.global
            .lock()
            .await
            .try_take(1)
            .map_err(|retry_after_secs| SyncRelayError::RateLimited { retry_after_secs })?;

        {
            let entry = self.per_ip.entry(ip).or_insert_with(|| {
                Mutex::new(LeakyBucket::new(self.cfg.per_ip_burst, self.cfg.per_ip_rps))
            });
            let mut bucket = entry.value().lock().await;
            bucket
                .try_take(1)
                .map_err(|retry_after_secs| SyncRelayError::RateLimited { retry_after_secs })?;
        }

        if self.per_ip.len() > self.cfg.max_ip_entries {
            self.trim();
        }

        Ok(())
    }

    fn trim(&self) {
        let before = self.per_ip.len();
        self.per_ip.retain(|_, b| !b.get_mut().is_full());
        tracing::warn!(before, after = self.per_ip.len(), "handshake defender ip map trimmed");
    }
}
