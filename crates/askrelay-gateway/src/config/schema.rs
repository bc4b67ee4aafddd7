use std::time::Duration;

use askrelay_core::error::{RelayError, Result};
use serde::Deserialize;

use crate::realtime::RouterSettings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub relay: RelaySection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            relay: RelaySection::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.relay.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_read_deadline_ms")]
    pub read_deadline_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            read_deadline_ms: default_read_deadline_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadRequest(
                "gateway.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if self.read_deadline_ms > 600000 {
            return Err(RelayError::BadRequest(
                "gateway.read_deadline_ms must be at most 600000".into(),
            ));
        }
        if self.read_deadline_ms <= self.ping_interval_ms {
            return Err(RelayError::BadRequest(
                "gateway.read_deadline_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=60000).contains(&self.write_timeout_ms) {
            return Err(RelayError::BadRequest(
                "gateway.write_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(RelayError::BadRequest(
                "gateway.max_frame_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:2000".into()
}
fn default_ping_interval_ms() -> u64 {
    54000
}
fn default_read_deadline_ms() -> u64 {
    60000
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_max_frame_bytes() -> usize {
    4 * 1024 * 1024
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_peer_queue_capacity")]
    pub peer_queue_capacity: usize,

    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    #[serde(default)]
    pub legacy_global_broadcast: bool,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            peer_queue_capacity: default_peer_queue_capacity(),
            default_timeout_secs: default_timeout_secs(),
            legacy_global_broadcast: false,
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1024).contains(&self.peer_queue_capacity) {
            return Err(RelayError::BadRequest(
                "relay.peer_queue_capacity must be between 1 and 1024".into(),
            ));
        }
        if !(1..=86400).contains(&self.default_timeout_secs) {
            return Err(RelayError::BadRequest(
                "relay.default_timeout_secs must be between 1 and 86400".into(),
            ));
        }
        Ok(())
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            default_timeout: Duration::from_secs(self.default_timeout_secs),
            legacy_global_broadcast: self.legacy_global_broadcast,
        }
    }
}

fn default_peer_queue_capacity() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    3600
}
