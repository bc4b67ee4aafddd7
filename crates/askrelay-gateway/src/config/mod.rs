//! Relay config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use askrelay_core::error::{RelayError, Result};

pub use schema::{GatewaySection, RelayConfig, RelaySection};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "ASKRELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "askrelay.yaml";

pub fn load_from_file(path: &str) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RelayError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Like `load_from_file`, but a missing file yields the defaults.
pub fn load_or_default(path: &str) -> Result<RelayConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path, "config file not found; using defaults");
            Ok(RelayConfig::default())
        }
        Err(e) => Err(RelayError::Internal(format!("read config failed: {e}"))),
    }
}
