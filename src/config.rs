//! Process settings parsed from environment variables, plus the optional
//! JSON overlay for a prop's puzzle parameters.
//!
//! Every prop binary reads the same variables:
//! - `PORT`: HTTP/WebSocket listen port (per-prop default)
//! - `PROP_ID`: identity reported to the Room Controller (per-prop default)
//! - `ROOM_CONTROLLER_URL`: bridge target; bridge disabled when absent
//! - `PUBLIC_DIR`: static asset directory (default `public`)
//! - `PROP_CONFIG`: JSON file overriding puzzle parameters
//! - `ROOM_UPDATE_INTERVAL_SECS`: periodic state resync (default 30)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;

pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_ROOM_UPDATE_INTERVAL_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid prop config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// Compiled-in identity of a prop binary.
#[derive(Debug, Clone, Copy)]
pub struct PropDefaults {
    pub prop_id: &'static str,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropSettings {
    pub prop_id: String,
    pub port: u16,
    pub room_controller_url: Option<String>,
    pub public_dir: PathBuf,
    pub prop_config: Option<PathBuf>,
    pub room_update_interval: Duration,
}

impl PropSettings {
    #[must_use]
    pub fn from_env(defaults: PropDefaults) -> Self {
        Self::from_lookup(defaults, |key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(defaults: PropDefaults, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let interval_secs = parse_or(non_empty("ROOM_UPDATE_INTERVAL_SECS"), DEFAULT_ROOM_UPDATE_INTERVAL_SECS).max(1);

        Self {
            prop_id: non_empty("PROP_ID").unwrap_or_else(|| defaults.prop_id.to_string()),
            port: parse_or(non_empty("PORT"), defaults.port),
            room_controller_url: non_empty("ROOM_CONTROLLER_URL"),
            public_dir: non_empty("PUBLIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR), PathBuf::from),
            prop_config: non_empty("PROP_CONFIG").map(PathBuf::from),
            room_update_interval: Duration::from_secs(interval_secs),
        }
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

/// Load puzzle parameters. Without a path the compiled defaults apply;
/// with one, fields present in the file override the defaults.
pub fn load_prop_config<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    parse_prop_config(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

pub fn parse_prop_config<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
