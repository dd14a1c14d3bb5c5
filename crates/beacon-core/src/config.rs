//! Configuration system for beacon.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $BEACON_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/beacon/config.toml
//!   3. ~/.config/beacon/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::frame;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub identity: IdentityConfig,
    pub network: NetworkConfig,
    pub discovery: DiscoveryConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Display name announced in heartbeats. Empty = prompt at startup.
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port for stream messages and file transfers.
    pub stream_port: u16,
    /// UDP port for datagram messages and file chunks.
    pub datagram_port: u16,
    /// UDP port for discovery heartbeats.
    pub discovery_port: u16,
    /// Address heartbeats are broadcast to.
    pub broadcast_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Seconds between heartbeat broadcasts.
    pub interval_secs: u64,
    /// Seconds of silence before a peer is considered gone.
    pub peer_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory received files are written to. Created on startup.
    pub storage_path: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            network: NetworkConfig::default(),
            discovery: DiscoveryConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            stream_port: frame::DEFAULT_STREAM_PORT,
            datagram_port: frame::DEFAULT_DATAGRAM_PORT,
            discovery_port: frame::DEFAULT_DISCOVERY_PORT,
            broadcast_addr: frame::BROADCAST_ADDR.to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: frame::HEARTBEAT_INTERVAL_SECS,
            peer_timeout_secs: frame::PEER_TIMEOUT_SECS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_path: data_dir().join("uploads"),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("beacon")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("beacon")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BeaconConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            BeaconConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BEACON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&BeaconConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply BEACON_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BEACON_IDENTITY__USERNAME") {
            self.identity.username = v;
        }
        if let Ok(v) = std::env::var("BEACON_NETWORK__STREAM_PORT") {
            if let Ok(p) = v.parse() {
                self.network.stream_port = p;
            }
        }
        if let Ok(v) = std::env::var("BEACON_NETWORK__DATAGRAM_PORT") {
            if let Ok(p) = v.parse() {
                self.network.datagram_port = p;
            }
        }
        if let Ok(v) = std::env::var("BEACON_NETWORK__DISCOVERY_PORT") {
            if let Ok(p) = v.parse() {
                self.network.discovery_port = p;
            }
        }
        if let Ok(v) = std::env::var("BEACON_NETWORK__BROADCAST_ADDR") {
            self.network.broadcast_addr = v;
        }
        if let Ok(v) = std::env::var("BEACON_DISCOVERY__INTERVAL_SECS") {
            if let Ok(s) = v.parse() {
                self.discovery.interval_secs = s;
            }
        }
        if let Ok(v) = std::env::var("BEACON_DISCOVERY__PEER_TIMEOUT_SECS") {
            if let Ok(s) = v.parse() {
                self.discovery.peer_timeout_secs = s;
            }
        }
        if let Ok(v) = std::env::var("BEACON_STORAGE__STORAGE_PATH") {
            self.storage.storage_path = PathBuf::from(v);
        }
    }
}
