//! Swarm configuration file handling
//!
//! Loads and manages the ~/.config/botswarm/config.yaml file.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reconnect delay range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Lower bound of the reconnect delay (inclusive)
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the reconnect delay (exclusive)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_min_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    3000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Options handed to the connector untouched
///
/// The swarm core never interprets these; they describe how the transport
/// should talk to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolOptions {
    /// Protocol version string
    #[serde(default = "default_protocol_version")]
    pub version: String,

    /// Authentication mode
    #[serde(default = "default_auth")]
    pub auth: String,

    /// Keep-alive check interval in seconds
    #[serde(default = "default_check_timeout_interval")]
    pub check_timeout_interval_secs: u64,

    /// Transport-level connect timeout in seconds
    #[serde(default = "default_transport_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Do not sign chat messages
    #[serde(default = "default_true")]
    pub disable_chat_signing: bool,

    /// Skip server-side validation steps
    #[serde(default = "default_true")]
    pub skip_validation: bool,
}

fn default_protocol_version() -> String {
    "1.8.9".to_string()
}

fn default_auth() -> String {
    "offline".to_string()
}

fn default_check_timeout_interval() -> u64 {
    5
}

fn default_transport_connect_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
            auth: default_auth(),
            check_timeout_interval_secs: default_check_timeout_interval(),
            connect_timeout_secs: default_transport_connect_timeout(),
            disable_chat_signing: true,
            skip_validation: true,
        }
    }
}

/// Swarm configuration
///
/// Represents the complete ~/.config/botswarm/config.yaml file. Every field
/// has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Maximum connect attempts in flight during ramp-up
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-attempt connect deadline in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Delay between becoming active and running the one-shot action
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Port used when the server address has none
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Reconnect delay range
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Run a random action on every active session at this interval
    #[serde(default)]
    pub action_interval_ms: Option<u64>,

    /// Re-send the one-shot action after every successful reconnect
    #[serde(default)]
    pub one_shot_on_reconnect: bool,

    /// Options passed through to the transport
    #[serde(default)]
    pub protocol: ProtocolOptions,
}

fn default_concurrency() -> usize {
    50
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_port() -> u16 {
    25565
}

impl SwarmConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self {
            concurrency: default_concurrency(),
            connect_timeout_ms: default_connect_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            default_port: default_port(),
            reconnect: ReconnectConfig::default(),
            action_interval_ms: None,
            one_shot_on_reconnect: false,
            protocol: ProtocolOptions::default(),
        }
    }

    /// Load from the default path, or fall back to defaults if no file exists
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::new())
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::SwarmError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading swarm configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = if content.trim().is_empty() {
            Self::new()
        } else {
            serde_yaml::from_str(&content)?
        };

        tracing::debug!(
            concurrency = config.concurrency,
            connect_timeout_ms = config.connect_timeout_ms,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving swarm configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/botswarm/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("botswarm");
        path.push("config.yaml");
        path
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn action_interval(&self) -> Option<Duration> {
        self.action_interval_ms.map(Duration::from_millis)
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self::new()
    }
}
