//! TOML file configuration structures.
//!
//! These structs directly map to the `posbridge.toml` file format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Settlement gateway section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Root URL of the gateway (e.g., "http://127.0.0.1:5000").
    pub base_url: Url,
    /// Whole-request timeout. The transport default applies when absent.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Dwell delays and the host reply deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_decline_delay_ms")]
    pub decline_delay_ms: u64,
    #[serde(default = "default_exit_delay_ms")]
    pub exit_delay_ms: u64,
    /// Seconds to wait for the host's DATA reply; 0 waits indefinitely.
    #[serde(default = "default_host_reply_timeout_secs")]
    pub host_reply_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            decline_delay_ms: default_decline_delay_ms(),
            exit_delay_ms: default_exit_delay_ms(),
            host_reply_timeout_secs: default_host_reply_timeout_secs(),
        }
    }
}

fn default_decline_delay_ms() -> u64 {
    4000
}

fn default_exit_delay_ms() -> u64 {
    4000
}

fn default_host_reply_timeout_secs() -> u64 {
    120
}

/// The simulated embedding page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Target origin used when the launch parameters carry none.
    #[serde(default)]
    pub default_origin: Option<String>,
    #[serde(default = "default_embedded")]
    pub embedded: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            default_origin: None,
            embedded: default_embedded(),
        }
    }
}

fn default_embedded() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Directory holding the status fragment templates.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}
