//! Configuration
//!
//! Layered configuration built with the `config` crate. Precedence (lowest to highest):
//! built-in defaults, optional TOML file, `SWITCHBOARD__*` environment variables.

mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::types::ANALYSIS_COMPLETED;
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Protocol transport selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Line-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// Line-delimited JSON-RPC over TCP connections
    Tcp,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "tcp" => Ok(TransportKind::Tcp),
            other => Err(format!(
                "Invalid transport: {} (must be 'stdio' or 'tcp')",
                other
            )),
        }
    }
}

/// Transport binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7410
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-platform credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub twitter: TwitterConfig,
}

/// Twitter API v2 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// Bearer token; falls back to `TWITTER_BEARER_TOKEN` when unset
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com/2".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: default_twitter_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TwitterConfig {
    /// Configured token, or the `TWITTER_BEARER_TOKEN` environment variable
    pub fn resolved_bearer_token(&self) -> Option<String> {
        self.bearer_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                std::env::var("TWITTER_BEARER_TOKEN")
                    .ok()
                    .filter(|t| !t.trim().is_empty())
            })
    }
}

/// Content-analysis agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum number of stored analysis results
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Maximum number of pending background analyses
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_history_limit() -> usize {
    1000
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Event names relayed to every other running agent
    #[serde(default = "default_relay_events")]
    pub relay_events: Vec<String>,
}

fn default_relay_events() -> Vec<String> {
    vec![ANALYSIS_COMPLETED.to_string()]
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            relay_events: default_relay_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SwitchboardConfig::default();
        assert_eq!(config.server.transport, TransportKind::Stdio);
        assert_eq!(config.server.bind_addr(), "127.0.0.1:7410");
        assert_eq!(config.analysis.history_limit, 1000);
        assert_eq!(config.orchestrator.relay_events, vec!["analysis-completed"]);
        assert_eq!(config.logging.output, crate::logging::LogSink::Stderr);
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("stdio".parse::<TransportKind>(), Ok(TransportKind::Stdio));
        assert_eq!("TCP".parse::<TransportKind>(), Ok(TransportKind::Tcp));
        assert!("sse".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_configured_token_wins() {
        let twitter = TwitterConfig {
            bearer_token: Some("abc".to_string()),
            ..TwitterConfig::default()
        };
        assert_eq!(twitter.resolved_bearer_token().as_deref(), Some("abc"));
    }
}
