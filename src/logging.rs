//! Logging
//!
//! `tracing` subscriber setup for the server and CLI. Logs go to stderr unless
//! configured otherwise, since stdout carries JSON-RPC frames under the stdio
//! transport.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILTER_ENV: &str = "SWITCHBOARD_LOG";
const LOG_FORMAT_ENV: &str = "SWITCHBOARD_LOG_FORMAT";
const LOG_OUTPUT_ENV: &str = "SWITCHBOARD_LOG_OUTPUT";
const LOG_FILE_ENV: &str = "SWITCHBOARD_LOG_FILE";

/// Line format of emitted events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// Where events are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSink {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    /// Log file, mirrored to stderr
    #[serde(rename = "file+stderr")]
    FileAndStderr,
}

impl LogSink {
    fn uses_file(self) -> bool {
        matches!(self, LogSink::File | LogSink::FileAndStderr)
    }
}

impl FromStr for LogSink {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(LogSink::Stdout),
            "stderr" => Ok(LogSink::Stderr),
            "file" => Ok(LogSink::File),
            "file+stderr" => Ok(LogSink::FileAndStderr),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log output '{}' (expected stdout, stderr, file or file+stderr)",
                other
            ))),
        }
    }
}

impl fmt::Display for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogSink::Stdout => "stdout",
            LogSink::Stderr => "stderr",
            LogSink::File => "file",
            LogSink::FileAndStderr => "file+stderr",
        })
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level or filter directive: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogSink,

    /// Log file for the file sinks; the platform state dir is used when unset
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Per-target levels, e.g. `switchboard::transport = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogSink::default(),
            file: None,
            modules: HashMap::new(),
        }
    }
}

/// Resolve the log file path with precedence: CLI, SWITCHBOARD_LOG_FILE env, config file, default.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
) -> Result<PathBuf, ApiError> {
    let from_env = std::env::var(LOG_FILE_ENV).ok().map(PathBuf::from);
    match [cli_file, from_env, config_file]
        .into_iter()
        .flatten()
        .find(|p| !p.as_os_str().is_empty())
    {
        Some(path) => Ok(path),
        None => default_log_file_path(),
    }
}

fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let dirs = directories::ProjectDirs::from("", "switchboard", "switchboard").ok_or_else(|| {
        ApiError::ConfigError("Could not determine a state directory for the log file".to_string())
    })?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(dir.join("switchboard.log"))
}

/// Install the global subscriber.
///
/// `SWITCHBOARD_LOG`, `SWITCHBOARD_LOG_FORMAT` and `SWITCHBOARD_LOG_OUTPUT`
/// override the configuration; `cli_log_file` wins over every other log file
/// source. A second call keeps the subscriber already installed.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    cli_log_file: Option<PathBuf>,
) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = build_env_filter(config)?;
    let format = env_override(LOG_FORMAT_ENV)?.unwrap_or(config.format);
    let sink = env_override(LOG_OUTPUT_ENV)?.unwrap_or(config.output);

    let writer = match sink {
        LogSink::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogSink::File => BoxMakeWriter::new(open_log_file(cli_log_file, config)?),
        LogSink::FileAndStderr => {
            BoxMakeWriter::new(open_log_file(cli_log_file, config)?.and(std::io::stderr))
        }
    };
    let ansi = match sink {
        LogSink::Stdout => std::io::stdout().is_terminal(),
        LogSink::Stderr => std::io::stderr().is_terminal(),
        LogSink::File | LogSink::FileAndStderr => false,
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);
    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry.with(layer.json()).try_init(),
        LogFormat::Text => registry.with(layer.with_ansi(ansi)).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping existing one");
    } else if sink.uses_file() {
        tracing::debug!(output = %sink, "Logging to file");
    }

    Ok(())
}

/// Parsed value of an override variable; unset or empty means no override
fn env_override<T: FromStr<Err = ApiError>>(var: &str) -> Result<Option<T>, ApiError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

fn open_log_file(
    cli_log_file: Option<PathBuf>,
    config: &LoggingConfig,
) -> Result<std::fs::File, ApiError> {
    let path = resolve_log_file_path(cli_log_file, config.file.clone())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::ConfigError(format!("Failed to create log directory {:?}: {}", parent, e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

/// `SWITCHBOARD_LOG` when set, otherwise the configured level plus per-target levels
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    config
        .modules
        .iter()
        .try_fold(EnvFilter::new(&config.level), |filter, (target, level)| {
            let directive: Directive = format!("{}={}", target, level)
                .parse()
                .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?;
            Ok(filter.add_directive(directive))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.output, LogSink::Stderr);
        assert_eq!(config.file, None);
    }

    #[test]
    fn test_sink_names() {
        assert_eq!("stdout".parse::<LogSink>().unwrap(), LogSink::Stdout);
        assert_eq!(
            "file+stderr".parse::<LogSink>().unwrap(),
            LogSink::FileAndStderr
        );
        assert!(LogSink::FileAndStderr.uses_file());
        assert!(!LogSink::Stderr.uses_file());
        assert_eq!(LogSink::FileAndStderr.to_string(), "file+stderr");

        assert!(matches!(
            "syslog".parse::<LogSink>(),
            Err(ApiError::ConfigError(_))
        ));
        // stdout is the protocol channel, so no sink duplicates onto it
        assert!("both".parse::<LogSink>().is_err());
    }

    #[test]
    fn test_section_deserializes_sink_names() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{"format": "json", "output": "file+stderr"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogSink::FileAndStderr);
        assert_eq!(config.level, "info");

        assert!(serde_json::from_str::<LoggingConfig>(r#"{"output": "both"}"#).is_err());
        assert!(serde_json::from_str::<LoggingConfig>(r#"{"format": "xml"}"#).is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(ApiError::ConfigError(_))
        ));
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_module_levels_build_filter() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("switchboard::transport".to_string(), "debug".to_string());
        if std::env::var(LOG_FILTER_ENV).is_err() {
            assert!(build_env_filter(&config).is_ok());
            config
                .modules
                .insert("switchboard".to_string(), "loud".to_string());
            assert!(build_env_filter(&config).is_err());
        }
    }

    #[test]
    fn test_resolve_log_file_path_cli_wins() {
        let cli = Some(PathBuf::from("/tmp/cli.log"));
        let config = Some(PathBuf::from("/tmp/config.log"));
        let path = resolve_log_file_path(cli, config).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cli.log"));
    }

    #[test]
    fn test_resolve_log_file_path_default_fallback() {
        if std::env::var(LOG_FILE_ENV).is_ok() {
            return;
        }
        let path = resolve_log_file_path(None, Some(PathBuf::new())).unwrap();
        assert!(path.ends_with("switchboard.log"));
    }
}
