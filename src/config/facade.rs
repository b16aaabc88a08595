//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SwitchboardConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults, an optional file, and environment.
    pub fn load(path: Option<&Path>) -> Result<SwitchboardConfig, ApiError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ApiError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                MergeService::load_from_file(path)
            }
            None => MergeService::load(),
        }
    }

    /// Create default configuration.
    pub fn default() -> SwitchboardConfig {
        SwitchboardConfig::default()
    }
}
