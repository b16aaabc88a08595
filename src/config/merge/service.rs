//! MergeService: orchestrates sources and deserializes to SwitchboardConfig.

use crate::config::sources::{environment, file};
use crate::config::SwitchboardConfig;
use crate::error::ApiError;
use config::Config;
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from defaults and environment.
    pub fn load() -> Result<SwitchboardConfig, ApiError> {
        let builder = environment::add_to_builder(Config::builder())?;
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load config from a specific file with environment overlay.
    /// Precedence: defaults (lowest) -> file -> environment (highest).
    pub fn load_from_file(path: &Path) -> Result<SwitchboardConfig, ApiError> {
        let builder = file::add_to_builder(Config::builder(), path)?;
        let builder = environment::add_to_builder(builder)?;
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
