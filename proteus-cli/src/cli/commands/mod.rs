pub mod config;
pub mod run;

use anyhow::{Context, Result};
use proteus_core::{load_config, PipelineConfig};
use std::path::Path;

/// Configuration from `path`, or the defaults when no file is given
pub fn effective_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            load_config(path).with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}
