// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration loaded from environment variables.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::VisionConfig;

/// Default upload limit in MB.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

/// Runtime configuration of the command line shell.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Directory preview crops are written to.
    pub output_dir: PathBuf,
    /// Optional JSON file holding a [`VisionConfig`].
    pub vision_config_path: Option<PathBuf>,
    /// Maximum image file size in MB.
    pub max_file_size_mb: u64,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("PLANSCAN_LOG")
                .unwrap_or_else(|_| "info,planscan_vision=debug".into()),
            output_dir: std::env::var("PLANSCAN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./previews")),
            vision_config_path: std::env::var("PLANSCAN_CONFIG")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_file_size_mb: std::env::var("PLANSCAN_MAX_FILE_SIZE_MB")
                .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB),
        }
    }

    /// Analysis parameters, from the configured file or the defaults.
    pub fn load_vision_config(&self) -> Result<VisionConfig> {
        match &self.vision_config_path {
            Some(path) => load_vision_config(path),
            None => Ok(VisionConfig::default()),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Read a [`VisionConfig`] from a JSON file. Missing fields take their defaults.
pub fn load_vision_config(path: &Path) -> Result<VisionConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: VisionConfig = serde_json::from_str(&text)?;
    tracing::debug!(path = %path.display(), "loaded vision config");
    Ok(config)
}
