//! Configuration loading and parsing.
//!
//! `aeroshape.toml` carries the locations and minimum versions of the
//! external executables plus default polar parameters. Unknown fields are
//! ignored (TOML deserialization tolerance) to allow forward evolution.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file name searched in the working dir and the user config dir.
pub const CONFIG_FILE_NAME: &str = "aeroshape.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutablesConfig {
    /// Path of the polar worker executable.
    pub worker: Option<PathBuf>,
    /// Path of the optimizer executable.
    pub optimizer: Option<PathBuf>,
    /// Minimum worker version accepted.
    pub worker_min_version: String,
    /// Minimum optimizer version accepted.
    pub optimizer_min_version: String,
}

impl Default for ExecutablesConfig {
    fn default() -> Self {
        Self {
            worker: None,
            optimizer: None,
            worker_min_version: "1.0".to_string(),
            optimizer_min_version: "1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PolarDefaults {
    pub re: f64,
    pub ncrit: f64,
    /// Coordinate point limit handed to the worker for speed.
    pub n_points: Option<usize>,
}

impl Default for PolarDefaults {
    fn default() -> Self {
        Self {
            re: 400_000.0,
            ncrit: 7.0,
            n_points: Some(160),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub executables: ExecutablesConfig,
    pub polar: PolarDefaults,
}

/// Parsed configuration plus its origin.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(Self {
            file,
            source: Some(path.to_path_buf()),
        })
    }

    /// Discover the config: explicit override, working dir, then the user
    /// config dir; defaults when nothing is found.
    pub fn discover(override_path: Option<&Path>, working_dir: &Path) -> Self {
        let candidates: Vec<PathBuf> = [
            override_path.map(|p| p.to_path_buf()),
            Some(working_dir.join(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|d| d.join("aeroshape").join(CONFIG_FILE_NAME)),
        ]
        .into_iter()
        .flatten()
        .collect();

        for candidate in candidates {
            if candidate.is_file() {
                match Self::load(&candidate) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %candidate.display(), error = %e, "config unreadable, ignored");
                    }
                }
            }
        }
        Self::default()
    }
}
