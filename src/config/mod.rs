use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::geometry::PrecisionOptimizer;
use crate::ops::PipelineConfig;

/// How results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One WKT polygon per line
    #[default]
    Wkt,
    /// The full report as JSON
    Json,
}

fn default_precision_digits() -> u32 {
    12
}
fn default_tolerance() -> f64 {
    1e-12
}
fn default_optimize_precision() -> bool {
    true
}
fn default_verbose() -> bool {
    false
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(default = "default_precision_digits")]
    pub precision_digits: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_optimize_precision")]
    pub optimize_precision: bool,
    #[serde(default)]
    pub deoverlap: bool,
    #[serde(default)]
    pub force_merge: bool,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            precision_digits: default_precision_digits(),
            tolerance: default_tolerance(),
            optimize_precision: default_optimize_precision(),
            deoverlap: false,
            force_merge: false,
            verbose: default_verbose(),
            format: OutputFormat::default(),
        }
    }
}

impl FileConfig {
    /// First config file on the search path that parses
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => {
                        debug!(path = %path.display(), "loaded config");
                        return Some(config);
                    }
                    Err(e) => {
                        warn!("failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Load a file the user named; unlike [`FileConfig::load`], a missing or
    /// broken file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            precision: self
                .optimize_precision
                .then(|| PrecisionOptimizer::new(self.precision_digits, self.tolerance)),
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("polymerge.toml"));
    paths.push(PathBuf::from(".polymerge.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("polymerge").join("config.toml"));
        paths.push(config_dir.join("polymerge.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".polymerge.toml"));
        paths.push(home.join(".config").join("polymerge").join("config.toml"));
    }

    paths
}
