//! Configuration file support
//!
//! Settings are read from TOML, looked up in this order:
//!
//! 1. `--config <path>` on the command line
//! 2. `<working-dir>/page-cleaner.toml`
//! 3. `<user config dir>/page-cleaner/config.toml`
//!
//! Values given explicitly on the command line ([`CliOverrides`]) win over
//! the file.
//!
//! ```toml
//! jpeg_quality = 85
//! threads = 4
//! add_page_numbers = true
//! detector = "classifier"
//! trained_width = 40
//! trained_height = 20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detect::{
    ClassifierOptions, DetectorKind, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR,
    DEFAULT_TRAINED_SIZE,
};
use crate::inpaint::DEFAULT_INPAINT_RADIUS;
use crate::pipeline::{PipelineOptions, DEFAULT_JPEG_QUALITY};
use crate::workdir::LOCAL_CONFIG_FILENAME;

/// Directory under the user config dir
pub const USER_CONFIG_DIRECTORY: &str = "page-cleaner";

/// Filename inside [`USER_CONFIG_DIRECTORY`]
pub const USER_CONFIG_FILENAME: &str = "config.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// File configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JPEG quality of written pages (1-100)
    pub jpeg_quality: u8,
    /// Worker threads; all CPUs when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Stamp page numbers onto written pages
    pub add_page_numbers: bool,
    /// Detection strategy
    pub detector: DetectorKind,
    /// Object width the cascade was trained with
    pub trained_width: u32,
    /// Object height the cascade was trained with
    pub trained_height: u32,
    pub scale_factor: f64,
    pub min_neighbors: usize,
    pub inpaint_radius: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            threads: None,
            add_page_numbers: false,
            detector: DetectorKind::default(),
            trained_width: DEFAULT_TRAINED_SIZE,
            trained_height: DEFAULT_TRAINED_SIZE,
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            inpaint_radius: DEFAULT_INPAINT_RADIUS,
        }
    }
}

impl Config {
    /// Load from the user config directory, or defaults when absent
    pub fn load() -> Result<Self> {
        match Self::user_config_path() {
            Some(path) if path.is_file() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Resolve the config for a working directory.
    ///
    /// An explicit path must exist; otherwise the working directory's
    /// `page-cleaner.toml` is used if present, then the user config.
    pub fn load_for(workdir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        let local = workdir.join(LOCAL_CONFIG_FILENAME);
        if local.is_file() {
            return Self::load_from_path(&local);
        }
        Self::load()
    }

    /// `<user config dir>/page-cleaner/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIRECTORY).join(USER_CONFIG_FILENAME))
    }

    fn from_toml(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Combine with command-line values; the command line wins
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> PipelineConfig {
        let mut options = PipelineOptions::builder()
            .jpeg_quality(cli.jpeg_quality.unwrap_or(self.jpeg_quality))
            .inpaint_radius(cli.inpaint_radius.unwrap_or(self.inpaint_radius));
        if let Some(threads) = cli.threads.or(self.threads) {
            options = options.threads(threads);
        }

        let classifier = ClassifierOptions::builder()
            .trained_size(
                cli.trained_width.unwrap_or(self.trained_width),
                cli.trained_height.unwrap_or(self.trained_height),
            )
            .scale_factor(cli.scale_factor.unwrap_or(self.scale_factor))
            .min_neighbors(cli.min_neighbors.unwrap_or(self.min_neighbors))
            .build();

        PipelineConfig {
            options: options.build(),
            detector: cli.detector.unwrap_or(self.detector),
            classifier,
            add_page_numbers: cli.add_page_numbers.unwrap_or(self.add_page_numbers),
        }
    }
}

/// Values set explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub jpeg_quality: Option<u8>,
    pub threads: Option<usize>,
    pub add_page_numbers: Option<bool>,
    pub detector: Option<DetectorKind>,
    pub trained_width: Option<u32>,
    pub trained_height: Option<u32>,
    pub scale_factor: Option<f64>,
    pub min_neighbors: Option<usize>,
    pub inpaint_radius: Option<f64>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub options: PipelineOptions,
    pub detector: DetectorKind,
    pub classifier: ClassifierOptions,
    pub add_page_numbers: bool,
}
