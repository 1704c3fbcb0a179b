//! Configuration management for Scenedex.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{Result, ScenedexError};
use crate::index::IndexOptions;
use crate::pipeline::IndexSettings;
use crate::search::SearchSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Smallest writer budget the engine accepts for a single indexing thread
const MIN_WRITER_MEMORY_MB: usize = 15;

/// Main configuration structure for Scenedex.
///
/// ## Example Configuration File (scenedex.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [index]
/// name = "scenes"
/// page_size = 100
/// writer_memory_mb = 50
///
/// [search]
/// max_results = 25
/// fuzzy_distance = 0
///
/// [catalog]
/// path = "/srv/catalog/scenes.json"
///
/// [advanced]
/// progress_interval_secs = 10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    /// Index location and write tuning
    pub index: IndexConfig,

    pub search: SearchConfig,

    /// Catalog source used by the command-line tool
    pub catalog: CatalogConfig,

    pub advanced: AdvancedConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error) used when neither
    /// `RUST_LOG` nor a verbosity flag is given
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding indexes (None = default data directory)
    pub dir: Option<PathBuf>,

    /// Name of the scene index inside `dir`
    pub name: String,

    /// Records fetched per page during a rebuild
    pub page_size: usize,

    /// Index writer memory budget in MB
    pub writer_memory_mb: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            dir: None,
            name: "scenes".to_string(),
            page_size: 100,
            writer_memory_mb: 50,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of scenes returned by a search
    pub max_results: usize,

    /// Edit distance for fuzzy title and cast matching (0 = exact only)
    pub fuzzy_distance: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_results: 25,
            fuzzy_distance: 0,
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON file holding an array of scene records
    pub path: Option<PathBuf>,
}

/// Advanced configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Seconds between progress log lines during batch updates
    pub progress_interval_secs: u64,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        AdvancedConfig {
            progress_interval_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| ScenedexError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| ScenedexError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the indexer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(ScenedexError::ConfigError {
                reason: reason.to_string(),
            })
        };

        if self.index.name.trim().is_empty() {
            return invalid("index.name must not be empty");
        }
        if self.index.page_size == 0 {
            return invalid("index.page_size must be at least 1");
        }
        if self.index.writer_memory_mb < MIN_WRITER_MEMORY_MB {
            return invalid("index.writer_memory_mb must be at least 15");
        }
        if self.search.fuzzy_distance > 2 {
            return invalid("search.fuzzy_distance must be 0, 1 or 2");
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "scenedex").ok_or_else(|| ScenedexError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("scenedex.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "scenedex").ok_or_else(|| ScenedexError::ConfigError {
            reason: "Could not determine data directory".to_string(),
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the index directory (from config or default).
    pub fn index_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.index.dir {
            Ok(dir.clone())
        } else {
            Self::default_data_dir()
        }
    }

    fn index_options(&self) -> IndexOptions {
        IndexOptions {
            writer_memory_bytes: self.index.writer_memory_mb.saturating_mul(1024 * 1024),
            fuzzy_distance: self.search.fuzzy_distance,
        }
    }

    /// Settings for the indexing pipeline.
    pub fn index_settings(&self) -> Result<IndexSettings> {
        Ok(IndexSettings::new(self.index_dir()?, &self.index.name)
            .with_page_size(self.index.page_size)
            .with_progress_interval(Duration::from_secs(self.advanced.progress_interval_secs))
            .with_options(self.index_options()))
    }

    /// Settings for the scene searcher.
    pub fn search_settings(&self) -> Result<SearchSettings> {
        Ok(SearchSettings::new(self.index_dir()?, &self.index.name)
            .with_max_results(self.search.max_results)
            .with_options(self.index_options()))
    }
}
