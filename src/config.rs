use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::constants::{DEFAULT_HISTORY_DAYS, DEFAULT_HISTORY_SIZE, PAGE_SIZE};
use crate::timeline::{EntityId, TimelineCategory};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Limits applied by `prune`
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Records added to the window per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_category")]
    pub default_category: TimelineCategory,
    /// Show all accounts at once
    #[serde(default)]
    pub combined: bool,
    /// Acting account (None = first account)
    #[serde(default)]
    pub account: Option<EntityId>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_category: default_category(),
            combined: false,
            account: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Days of records kept (0 = unlimited)
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    /// Records kept (0 = unlimited)
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_days: default_max_days(),
            max_size: default_max_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path override
    #[serde(default)]
    pub database: Option<PathBuf>,
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

fn default_category() -> TimelineCategory {
    TimelineCategory::Home
}

fn default_max_days() -> u32 {
    DEFAULT_HISTORY_DAYS
}

fn default_max_size() -> u32 {
    DEFAULT_HISTORY_SIZE
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("tlview");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .context("Could not find data directory")?
            .join("tlview");
        Ok(dir)
    }

    /// Database location, honoring the override.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("timeline.db")),
        }
    }

    /// Load the config file; a missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.timeline.page_size == 0 {
            config.timeline.page_size = default_page_size();
        }
        if config.timeline.default_category.is_unknown() {
            config.timeline.default_category = default_category();
        }
        Ok(config)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        let db_path = self.database_path()?;
        if let Some(dir) = db_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
