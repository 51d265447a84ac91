// Configuration for the tasktrack CLI, loaded from .tasktrack.yml or ~/.config/tasktrack/tasktrack.yml

use crate::kv::{FileKv, KeyValueStore, SqliteKv};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Project-local config file name
pub const PROJECT_CONFIG: &str = ".tasktrack.yml";

/// SQLite database file name inside the data directory
pub const DB_FILE: &str = "tasktrack.db";

/// Which key-value backend holds the collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per collection
    #[default]
    File,
    /// A single SQLite database
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,

    /// Where collections are stored; defaults to the platform data directory
    #[serde(rename = "data-dir")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .tasktrack.yml in current directory
    /// 3. ~/.config/tasktrack/tasktrack.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(PROJECT_CONFIG);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    info!("Loaded config from {}", PROJECT_CONFIG);
                    return Ok(config);
                }
                Err(e) => warn!("Failed to load {}: {}", PROJECT_CONFIG, e),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tasktrack").join("tasktrack.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => warn!("Failed to load {}: {}", user_config.display(), e),
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tasktrack")
        })
    }

    /// Open the configured backend
    pub fn open_backend(&self) -> Result<Box<dyn KeyValueStore>> {
        let data_dir = self.data_dir();
        info!(backend = ?self.backend, path = %data_dir.display(), "Opening backend");

        let kv: Box<dyn KeyValueStore> = match self.backend {
            Backend::File => Box::new(FileKv::open(&data_dir)?),
            Backend::Sqlite => Box::new(SqliteKv::open(data_dir.join(DB_FILE))?),
        };
        Ok(kv)
    }
}
