//! Settings loaded from `config.toml` with environment overrides.
//!
//! The store location never lives in source; it comes from the settings
//! file, from `IRISLAB_DB_PATH`, or defaults to a file in the app directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::app_dirs::{self, AppDirError};
use crate::dataset::loader::DataSource;
use crate::ml::SelectorOptions;
use crate::store::{DB_FILE_NAME, DEFAULT_COLLECTION, StoreConfig};

pub const DB_PATH_ENV: &str = "IRISLAB_DB_PATH";
pub const COLLECTION_ENV: &str = "IRISLAB_COLLECTION";
pub const DATA_SOURCE_ENV: &str = "IRISLAB_DATA_SOURCE";

/// File name of the saved best model inside the models directory.
pub const MODEL_FILE_NAME: &str = "best_model.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("Invalid value {value:?} in {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub k: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_trees: 100,
            k: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Database file; defaults to `iris_database.sqlite` in the app directory.
    pub path: Option<PathBuf>,
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the best model bundle is written.
    pub model_path: Option<PathBuf>,
    pub data: DataSettings,
    pub training: TrainingSettings,
    pub store: StoreSettings,
}

impl AppConfig {
    /// Load `config.toml` from the app directory and apply environment overrides.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = app_dirs::config_file_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a settings file; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `IRISLAB_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(collection) = lookup(COLLECTION_ENV).filter(|value| !value.trim().is_empty()) {
            self.store.collection = collection;
        }
        if let Some(source) = lookup(DATA_SOURCE_ENV).filter(|value| !value.trim().is_empty()) {
            self.data.source = source.parse().map_err(|err: crate::dataset::loader::InvalidDataSource| {
                ConfigError::Env {
                    var: DATA_SOURCE_ENV,
                    value: source.clone(),
                    reason: err.to_string(),
                }
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(ConfigError::Invalid {
                field: "training.test_fraction",
                reason: format!("must be within (0, 1), got {}", training.test_fraction),
            });
        }
        if training.n_trees == 0 {
            return Err(ConfigError::Invalid {
                field: "training.n_trees",
                reason: "must be > 0".to_string(),
            });
        }
        if training.k == 0 {
            return Err(ConfigError::Invalid {
                field: "training.k",
                reason: "must be > 0".to_string(),
            });
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store.collection",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_config(&self) -> Result<StoreConfig, AppDirError> {
        let path = match &self.store.path {
            Some(path) => path.clone(),
            None => app_dirs::app_root_dir()?.join(DB_FILE_NAME),
        };
        Ok(StoreConfig::new(path).with_collection(self.store.collection.clone()))
    }

    pub fn model_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.model_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dirs::models_dir()?.join(MODEL_FILE_NAME)),
        }
    }

    pub fn selector_options(&self) -> SelectorOptions {
        let mut options = SelectorOptions {
            seed: self.training.seed,
            ..SelectorOptions::default()
        };
        options.params.forest.n_trees = self.training.n_trees;
        options.params.k = self.training.k;
        options
    }
}
