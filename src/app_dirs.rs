//! Where irislab keeps its config, logs, database, and model bundles.
//!
//! Everything lives under one `.irislab` folder in the OS config directory.
//! `IRISLAB_HOME` replaces the OS config directory, which keeps tests and
//! portable installs self-contained.

#[cfg(test)]
use std::path::Path;
use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config root.
pub const APP_DIR_NAME: &str = ".irislab";
/// Environment variable that replaces the OS config root.
pub const HOME_ENV: &str = "IRISLAB_HOME";
/// Name of the settings file inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the `.irislab` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

/// Directory for saved model bundles.
pub fn models_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("models"))
}

pub fn config_file_path() -> Result<PathBuf, AppDirError> {
    Ok(app_root_dir()?.join(CONFIG_FILE_NAME))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn config_base_dir() -> Option<PathBuf> {
    if let Some(path) = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone()) {
        return Some(path);
    }
    if let Some(path) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Point the application directory at `base` until the guard drops.
#[cfg(test)]
pub(crate) struct BaseOverrideGuard;

#[cfg(test)]
impl BaseOverrideGuard {
    pub(crate) fn set(base: &Path) -> Self {
        if let Ok(mut guard) = BASE_OVERRIDE.lock() {
            *guard = Some(base.to_path_buf());
        }
        Self
    }
}

#[cfg(test)]
impl Drop for BaseOverrideGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = BASE_OVERRIDE.lock() {
            *guard = None;
        }
    }
}
