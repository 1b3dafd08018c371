//! Application directory helpers anchored to a single `.rollcall` folder.
//!
//! Centralizes where config, session, and log files live across platforms,
//! defaulting to the OS config directory and honoring a `ROLLCALL_CONFIG_HOME`
//! override for tests or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory under the OS config root.
pub const APP_DIR_NAME: &str = ".rollcall";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.rollcall` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    create(base.join(APP_DIR_NAME))
}

/// Return the session directory inside the root, creating it if needed.
pub fn session_dir() -> Result<PathBuf, AppDirError> {
    create(app_root_dir()?.join("session"))
}

/// Return the logs directory inside the root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create(app_root_dir()?.join("logs"))
}

fn create(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn base_dir() -> Option<PathBuf> {
    if let Some(path) = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone()) {
        return Some(path);
    }
    if let Ok(path) = std::env::var("ROLLCALL_CONFIG_HOME") {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
pub(crate) struct BaseOverrideGuard;

#[cfg(test)]
impl BaseOverrideGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        let mut guard = BASE_OVERRIDE.lock().expect("base override mutex poisoned");
        *guard = Some(path);
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
