//! Path handling and description loading.
//!
//! Paths are stored expanded internally. When a path is written into the
//! generated config it is contracted back to `~` notation where that keeps
//! the config portable, see [`tilde_path`].

use crate::config::Description;
use crate::error::{Result, TmuxConfError};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Environment variable overriding the base config directory.
pub const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";

/// Expand `~` and environment variables in a path.
///
/// # Errors
///
/// Returns [`TmuxConfError::EnvironmentFault`] if a referenced variable is not set.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| TmuxConfError::EnvironmentFault(format!("{}: {}", path, e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Expand a leading `~` only.
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Contract the home directory prefix of `path` into `~`.
///
/// ```ignore
/// assert_eq!(tilde_path(&home.join(".tmux.conf")), "~/.tmux.conf");
/// ```
pub fn tilde_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// The user's home directory.
///
/// # Errors
///
/// Returns [`TmuxConfError::NoConfigDir`] if it can't be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(TmuxConfError::NoConfigDir)
}

/// `$XDG_CONFIG_HOME` if set to a non-empty value.
pub fn xdg_config_home() -> Option<PathBuf> {
    std::env::var(XDG_CONFIG_HOME)
        .ok()
        .filter(|value| !value.is_empty())
        .map(|value| expand_tilde(&value))
}

/// Verify that the config file can be written, returning its full path.
///
/// Relative names are resolved against the current directory, and the
/// parent directory is created if needed. The file is probed by opening it
/// for appending; a probe that left an empty file behind removes it again.
///
/// # Errors
///
/// - [`TmuxConfError::StateError`] if `conf_file` is empty
/// - [`TmuxConfError::EnvironmentFault`] if the directory can't be created
///   or the file can't be written
pub fn verify_conf_file_usable(conf_file: &str) -> Result<PathBuf> {
    if conf_file.is_empty() {
        return Err(TmuxConfError::StateError("empty conf_file param".into()));
    }

    let mut path = expand_path(conf_file)?;
    if path.is_relative() {
        path = std::env::current_dir()?.join(path);
    }

    if let Some(location) = path.parent() {
        std::fs::create_dir_all(location).map_err(|e| {
            TmuxConfError::EnvironmentFault(format!(
                "could not create directory for config file {}: {}",
                location.display(),
                e
            ))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            TmuxConfError::EnvironmentFault(format!(
                "could not write to config file {}: {}",
                path.display(),
                e
            ))
        })?;

    if std::fs::metadata(&path)?.len() == 0 {
        std::fs::remove_file(&path)?;
    }

    Ok(path)
}

/// Load and parse a description file.
///
/// # Errors
///
/// - [`TmuxConfError::ConfigNotFound`] if the file doesn't exist
/// - [`TmuxConfError::IoError`] if reading fails
/// - [`TmuxConfError::ParseError`] if TOML parsing fails
pub fn load_description(path: &Path) -> Result<Description> {
    if !path.exists() {
        return Err(TmuxConfError::ConfigNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let description = Description::from_str(&contents)?;
    Ok(description)
}
