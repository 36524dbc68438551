//! Error types for tmux-conf.
//!
//! All errors are represented by [`TmuxConfError`]. None of them are
//! retried: they either abort construction of the run context or end the
//! generation run, leaving any partially written config to be regenerated.

use std::path::PathBuf;
use thiserror::Error;

/// All possible errors that can occur while generating a config.
#[derive(Error, Debug)]
pub enum TmuxConfError {
    /// A version string could not be parsed as `major.minor[suffix]`.
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Two plugin declarations share the same identifier.
    #[error("Plugin \"{0}\" defined more than once")]
    DuplicatePlugin(String),

    /// An un-escaped back-tick reached the config while embedded scripts are used.
    #[error(
        "Un-escaped back-ticks can not be present in the generated config \
         when embedded scripts are used: {0}"
    )]
    UnsafeContent(String),

    /// The host environment can not provide something the run depends on.
    #[error("Environment error: {0}")]
    EnvironmentFault(String),

    /// Overwrite confirmation was not given.
    #[error("Terminating, config file was not replaced")]
    UserDeclined,

    /// An operation was called in a state where it is not valid.
    #[error("Invalid state: {0}")]
    StateError(String),

    /// The given binary does not identify itself as tmux or tmate.
    #[error("{0} doesn't seem to be a tmux binary")]
    NotTmux(String),

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing of the description file failed.
    #[error("Failed to parse description: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Description file does not exist at the given path.
    #[error("Description file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Could not determine the user's home directory.
    #[error("Could not determine home directory")]
    NoConfigDir,
}

/// Convenient Result type alias for tmux-conf operations.
pub type Result<T> = std::result::Result<T, TmuxConfError>;
