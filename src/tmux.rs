//! Tmux binary discovery.
//!
//! Locates the tmux (or tmate) binary a config is generated for and asks it
//! for its version. tmate shares tmux's config syntax, so it is handled by
//! the same code with a few different defaults, see [`Program`].
//!
//! # Binary Selection
//!
//! When no binary is given, the `TMUX_BIN=` line of a previously generated
//! config is reused, so regenerating a config keeps pointing at the same
//! tmux. Failing that, `tmux` is looked up in `PATH`.

use crate::error::{Result, TmuxConfError};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// The program a config is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Program {
    /// Regular tmux.
    #[default]
    Tmux,
    /// tmate, a tmux fork for terminal sharing.
    Tmate,
}

impl Program {
    /// Identify the program from a binary name or path.
    pub fn from_bin(bin: &str) -> Self {
        if bin.contains("tmate") {
            Program::Tmate
        } else {
            Program::Tmux
        }
    }

    /// Name used in directories and `-V` output.
    pub fn name(&self) -> &'static str {
        match self {
            Program::Tmux => "tmux",
            Program::Tmate => "tmate",
        }
    }

    /// Config file used when none is given.
    pub fn default_conf_file(&self) -> &'static str {
        match self {
            Program::Tmux => "~/.tmux.conf",
            Program::Tmate => "~/.tmate.conf",
        }
    }

    /// Version assumed when none is forced.
    ///
    /// tmate is based on tmux 2.4 regardless of its own version number.
    pub fn default_version(&self) -> Option<&'static str> {
        match self {
            Program::Tmux => None,
            Program::Tmate => Some("2.4"),
        }
    }
}

/// A located tmux binary and the version it reported.
#[derive(Debug, Clone, PartialEq)]
pub struct TmuxBinary {
    /// Path (or name) used to run the binary.
    pub path: String,
    /// Which program this is.
    pub program: Program,
    /// Version text as reported by `-V`.
    pub version: String,
}

impl TmuxBinary {
    /// Describe a binary without running it.
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        let path = path.into();
        TmuxBinary {
            program: Program::from_bin(&path),
            path,
            version: version.into(),
        }
    }
}

/// Locate and query the binary to generate a config for.
///
/// # Errors
///
/// - [`TmuxConfError::NotTmux`] if the binary can't be found, or doesn't
///   report itself as tmux or tmate
/// - [`TmuxConfError::EnvironmentFault`] if the binary can't be run
pub fn find_binary(tmux_bin: &str, conf_file: &Path) -> Result<TmuxBinary> {
    let name = if tmux_bin.is_empty() {
        previous_tmux_bin(conf_file).unwrap_or_else(|| "tmux".to_string())
    } else {
        tmux_bin.to_string()
    };

    let path = command_path(&name)
        .ok_or_else(|| TmuxConfError::NotTmux(format!("Not found: {}", name)))?;
    let path = path.to_string_lossy().into_owned();
    info!("found {} in PATH", path);

    let output = Command::new(&path)
        .arg("-V")
        .output()
        .map_err(|e| TmuxConfError::EnvironmentFault(format!("{}: {}", path, e)))?;

    let reported = String::from_utf8_lossy(&output.stdout);
    let (program, version) = parse_version_output(&path, &reported)?;
    Ok(TmuxBinary {
        path,
        program,
        version,
    })
}

/// Parse `-V` output such as `tmux 3.4` into program and version text.
///
/// # Errors
///
/// Returns [`TmuxConfError::NotTmux`] unless the output is exactly two
/// tokens starting with `tmux` or `tmate`.
pub fn parse_version_output(bin: &str, output: &str) -> Result<(Program, String)> {
    let parts: Vec<&str> = output.split_whitespace().collect();
    debug!(bin, ?parts, "version query");
    match parts.as_slice() {
        ["tmux", version] => Ok((Program::Tmux, version.to_string())),
        ["tmate", version] => Ok((Program::Tmate, version.to_string())),
        _ => Err(TmuxConfError::NotTmux(bin.to_string())),
    }
}

/// Extract the `TMUX_BIN` a previous config was generated with.
///
/// Returns `None` if there is no previous config, it has no such line, or
/// the binary it names no longer resolves.
pub fn previous_tmux_bin(conf_file: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(conf_file).ok()?;
    let bin = contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("TMUX_BIN="))?
        .replace('"', "");
    if bin.is_empty() {
        return None;
    }
    let path = command_path(&bin)?;
    info!("found {} in conf file", path.display());
    Some(path.to_string_lossy().into_owned())
}

/// Full path of a command, the equivalent of `command -v`.
pub fn command_path(cmd: &str) -> Option<PathBuf> {
    which::which(cmd).ok()
}

/// Name of this host, for the config header.
pub fn hostname() -> String {
    Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_default()
}
