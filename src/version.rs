//! Version parsing and comparison.
//!
//! tmux versions are two-part `major.minor` numbers, optionally followed by
//! an alphabetic point-release suffix (`3.2a`). tmate reports three-part
//! versions such as `2.4.0`; only the first two parts matter for
//! compatibility checks, so everything past the minor part is dropped.
//!
//! # Ordering
//!
//! Versions order by major, then minor, then suffix. The suffix is compared
//! as a plain string and only on an exact `major.minor` tie, so `3.1b` is
//! newer than `3.1a`, which is newer than `3.1`, and `3.2` is newer than all
//! of them.

use crate::error::{Result, TmuxConfError};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A version literal as it may appear in a description file.
///
/// ```toml
/// min_version = 3        # Int
/// min_version = 2.4      # Float
/// min_version = "3.2a"   # Text
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VersionInput {
    /// Whole number, treated as `N.0`.
    Int(i64),
    /// Decimal number, used as written.
    Float(f64),
    /// Free-form text, commas are accepted as decimal separators.
    Text(String),
}

impl VersionInput {
    /// The literal as text, without normalization.
    ///
    /// Used to recognize the `-1` / `-1.0` plugin sentinel, which is not a
    /// valid version.
    pub fn as_text(&self) -> String {
        match self {
            VersionInput::Int(n) => n.to_string(),
            VersionInput::Float(f) => float_text(*f),
            VersionInput::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for VersionInput {
    fn from(s: &str) -> Self {
        VersionInput::Text(s.to_string())
    }
}

impl From<String> for VersionInput {
    fn from(s: String) -> Self {
        VersionInput::Text(s)
    }
}

impl From<&String> for VersionInput {
    fn from(s: &String) -> Self {
        VersionInput::Text(s.clone())
    }
}

impl From<i64> for VersionInput {
    fn from(n: i64) -> Self {
        VersionInput::Int(n)
    }
}

impl From<i32> for VersionInput {
    fn from(n: i32) -> Self {
        VersionInput::Int(n.into())
    }
}

impl From<f64> for VersionInput {
    fn from(f: f64) -> Self {
        VersionInput::Float(f)
    }
}

impl From<&VersionInput> for VersionInput {
    fn from(v: &VersionInput) -> Self {
        v.clone()
    }
}

// Whole floats keep one decimal (`3.0`), others use the shortest exact form.
fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Normalize a version literal into canonical `major.minor[suffix]` text.
///
/// # Examples
///
/// ```
/// use tmux_conf::version::normalize;
///
/// assert_eq!(normalize(3).unwrap(), "3.0");
/// assert_eq!(normalize(2.4).unwrap(), "2.4");
/// assert_eq!(normalize("3,2a").unwrap(), "3.2a");
/// assert_eq!(normalize("2.4.0").unwrap(), "2.4");
/// assert!(normalize("3").is_err());
/// ```
///
/// # Errors
///
/// Returns [`TmuxConfError::InvalidVersion`] if fewer than two
/// dot-separated components remain.
pub fn normalize(input: impl Into<VersionInput>) -> Result<String> {
    let text = match input.into() {
        VersionInput::Int(n) => format!("{}.0", n),
        VersionInput::Float(f) => float_text(f),
        VersionInput::Text(s) => s,
    };
    let text = text.trim().replace(',', ".");

    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() < 2 {
        return Err(TmuxConfError::InvalidVersion(format!(
            "{} - expected maj.min notation",
            text
        )));
    }
    Ok(format!("{}.{}", parts[0], parts[1]))
}

/// Split the minor part of a version into its number and suffix.
///
/// ```
/// use tmux_conf::version::split_sub_version;
///
/// assert_eq!(split_sub_version("2a").unwrap(), (2, "a".to_string()));
/// assert_eq!(split_sub_version("10").unwrap(), (10, String::new()));
/// ```
///
/// # Errors
///
/// Returns [`TmuxConfError::InvalidVersion`] if `text` does not start with a digit.
pub fn split_sub_version(text: &str) -> Result<(u32, String)> {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(digits_end);
    let number = digits.parse::<u32>().map_err(|_| {
        TmuxConfError::InvalidVersion(format!("{} - minor part has no leading digit", text))
    })?;
    Ok((number, suffix.to_string()))
}

/// A parsed `major.minor[suffix]` version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
    /// Point release suffix, empty for plain releases.
    pub suffix: String,
}

impl Version {
    /// Parse any version literal.
    pub fn parse(input: impl Into<VersionInput>) -> Result<Self> {
        let text = normalize(input)?;
        let (major, minor) = text
            .split_once('.')
            .ok_or_else(|| TmuxConfError::InvalidVersion(text.clone()))?;
        let major = major.parse::<u32>().map_err(|_| {
            TmuxConfError::InvalidVersion(format!("{} - major part not int", text))
        })?;
        let (minor, suffix) = split_sub_version(minor)?;
        Ok(Version {
            major,
            minor,
            suffix,
        })
    }
}

impl FromStr for Version {
    type Err = TmuxConfError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.major, self.minor, self.suffix)
    }
}

/// The actual and effective version for one generation run.
///
/// The effective version is what every compatibility decision is made
/// against. It defaults to the actual version, but can be forced to another
/// release to generate a config for a different tmux.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionCheck {
    actual: Version,
    effective: Version,
}

impl VersionCheck {
    /// Create a checker from the installed version and an optional requested one.
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::InvalidVersion`] if either version is malformed.
    pub fn new(
        actual: impl Into<VersionInput>,
        requested: Option<impl Into<VersionInput>>,
    ) -> Result<Self> {
        let actual = Version::parse(actual)?;
        let effective = match requested {
            Some(requested) => Version::parse(requested)?,
            None => actual.clone(),
        };
        Ok(VersionCheck { actual, effective })
    }

    /// The version used for generating the config.
    pub fn get(&self) -> &Version {
        &self.effective
    }

    /// The version of the tmux binary.
    pub fn get_actual(&self) -> &Version {
        &self.actual
    }

    /// Whether the effective version differs from the installed one.
    pub fn is_forced(&self) -> bool {
        self.actual != self.effective
    }

    /// Check if the effective version is at least `requirement`.
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::InvalidVersion`] if `requirement` is malformed.
    pub fn is_at_least(&self, requirement: impl Into<VersionInput>) -> Result<bool> {
        let requirement = Version::parse(requirement)?;
        Ok(requirement <= self.effective)
    }
}
