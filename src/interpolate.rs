//! Placeholder expansion for description lines.
//!
//! Lines in a description can refer to things only known while generating:
//!
//! | Placeholder | Expands to |
//! |-------------|------------|
//! | `{run:NAME}` | `run-shell` command running script NAME |
//! | `{run_bg:NAME}` | the same, in the background |
//! | `{script:NAME}` | how scripts refer to script NAME |
//! | `{plugin_dir}` | the plugin directory |
//! | `{vers}` | the effective tmux version |
//!
//! tmux formats such as `#{pane_id}`, shell `${VAR}` expansions and any
//! other braces are left alone.
//!
//! # Example
//!
//! ```
//! use tmux_conf::interpolate::{interpolate, Placeholder};
//!
//! let line = interpolate("display '#{session_name} on {vers}'", |p| match p {
//!     Placeholder::Vers => Ok("3.4".to_string()),
//!     _ => Ok(String::new()),
//! })
//! .unwrap();
//! assert_eq!(line, "display '#{session_name} on 3.4'");
//! ```

use crate::error::Result;

/// A recognized placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `{run:NAME}`
    Run(&'a str),
    /// `{run_bg:NAME}`
    RunBg(&'a str),
    /// `{script:NAME}`
    Script(&'a str),
    /// `{plugin_dir}`
    PluginDir,
    /// `{vers}`
    Vers,
}

/// Parse the text between braces.
///
/// # Examples
///
/// ```
/// use tmux_conf::interpolate::{parse_placeholder, Placeholder};
///
/// assert_eq!(parse_placeholder("run:menus"), Some(Placeholder::Run("menus")));
/// assert_eq!(parse_placeholder("vers"), Some(Placeholder::Vers));
/// assert_eq!(parse_placeholder("pane_id"), None);
/// assert_eq!(parse_placeholder("run:"), None);
/// ```
pub fn parse_placeholder(key: &str) -> Option<Placeholder<'_>> {
    match key {
        "plugin_dir" => return Some(Placeholder::PluginDir),
        "vers" => return Some(Placeholder::Vers),
        _ => {}
    }

    let (kind, name) = key.split_once(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    match kind {
        "run" => Some(Placeholder::Run(name)),
        "run_bg" => Some(Placeholder::RunBg(name)),
        "script" => Some(Placeholder::Script(name)),
        _ => None,
    }
}

/// Replace every placeholder in `line` with what `resolve` returns for it.
///
/// # Errors
///
/// Returns the first error from `resolve`.
pub fn interpolate<F>(line: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(Placeholder<'_>) -> Result<String>,
{
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find('{') {
        let (before, from_brace) = rest.split_at(start);
        out.push_str(before);

        let is_format = before.ends_with('#');
        let placeholder = from_brace[1..]
            .find('}')
            .filter(|_| !is_format)
            .and_then(|end| Some((end, parse_placeholder(&from_brace[1..=end])?)));

        match placeholder {
            Some((end, p)) => {
                out.push_str(&resolve(p)?);
                rest = &from_brace[end + 2..];
            }
            None => {
                out.push('{');
                rest = &from_brace[1..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}
