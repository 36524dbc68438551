//! The output document.
//!
//! [`ConfigWriter`] appends lines to the generated config. Every line passes
//! through three rules before it reaches the file:
//!
//! 1. Nothing is written while the write gate is closed. The gate stays
//!    closed while plugin callbacks are scanned, so their side effects only
//!    show up once the plugin section is generated.
//! 2. `bind -N "note"` lines are rewritten for versions without native bind
//!    notes, see [`ConfigWriter::filter_note`].
//! 3. With embedded scripts, an unescaped backtick is rejected. The config is
//!    piped through a shell to run embedded scripts, and a backtick would
//!    become command substitution there.

use crate::config::Cmd;
use crate::error::{Result, TmuxConfError};
use crate::version::VersionCheck;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// First version rendering `bind -N` notes itself.
pub const NOTES_NATIVE_VERSION: &str = "3.1";

/// Where written lines end up.
#[derive(Debug, Clone, PartialEq)]
pub enum Sink {
    /// Appended to the config file.
    File(PathBuf),
    /// Collected in memory, used when reporting plugin details.
    Capture(Vec<String>),
}

/// Check whether a line contains a backtick not preceded by a backslash.
///
/// ```
/// use tmux_conf::writer::btick_unescaped;
///
/// assert!(btick_unescaped("run 'echo `date`'"));
/// assert!(!btick_unescaped("run 'echo \\`date\\`'"));
/// ```
pub fn btick_unescaped(line: &str) -> bool {
    let mut prev = None;
    for c in line.chars() {
        if c == '`' && prev != Some('\\') {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Line writer for one generation run.
#[derive(Debug)]
pub struct ConfigWriter {
    sink: Sink,
    conf_file: PathBuf,
    enabled: bool,
    parsing_note: bool,
    use_embedded_scripts: bool,
    use_notes_as_comments: bool,
    native_notes: bool,
}

impl ConfigWriter {
    /// Create a writer for `conf_file`, with the gate closed.
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::InvalidVersion`] if the version checker
    /// can't compare against [`NOTES_NATIVE_VERSION`].
    pub fn new(
        conf_file: impl Into<PathBuf>,
        vers: &VersionCheck,
        use_embedded_scripts: bool,
        use_notes_as_comments: bool,
    ) -> Result<Self> {
        let conf_file = conf_file.into();
        Ok(ConfigWriter {
            sink: Sink::File(conf_file.clone()),
            conf_file,
            enabled: false,
            parsing_note: false,
            use_embedded_scripts,
            use_notes_as_comments,
            native_notes: vers.is_at_least(NOTES_NATIVE_VERSION)?,
        })
    }

    /// The config file being generated.
    pub fn conf_file(&self) -> &Path {
        &self.conf_file
    }

    /// Open or close the write gate.
    pub fn set_enabled(&mut self, state: bool) {
        self.enabled = state;
    }

    /// Whether the write gate is open.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Collect further writes in memory instead of the file.
    pub fn start_capture(&mut self) {
        self.sink = Sink::Capture(Vec::new());
    }

    /// Return the captured lines, writing to the file again afterwards.
    pub fn finish_capture(&mut self) -> Vec<String> {
        let sink = std::mem::replace(&mut self.sink, Sink::File(self.conf_file.clone()));
        match sink {
            Sink::Capture(lines) => lines,
            Sink::File(_) => Vec::new(),
        }
    }

    /// Remove the config file, so the run starts from an empty file.
    pub fn remove_output(&self) -> Result<()> {
        if self.conf_file.exists() {
            std::fs::remove_file(&self.conf_file)?;
        }
        Ok(())
    }

    /// Write `cmd` followed by a newline.
    pub fn write(&mut self, cmd: impl Into<Cmd>) -> Result<()> {
        self.write_eol(cmd, "\n")
    }

    /// Write `cmd`, ending each line with `eol`.
    ///
    /// Multiple commands, and commands containing newlines, are written
    /// line by line. Each line is trimmed, so indented blocks can be
    /// passed as is.
    ///
    /// # Errors
    ///
    /// - [`TmuxConfError::UnsafeContent`] for an unescaped backtick while
    ///   embedded scripts are used
    /// - [`TmuxConfError::EnvironmentFault`] if the config file can't be
    ///   written
    pub fn write_eol(&mut self, cmd: impl Into<Cmd>, eol: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        match cmd.into() {
            Cmd::Multiple(lines) => {
                for line in lines {
                    self.write_eol(line, eol)?;
                }
                Ok(())
            }
            Cmd::Single(line) => self.write_line(&line, eol),
        }
    }

    fn write_line(&mut self, line: &str, eol: &str) -> Result<()> {
        if line.contains('\n') {
            for part in line.split('\n') {
                self.write_line(part, eol)?;
            }
            return Ok(());
        }

        if !self.parsing_note && line.contains("bind -N") {
            self.parsing_note = true;
            debug!(line, "filtering note");
            // Only the command line takes the caller's eol, a note comment
            // must end its own line.
            let filtered = self.filter_note(line.trim());
            let last = filtered.len().saturating_sub(1);
            let result = filtered.iter().enumerate().try_for_each(|(i, part)| {
                self.write_line(part, if i == last { eol } else { "\n" })
            });
            self.parsing_note = false;
            return result;
        }

        if self.use_embedded_scripts && btick_unescaped(line) {
            return Err(TmuxConfError::UnsafeContent(line.trim().to_string()));
        }

        let line = line.trim();
        debug!(line, "write");
        match &mut self.sink {
            Sink::Capture(lines) => {
                lines.push(line.to_string());
                Ok(())
            }
            Sink::File(path) => {
                let path: &Path = path;
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| write_fault(path, e))?;
                write!(file, "{}{}", line, eol).map_err(|e| write_fault(path, e))
            }
        }
    }

    /// Rewrite a `bind -N` line for versions without native notes.
    ///
    /// Lines that are empty, comments, or without `-N` are returned as is.
    /// So are all lines on 3.1+ when notes are kept as comments. Otherwise
    /// the note is cut out of the line, and with notes as comments it is
    /// returned as a comment before the remaining command:
    ///
    /// ```text
    /// bind -N "hello" a display x   ->   # -N hello
    ///                                    bind a display x
    /// ```
    ///
    /// A quoted note runs to the matching quote, or to the end of the line
    /// if unterminated. An unquoted note is the next word. A trailing `-N`
    /// without anything after it is dropped.
    pub fn filter_note(&self, line: &str) -> Vec<String> {
        if line.is_empty()
            || line.starts_with('#')
            || !line.contains("-N")
            || (self.native_notes && self.use_notes_as_comments)
        {
            return vec![line.to_string()];
        }

        let Some((pre, post)) = line.split_once("-N") else {
            return vec![line.to_string()];
        };
        let pre = pre.trim();
        let post = post.trim();
        if post.is_empty() {
            return vec![pre.to_string()];
        }

        let (note, mut rest) = match post.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &post[1..];
                match inner.find(quote) {
                    Some(end) => (&inner[..end], &inner[end + 1..]),
                    None => (inner, ""),
                }
            }
            _ => match post.find(char::is_whitespace) {
                Some(end) => (&post[..end], &post[end..]),
                None => (post, ""),
            },
        };

        while rest.starts_with("   ") {
            rest = &rest[1..];
        }

        let new_line = format!("{}{}", pre, rest);
        if self.use_notes_as_comments {
            vec![format!("# -N {}", note), new_line]
        } else {
            vec![new_line]
        }
    }
}

fn write_fault(path: &Path, e: std::io::Error) -> TmuxConfError {
    TmuxConfError::EnvironmentFault(format!(
        "could not write to config file {}: {}",
        path.display(),
        e
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn writer(vers: &str, embedded: bool, notes_as_comments: bool) -> ConfigWriter {
        let vers = VersionCheck::new(vers, None::<&str>).unwrap();
        ConfigWriter::new("/nonexistent/tmux.conf", &vers, embedded, notes_as_comments).unwrap()
    }

    fn capture(writer: &mut ConfigWriter) {
        writer.set_enabled(true);
        writer.start_capture();
    }

    #[test]
    fn test_filter_note_as_comment() {
        let w = writer("2.8", true, true);
        assert_eq!(
            w.filter_note("bind -N 'hello' a display 'x'"),
            vec!["# -N hello", "bind a display 'x'"]
        );
    }

    #[test]
    fn test_filter_note_discarded() {
        let w = writer("2.8", true, false);
        assert_eq!(
            w.filter_note("bind -N 'hello' a display 'x'"),
            vec!["bind a display 'x'"]
        );
    }

    #[test]
    fn test_filter_note_native() {
        let w = writer("3.1", true, true);
        assert_eq!(
            w.filter_note("bind -N 'hello' a display 'x'"),
            vec!["bind -N 'hello' a display 'x'"]
        );
    }

    #[test]
    fn test_filter_note_passthrough() {
        let w = writer("2.8", true, true);
        for line in ["", "# bind -N 'x' a", "bind a display 'x'"] {
            assert_eq!(w.filter_note(line), vec![line]);
        }
    }

    #[test]
    fn test_filter_note_single_word() {
        let w = writer("2.8", true, true);
        assert_eq!(
            w.filter_note("bind -N Help ? list-keys"),
            vec!["# -N Help", "bind ? list-keys"]
        );
        assert_eq!(w.filter_note("bind -N Help"), vec!["# -N Help", "bind"]);
    }

    #[test]
    fn test_filter_note_trailing_marker() {
        let w = writer("2.8", true, true);
        assert_eq!(w.filter_note("bind a display -N"), vec!["bind a display"]);
    }

    #[test]
    fn test_filter_note_unterminated_quote() {
        let w = writer("2.8", true, true);
        assert_eq!(
            w.filter_note("bind -N \"no end a display x"),
            vec!["# -N no end a display x", "bind"]
        );
    }

    #[test]
    fn test_filter_note_shortens_wide_gaps() {
        let w = writer("2.8", true, false);
        assert_eq!(
            w.filter_note("bind -N \"Edit\"      e  new-window"),
            vec!["bind  e  new-window"]
        );
    }

    #[test]
    fn test_gate_closed_writes_nothing() {
        let mut w = writer("3.4", true, true);
        w.start_capture();
        w.write("set -g mouse on").unwrap();
        assert!(w.finish_capture().is_empty());
    }

    #[test]
    fn test_gate_closed_skips_backtick_check() {
        let mut w = writer("3.4", true, true);
        assert!(w.write("run 'echo `date`'").is_ok());
    }

    #[test]
    fn test_write_splits_and_trims() {
        let mut w = writer("3.4", true, true);
        capture(&mut w);
        w.write("\n    set -g mouse on\n    set -g base-index 1\n").unwrap();
        w.write(vec!["a", "b"]).unwrap();
        assert_eq!(
            w.finish_capture(),
            vec!["", "set -g mouse on", "set -g base-index 1", "", "a", "b"]
        );
    }

    #[test]
    fn test_write_filters_notes_once() {
        let mut w = writer("2.8", true, true);
        capture(&mut w);
        w.write("    bind -N \"Split\"  -  split-window -v").unwrap();
        assert_eq!(
            w.finish_capture(),
            vec!["# -N Split", "bind  -  split-window -v"]
        );
    }

    #[test]
    fn test_backtick_rejected_when_embedded() {
        let mut w = writer("3.4", true, true);
        capture(&mut w);
        assert!(matches!(
            w.write("run 'echo `date`'"),
            Err(TmuxConfError::UnsafeContent(_))
        ));
        assert!(w.write("run 'echo \\`date\\`'").is_ok());
    }

    #[test]
    fn test_backtick_allowed_with_external_scripts() {
        let mut w = writer("3.4", false, true);
        capture(&mut w);
        w.write("run 'echo `date`'").unwrap();
        assert_eq!(w.finish_capture(), vec!["run 'echo `date`'"]);
    }

    #[test]
    fn test_btick_unescaped() {
        assert!(!btick_unescaped(""));
        assert!(!btick_unescaped("no ticks"));
        assert!(btick_unescaped("`leading"));
        assert!(btick_unescaped("\\` ok then `bad"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("tmux.conf");
        let vers = VersionCheck::new("3.4", None::<&str>).unwrap();
        let mut w = ConfigWriter::new(&conf, &vers, true, true).unwrap();
        w.set_enabled(true);
        w.write("set -g mouse on").unwrap();
        w.write_eol("set -g base-index 1", " ").unwrap();
        assert_eq!(
            std::fs::read_to_string(&conf).unwrap(),
            "set -g mouse on\nset -g base-index 1 "
        );
        w.remove_output().unwrap();
        assert!(!conf.exists());
    }

    #[test]
    fn test_note_comment_ends_its_own_line() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("tmux.conf");
        let vers = VersionCheck::new("2.8", None::<&str>).unwrap();
        let mut w = ConfigWriter::new(&conf, &vers, true, true).unwrap();
        w.set_enabled(true);
        w.write_eol("bind -N 'Split' - split-window -v", " ").unwrap();
        w.write("display done").unwrap();
        assert_eq!(
            std::fs::read_to_string(&conf).unwrap(),
            "# -N Split\nbind - split-window -v display done\n"
        );
    }
}
