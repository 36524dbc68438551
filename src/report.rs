//! Plugin status report.
//!
//! Shown instead of generating a config when a display level is requested:
//!
//! | Level | Content |
//! |-------|---------|
//! | 1 | used plugins, marking those not installed, and unused plugin dirs |
//! | 2 | as 1, plus plugins skipped for needing a newer version |
//! | 3 | as 1, plus what each used plugin writes to the config |

use crate::error::Result;
use crate::plugins::{PluginRegistry, name_sans_prefix};
use std::fmt;
use std::path::{Path, PathBuf};

const NOT_INSTALLED: &str = "*** Not installed ***";

/// A used plugin as listed in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    /// Name without the `provider/` prefix.
    pub name: String,
    /// Minimum version as declared.
    pub min_version: String,
    /// Found in the plugin directory.
    pub installed: bool,
    /// Config lines this plugin produces, only collected for level 3.
    pub output: Vec<String>,
}

/// Report on the plugins of one description.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginReport {
    level: u8,
    vers: String,
    source: PathBuf,
    name_width: usize,
    used: Vec<ReportEntry>,
    skipped: Vec<(String, String)>,
    unused_dirs: Vec<String>,
}

impl PluginReport {
    /// Build a report from a scanned registry.
    ///
    /// Installed plugins are found by matching directory names in the
    /// plugin directory against plugin names. Directories matching no used
    /// or skipped plugin are listed as unused; the plugin manager's own
    /// `tpm` directory never is.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TmuxConfError::IoError`] if the plugin directory
    /// exists but can't be read.
    pub fn new(level: u8, source: &Path, registry: &PluginRegistry) -> Result<Self> {
        let mut dirs = plugin_dirs(&registry.plugin_dir())?;
        dirs.retain(|d| d != "tpm");

        let used = registry
            .used()
            .iter()
            .map(|plugin| {
                let name = name_sans_prefix(&plugin.name).to_string();
                let installed = take(&mut dirs, &name);
                ReportEntry {
                    name,
                    min_version: plugin.min_version.clone(),
                    installed,
                    output: Vec::new(),
                }
            })
            .collect();

        for (_, name) in registry.skipped() {
            take(&mut dirs, name_sans_prefix(name));
        }

        let name_width = registry
            .used()
            .iter()
            .map(|plugin| plugin.name.len() + 2)
            .max()
            .unwrap_or(0);

        Ok(PluginReport {
            level,
            vers: registry.version_checker().get().to_string(),
            source: source.to_path_buf(),
            name_width,
            used,
            skipped: registry.skipped().to_vec(),
            unused_dirs: dirs,
        })
    }

    /// Requested display level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Attach the config lines produced by the `index`-th used plugin.
    pub fn set_output(&mut self, index: usize, lines: Vec<String>) {
        if let Some(entry) = self.used.get_mut(index) {
            entry.output = lines;
        }
    }

    /// Used plugins in declaration order.
    pub fn used(&self) -> &[ReportEntry] {
        &self.used
    }

    /// Directories in the plugin dir not belonging to any declared plugin.
    pub fn unused_dirs(&self) -> &[String] {
        &self.unused_dirs
    }
}

fn plugin_dirs(plugin_dir: &Path) -> Result<Vec<String>> {
    if !plugin_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(plugin_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirs.sort();
    Ok(dirs)
}

// Remove `name` from `dirs`, returning whether it was there.
fn take(dirs: &mut Vec<String>, name: &str) -> bool {
    match dirs.iter().position(|d| d == name) {
        Some(pos) => {
            dirs.remove(pos);
            true
        }
        None => false,
    }
}

impl fmt::Display for PluginReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.name_width;
        writeln!(f, "\n\t=====  tmux {} - Plugins defined  =====", self.vers)?;
        writeln!(f, " for: {}", self.source.display())?;

        if !self.used.is_empty() {
            writeln!(f, "\n\t-----   Plugins used   -----")?;
            writeln!(f, "{:<width$}|  Min version", "Plugin")?;
        }

        for entry in &self.used {
            let suffix = if entry.installed { "" } else { NOT_INSTALLED };
            if self.level == 3 {
                writeln!(f, "{}", "-".repeat(entry.name.len() + 2))?;
                let row = format!(
                    "> {:<w$} - {} {}",
                    entry.name,
                    entry.min_version,
                    suffix,
                    w = width.saturating_sub(2)
                );
                writeln!(f, "{}", row.trim_end())?;
                for line in &entry.output {
                    writeln!(f, "{}", line)?;
                }
            } else {
                let row = format!("{:<width$} - {} {}", entry.name, entry.min_version, suffix);
                writeln!(f, "{}", row.trim_end())?;
            }
        }

        if !self.unused_dirs.is_empty() {
            writeln!(f, "\n-----   Unused plugins found   -----")?;
            for dir in &self.unused_dirs {
                writeln!(f, "\t {}", dir)?;
            }
        }

        if self.level != 2 || self.skipped.is_empty() {
            return Ok(());
        }

        let vers_width = self.skipped.iter().map(|(v, _)| v.len()).max().unwrap_or(0);
        writeln!(f)?;
        writeln!(f, "-----   Plugins ignored   -----")?;
        writeln!(
            f,
            "{}",
            format!("{:<vers_width$}|{:<width$}", "Min", " Plugin name").trim_end()
        )?;
        writeln!(f, "{:<vers_width$}|\n", "vers")?;
        for (vers, name) in &self.skipped {
            writeln!(f, "{:>vers_width$}  {}", vers, name)?;
        }
        Ok(())
    }
}
