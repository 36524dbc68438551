//! Plugin registry.
//!
//! Plugins are declared by discovery callbacks (see [`PluginFn`]). Each
//! callback returns a [`PluginDecl`]: the plugin's `provider/name`
//! identifier, the oldest tmux version it supports, and static settings to
//! write after its `@plugin` line. Callbacks may also write to the config as
//! a side effect, which only becomes visible when the plugin section is
//! generated.
//!
//! # Minimum Versions
//!
//! A plugin whose minimum version is newer than the effective tmux version
//! is skipped and listed in the plugin report. A minimum version of `-1`
//! (or `-1.0`) drops the plugin without listing it, for plugins that make no
//! sense in a given environment:
//!
//! ```toml
//! [[plugin]]
//! name = "jaclu/tmux-menus"
//! min_version = -1
//! ```

use crate::error::{Result, TmuxConfError};
use crate::generator::TmuxConfig;
use crate::loader::{expand_tilde, home_dir, xdg_config_home};
use crate::tmux::Program;
use crate::version::{VersionCheck, VersionInput};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A plugin discovery callback.
///
/// Called once while scanning, with writes disabled, and once more when the
/// plugin section is generated, with writes enabled.
pub type PluginFn<'a> = Box<dyn Fn(&mut TmuxConfig) -> Result<PluginDecl> + 'a>;

/// What a discovery callback declares.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDecl {
    /// `provider/name` identifier, also the GitHub repository.
    pub name: String,
    /// Oldest supported tmux version, or the `-1` sentinel.
    pub min_version: VersionInput,
    /// Settings written right after the plugin's `@plugin` line.
    pub settings: String,
}

impl PluginDecl {
    /// Declare a plugin.
    pub fn new(
        name: impl Into<String>,
        min_version: impl Into<VersionInput>,
        settings: impl Into<String>,
    ) -> Self {
        PluginDecl {
            name: name.into(),
            min_version: min_version.into(),
            settings: settings.into(),
        }
    }
}

/// A plugin compatible with the effective version.
#[derive(Debug, Clone, PartialEq)]
pub struct UsedPlugin {
    /// `provider/name` identifier.
    pub name: String,
    /// Minimum version as declared.
    pub min_version: String,
    /// Index of the discovery callback that declared it.
    pub callback: usize,
    /// Static settings text.
    pub settings: String,
}

fn is_sentinel(min_version: &str) -> bool {
    matches!(min_version, "-1" | "-1.0")
}

/// Remove the `provider/` prefix from a plugin identifier.
pub fn name_sans_prefix(name: &str) -> &str {
    match name.split_once('/') {
        Some((_, short)) => short,
        None => name,
    }
}

/// Used and skipped plugins for one generation run.
#[derive(Debug)]
pub struct PluginRegistry {
    conf_file: PathBuf,
    program: Program,
    vers: VersionCheck,
    used: Vec<UsedPlugin>,
    skipped: Vec<(String, String)>,
    is_limited_host: bool,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new(conf_file: impl Into<PathBuf>, program: Program, vers: VersionCheck) -> Self {
        PluginRegistry {
            conf_file: conf_file.into(),
            program,
            vers,
            used: Vec::new(),
            skipped: Vec::new(),
            is_limited_host: false,
        }
    }

    /// Partition declarations into used and skipped plugins.
    ///
    /// Each declaration comes paired with the index of the callback that
    /// produced it. Skipped plugins end up sorted by `(version, name)`.
    ///
    /// # Errors
    ///
    /// - [`TmuxConfError::DuplicatePlugin`] if a name is declared twice
    /// - [`TmuxConfError::InvalidVersion`] if a minimum version is malformed
    pub fn scan<I>(&mut self, decls: I) -> Result<()>
    where
        I: IntoIterator<Item = (usize, PluginDecl)>,
    {
        let mut seen = HashSet::new();
        for (callback, decl) in decls {
            if !seen.insert(decl.name.clone()) {
                return Err(TmuxConfError::DuplicatePlugin(decl.name));
            }

            let min_version = decl.min_version.as_text();
            if is_sentinel(&min_version) {
                debug!(plugin = %decl.name, "plugin disabled");
                continue;
            }

            if self.vers.is_at_least(&decl.min_version)? {
                self.used.push(UsedPlugin {
                    name: decl.name,
                    min_version,
                    callback,
                    settings: decl.settings,
                });
            } else {
                debug!(plugin = %decl.name, %min_version, "plugin needs newer tmux");
                self.skipped.push((min_version, decl.name));
            }
        }
        self.skipped.sort();
        Ok(())
    }

    /// Names of the plugins in use.
    ///
    /// With `short_name`, the `provider/` prefix is dropped. That is usually
    /// what content wants to check for, since it matches regardless of which
    /// fork of a plugin is used.
    pub fn installed(&self, short_name: bool) -> Vec<String> {
        self.used
            .iter()
            .map(|plugin| {
                if short_name {
                    name_sans_prefix(&plugin.name).to_string()
                } else {
                    plugin.name.clone()
                }
            })
            .collect()
    }

    /// Plugins compatible with the effective version, in declaration order.
    pub fn used(&self) -> &[UsedPlugin] {
        &self.used
    }

    /// `(min_version, name)` of plugins needing a newer version.
    pub fn skipped(&self) -> &[(String, String)] {
        &self.skipped
    }

    /// Whether any plugin is in use.
    pub fn has_plugins(&self) -> bool {
        !self.used.is_empty()
    }

    /// The version checker used for scanning.
    pub fn version_checker(&self) -> &VersionCheck {
        &self.vers
    }

    /// Program the plugins are installed for.
    pub fn program(&self) -> Program {
        self.program
    }

    /// Mark the host as slow, so plugin activation reports its progress.
    pub fn set_limited_host(&mut self, is_limited: bool) -> bool {
        self.is_limited_host = is_limited;
        self.is_limited_host
    }

    /// Whether the host was marked as slow.
    pub fn is_limited_host(&self) -> bool {
        self.is_limited_host
    }

    /// Directory plugins are installed into.
    pub fn plugin_dir(&self) -> PathBuf {
        self.env().0
    }

    /// Plugin directory and the environment prefix for the plugin manager.
    ///
    /// A config directly in `$HOME` uses the classic `~/.tmux/plugins`
    /// (`~/.tmate/plugins`). Otherwise plugins go in
    /// `<base>/<program>/plugins`, base being `$XDG_CONFIG_HOME` or the
    /// directory above the config's. In that case the prefix sets
    /// `XDG_CONFIG_HOME` so the plugin manager resolves the same directory.
    pub fn env(&self) -> (PathBuf, String) {
        let location = self.conf_file.parent().unwrap_or(Path::new("/"));
        let is_home = home_dir().map(|home| home == location).unwrap_or(false);

        if is_home {
            let dir = match self.program {
                Program::Tmux => expand_tilde("~/.tmux/plugins"),
                Program::Tmate => expand_tilde("~/.tmate/plugins"),
            };
            return (dir, String::new());
        }

        let base = xdg_config_home().unwrap_or_else(|| {
            location
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });
        let dir = base.join(self.program.name()).join("plugins");
        let env = format!("XDG_CONFIG_HOME=\"{}\" ", base.display());
        (dir, env)
    }

    /// Remove all installed plugins, so they are reinstalled on next launch.
    ///
    /// # Errors
    ///
    /// - [`TmuxConfError::EnvironmentFault`] if the plugin directory doesn't
    ///   look like a tmux plugin directory
    /// - [`TmuxConfError::IoError`] if removal fails
    pub fn clear(&self) -> Result<()> {
        let plugin_dir = self.plugin_dir();
        let expected = format!("{}/", self.program.name());
        if !plugin_dir.to_string_lossy().contains(&expected) {
            return Err(TmuxConfError::EnvironmentFault(format!(
                "Refusing to clear plugins due to suspicious plugin dir: [{}]",
                plugin_dir.display()
            )));
        }

        if !plugin_dir.exists() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&plugin_dir)? {
            let entry = entry?;
            info!("removing plugin {}", entry.file_name().to_string_lossy());
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn registry(vers: &str) -> PluginRegistry {
        PluginRegistry::new(
            "/tmp/foo32/tmux/tmux.conf",
            Program::Tmux,
            VersionCheck::new(vers, None::<&str>).unwrap(),
        )
    }

    fn decls(list: Vec<PluginDecl>) -> impl Iterator<Item = (usize, PluginDecl)> {
        list.into_iter().enumerate()
    }

    #[test]
    fn test_scan_used() {
        let mut reg = registry("2.4");
        reg.scan(decls(vec![PluginDecl::new(
            "jaclu/tmux-prefix-highlight",
            2.4,
            "set -g @prefix_highlight_show_copy_mode  on",
        )]))
        .unwrap();

        assert_eq!(reg.installed(true), vec!["tmux-prefix-highlight"]);
        assert_eq!(reg.installed(false), vec!["jaclu/tmux-prefix-highlight"]);
        assert_eq!(reg.used()[0].min_version, "2.4");
        assert!(reg.skipped().is_empty());
    }

    #[test]
    fn test_scan_skipped() {
        let mut reg = registry("2.4");
        reg.scan(decls(vec![PluginDecl::new("jaclu/tmux-menus", "3.0", "")]))
            .unwrap();

        assert!(reg.installed(true).is_empty());
        assert!(!reg.has_plugins());
        assert_eq!(
            reg.skipped(),
            &[("3.0".to_string(), "jaclu/tmux-menus".to_string())]
        );
    }

    #[test]
    fn test_skipped_sorted_by_version_then_name() {
        let mut reg = registry("1.8");
        reg.scan(decls(vec![
            PluginDecl::new("b/zeta", "3.0", ""),
            PluginDecl::new("a/beta", 2.4, ""),
            PluginDecl::new("a/alpha", "3.0", ""),
        ]))
        .unwrap();

        let names: Vec<&str> = reg.skipped().iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["a/beta", "a/alpha", "b/zeta"]);
    }

    #[test]
    fn test_sentinel_never_listed() {
        for vers in ["1.5", "2.4", "3.4"] {
            let mut reg = registry(vers);
            reg.scan(decls(vec![
                PluginDecl::new("x/off", -1, ""),
                PluginDecl::new("x/off-float", -1.0, ""),
                PluginDecl::new("x/off-text", "-1", ""),
            ]))
            .unwrap();
            assert!(reg.installed(false).is_empty());
            assert!(reg.skipped().is_empty());
        }
    }

    #[test]
    fn test_duplicate_aborts() {
        let mut reg = registry("3.4");
        let err = reg
            .scan(decls(vec![
                PluginDecl::new("tmux-plugins/tmux-yank", 1.5, ""),
                PluginDecl::new("tmux-plugins/tmux-yank", 1.5, ""),
            ]))
            .unwrap_err();

        match err {
            TmuxConfError::DuplicatePlugin(name) => assert_eq!(name, "tmux-plugins/tmux-yank"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reg.installed(false).len(), 1);
    }

    #[test]
    fn test_name_without_provider() {
        let mut reg = registry("3.4");
        reg.scan(decls(vec![PluginDecl::new("local-plugin", 1.5, "")]))
            .unwrap();
        assert_eq!(reg.installed(true), vec!["local-plugin"]);
    }

    #[test]
    fn test_limited_host() {
        let mut reg = registry("3.4");
        assert!(reg.set_limited_host(true));
        assert!(!reg.set_limited_host(false));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_env_from_conf_location() {
        let reg = registry("3.4");
        let (dir, env) = reg.env();
        assert_eq!(dir, PathBuf::from("/tmp/foo32/tmux/plugins"));
        assert_eq!(env, "XDG_CONFIG_HOME=\"/tmp/foo32\" ");
        assert_eq!(reg.plugin_dir(), dir);
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/tmp/foo/xdg")])]
    fn test_env_xdg_override() {
        let (dir, env) = registry("3.4").env();
        assert_eq!(dir, PathBuf::from("/tmp/foo/xdg/tmux/plugins"));
        assert_eq!(env, "XDG_CONFIG_HOME=\"/tmp/foo/xdg\" ");
    }

    #[test]
    fn test_env_default_location() {
        let home = dirs::home_dir().unwrap();
        let vers = VersionCheck::new("3.4", None::<&str>).unwrap();
        let tmux = PluginRegistry::new(home.join(".tmux.conf"), Program::Tmux, vers.clone());
        assert_eq!(tmux.env(), (home.join(".tmux/plugins"), String::new()));

        let tmate = PluginRegistry::new(home.join(".tmate.conf"), Program::Tmate, vers);
        assert_eq!(tmate.plugin_dir(), home.join(".tmate/plugins"));
    }

    #[sealed_test]
    fn test_clear_removes_plugins() {
        let dir = tempfile::tempdir().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", dir.path()) };
        let plugins = dir.path().join("tmux/plugins");
        std::fs::create_dir_all(plugins.join("tpm")).unwrap();
        std::fs::create_dir_all(plugins.join("tmux-yank")).unwrap();

        let reg = PluginRegistry::new(
            dir.path().join("tmux/tmux.conf"),
            Program::Tmux,
            VersionCheck::new("3.4", None::<&str>).unwrap(),
        );
        reg.clear().unwrap();
        assert!(plugins.exists());
        assert_eq!(std::fs::read_dir(&plugins).unwrap().count(), 0);
    }
}
