//! Config generation.
//!
//! [`TmuxConfig`] is the context of one generation run. It owns the output
//! document, the script emitter and the plugin registry, and drives them in
//! a fixed order from [`TmuxConfig::run`]:
//!
//! 1. plugin callbacks are scanned with the write gate closed
//! 2. the old config is removed and the header written
//! 3. [`ConfigSource::content`] and the edit-config binding
//! 4. the plugin section, if any plugin is used
//! 5. [`ConfigSource::local_overrides`] and the plugin handler
//! 6. the embedded script block, always last since content may define
//!    scripts right up to the end
//!
//! What gets written comes from a [`ConfigSource`], either the TOML
//! [`Description`](crate::config::Description) or any other implementation.

use crate::config::Cmd;
use crate::deploy::PluginDeployment;
use crate::error::{Result, TmuxConfError};
use crate::loader::{expand_path, expand_tilde, verify_conf_file_usable};
use crate::plugins::{PluginFn, PluginRegistry};
use crate::report::PluginReport;
use crate::scripts::{EmbeddedScripts, MANUAL_HANDLER, ScriptConfig};
use crate::tmux::{self, Program, TmuxBinary};
use crate::version::{VersionCheck, VersionInput};
use crate::writer::ConfigWriter;
use indoc::{formatdoc, indoc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Oldest version the plugin manager runs on, older ones use manual handling.
pub const TPM_MIN_VERSION: &str = "1.9";

const PLUGINS_HEADER: &str = indoc! {"
    #======================================================
    #
    #   Plugins
    #
    # ======================================================
"};

/// Section header written before local overrides.
pub const LOCAL_OVERRIDES_HEADER: &str = indoc! {"

    #======================================================
    #
    #   Local overrides
    #
    #======================================================
"};

/// Per-run knobs of the generated config.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `manual`, a plugin manager repo such as `tmux-plugins/tpm`, or empty
    /// to disable plugins.
    pub plugin_handler: String,
    /// Keep `bind -N` notes as comments on versions without notes.
    pub use_notes_as_comments: bool,
    /// Store scripts inside the config instead of a scripts directory.
    pub use_embedded_scripts: bool,
    /// Slow host, plugin activation reports progress.
    pub is_limited_host: bool,
    /// Key for the edit-config binding, empty for none.
    pub edit_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            plugin_handler: "tmux-plugins/tpm".to_string(),
            use_notes_as_comments: true,
            use_embedded_scripts: true,
            is_limited_host: false,
            edit_key: "e".to_string(),
        }
    }
}

/// How and where to generate, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Config file to write, `~` and `$VARS` are expanded.
    pub conf_file: String,
    /// tmux binary, empty to reuse the previous one or `tmux`.
    pub tmux_bin: String,
    /// Generate for this version instead of the installed one.
    pub forced_version: Option<String>,
    /// Replace an existing config without asking.
    pub replace_config: bool,
    /// Remove installed plugins before generating.
    pub clear_plugins: bool,
    /// Plugin report level (1 to 3), 0 to generate the config.
    pub plugins_display: u8,
    /// The description the config is generated from.
    pub source: PathBuf,
    /// Command regenerating the config, used by the edit binding.
    pub generator_bin: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            conf_file: Program::Tmux.default_conf_file().to_string(),
            tmux_bin: String::new(),
            forced_version: None,
            replace_config: false,
            clear_plugins: false,
            plugins_display: 0,
            source: PathBuf::new(),
            generator_bin: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub enum Outcome {
    /// The config was written to this path.
    Written(PathBuf),
    /// A plugin report was requested instead of a config.
    Report(PluginReport),
}

/// Provides the content of a generated config.
pub trait ConfigSource {
    /// Write the bulk of the config.
    fn content(&self, cfg: &mut TmuxConfig) -> Result<()>;

    /// Write settings that must come after everything else, but before the
    /// plugin handler runs.
    ///
    /// The default writes a section header only.
    fn local_overrides(&self, cfg: &mut TmuxConfig) -> Result<()> {
        cfg.write(LOCAL_OVERRIDES_HEADER)
    }

    /// Plugin discovery callbacks, in declaration order.
    fn plugins(&self) -> Vec<PluginFn<'_>> {
        Vec::new()
    }
}

/// Context of one generation run.
#[derive(Debug)]
pub struct TmuxConfig {
    options: Options,
    settings: Settings,
    conf_file: PathBuf,
    binary: TmuxBinary,
    vers: VersionCheck,
    writer: ConfigWriter,
    scripts: EmbeddedScripts,
    plugins: PluginRegistry,
    edit_config_called: bool,
}

// tmate is based on tmux 2.4, has its own default config and only supports
// manual plugin handling.
fn apply_tmate_defaults(program: Program, options: &mut Options, settings: &mut Settings) {
    if program != Program::Tmate {
        return;
    }
    if options.forced_version.is_none() {
        options.forced_version = program.default_version().map(str::to_string);
    }
    if options.conf_file == Program::Tmux.default_conf_file() {
        options.conf_file = program.default_conf_file().to_string();
        options.replace_config = true;
    }
    if !settings.plugin_handler.is_empty() {
        settings.plugin_handler = MANUAL_HANDLER.to_string();
    }
}

impl TmuxConfig {
    /// Prepare a run, locating the tmux binary to generate for.
    ///
    /// # Errors
    ///
    /// - [`TmuxConfError::NotTmux`] if no tmux binary is found
    /// - [`TmuxConfError::EnvironmentFault`] if the config file is unusable
    /// - [`TmuxConfError::InvalidVersion`] for an unusable version
    pub fn new(options: Options, settings: Settings) -> Result<Self> {
        // A previous TMUX_BIN is only looked up when no binary was given,
        // so tmate defaults never apply to this path.
        let previous_conf = expand_path(&options.conf_file)?;
        let binary = tmux::find_binary(&options.tmux_bin, &previous_conf)?;
        Self::with_binary(options, settings, binary)
    }

    /// Prepare a run for an already located binary.
    pub fn with_binary(
        mut options: Options,
        mut settings: Settings,
        binary: TmuxBinary,
    ) -> Result<Self> {
        apply_tmate_defaults(binary.program, &mut options, &mut settings);
        let conf_file = verify_conf_file_usable(&options.conf_file)?;
        let vers = VersionCheck::new(binary.version.as_str(), options.forced_version.as_deref())?;

        if vers.is_forced() && binary.program == Program::Tmux {
            warn!(
                "Config has been requested for another version of tmux than the one \
                 used to generate it, running it with the current tmux might give errors"
            );
            warn!("tmux vers is:    {}", vers.get_actual());
            warn!("requested vers:  {}", vers.get());
        }

        if !settings.plugin_handler.is_empty() && !vers.is_at_least(TPM_MIN_VERSION)? {
            debug!("plugin manager needs tmux {}, using manual", TPM_MIN_VERSION);
            settings.plugin_handler = MANUAL_HANDLER.to_string();
        }

        let scripts = EmbeddedScripts::new(ScriptConfig {
            conf_file: conf_file.clone(),
            use_embedded: settings.use_embedded_scripts,
            plugin_handler: settings.plugin_handler.clone(),
            program: binary.program,
            vers: vers.clone(),
        });
        let plugins = PluginRegistry::new(conf_file.clone(), binary.program, vers.clone());
        let writer = ConfigWriter::new(
            conf_file.clone(),
            &vers,
            settings.use_embedded_scripts,
            settings.use_notes_as_comments,
        )?;

        Ok(TmuxConfig {
            options,
            settings,
            conf_file,
            binary,
            vers,
            writer,
            scripts,
            plugins,
            edit_config_called: false,
        })
    }

    /// Generate the config, or a plugin report if one was requested.
    ///
    /// # Errors
    ///
    /// Any error aborts the run, possibly leaving a partial config behind.
    pub fn run(&mut self, source: &dyn ConfigSource) -> Result<Outcome> {
        self.plugins.set_limited_host(self.settings.is_limited_host);
        if self.options.clear_plugins {
            self.plugins.clear()?;
        }

        self.writer.set_enabled(false);
        let callbacks = source.plugins();
        if !self.settings.plugin_handler.is_empty() {
            let mut decls = Vec::with_capacity(callbacks.len());
            for (index, callback) in callbacks.iter().enumerate() {
                decls.push((index, callback(self)?));
            }
            self.plugins.scan(decls)?;

            if self.options.plugins_display > 0 {
                return self.plugin_report(&callbacks).map(Outcome::Report);
            }
        }

        if !self.options.replace_config {
            self.verify_replace()?;
        }

        self.conf_file_header()?;
        source.content(self)?;
        let edit_key = self.settings.edit_key.clone();
        if !edit_key.is_empty() {
            self.edit_config(&edit_key)?;
        }

        if !self.settings.plugin_handler.is_empty() && self.plugins.has_plugins() {
            self.write(PLUGINS_HEADER)?;
            let lines = self.parse_plugins(&callbacks)?;
            self.write(lines)?;
        }

        source.local_overrides(self)?;

        let handler = PluginDeployment::new(
            &self.plugins,
            &mut self.scripts,
            &self.settings.plugin_handler,
        )
        .deploy_plugin_handler()?;
        self.write(handler)?;
        self.write("")?;

        let block = self.scripts.embedded_block();
        self.write(block)?;

        info!("Wrote {}", self.conf_file.display());
        Ok(Outcome::Written(self.conf_file.clone()))
    }

    // Run the callbacks of used plugins with the gate open, so their side
    // effects are written, then produce the @plugin lines.
    fn parse_plugins(&mut self, callbacks: &[PluginFn<'_>]) -> Result<Vec<String>> {
        let used: Vec<usize> = self.plugins.used().iter().map(|p| p.callback).collect();
        for index in used {
            if let Some(callback) = callbacks.get(index) {
                callback(self)?;
            }
        }
        PluginDeployment::new(&self.plugins, &mut self.scripts, &self.settings.plugin_handler)
            .plugin_lines()
    }

    fn plugin_report(&mut self, callbacks: &[PluginFn<'_>]) -> Result<PluginReport> {
        let level = self.options.plugins_display;
        let mut report = PluginReport::new(level, &self.options.source, &self.plugins)?;
        if level != 3 {
            return Ok(report);
        }

        let used: Vec<(usize, String)> = self
            .plugins
            .used()
            .iter()
            .map(|p| (p.callback, p.settings.clone()))
            .collect();

        self.writer.set_enabled(true);
        for (pos, (index, settings)) in used.into_iter().enumerate() {
            self.writer.start_capture();
            let result = match callbacks.get(index) {
                Some(callback) => callback(self).map(|_| ()),
                None => Ok(()),
            };
            let mut lines = self.writer.finish_capture();
            result?;
            lines.extend(settings.split('\n').map(|l| l.trim().to_string()));
            report.set_output(pos, lines);
        }
        self.writer.set_enabled(false);
        Ok(report)
    }

    fn conf_file_header(&mut self) -> Result<()> {
        self.writer.remove_output()?;
        self.writer.set_enabled(true);
        info!(
            "Writing tmux {} config to {}",
            self.vers.get(),
            self.conf_file.display()
        );

        if self.settings.use_embedded_scripts {
            self.write(indoc! {"
                # : << EMBEDDED-SCRIPTS-STARTING-POINT
                #
                # The above line tells embedded scripts where they start
                # further down in this file"})?;
        }

        self.write(formatdoc! {"
            #
            #  This config was created using {name}
            #
            #      Creation time: {time}
            #          tmux-conf: {lib_version}
            #         Created on: {host}",
            name = env!("CARGO_PKG_NAME"),
            time = chrono::Local::now().format("%y-%m-%d %H:%M:%S"),
            lib_version = env!("CARGO_PKG_VERSION"),
            host = tmux::hostname(),
        })?;
        if self.vers.is_forced() {
            self.write(format!("#     actual version: ({})", self.vers.get_actual()))?;
        }
        self.write(format!("#   For tmux version: {}", self.vers.get()))?;

        self.write(formatdoc! {r#"
            #
            #
            #  Three env variables defining this instance of tmux:
            #

            #
            #  Various tmux instances might be in use, or tmux might not be
            #  in PATH. In shell commands always use $TMUX_BIN, not tmux!
            #
            TMUX_BIN="{bin}"

            #
            #  The config file defining this env. To source it, wherever it
            #  is located, do:
            #    $TMUX_BIN source $TMUX_CONF
            #
            TMUX_CONF="{conf}"

            #
            #  This file is generated and frequently over-written, changes
            #  and comments about what is generated belong in $TMUX_SOURCE
            #
            TMUX_SOURCE="{source}"
            "#,
            bin = self.binary.path,
            conf = self.conf_file.display(),
            source = self.options.source.display(),
        })
    }

    /// Bind `<prefix> key` to edit the description, regenerate the config
    /// and source it.
    ///
    /// Called with the configured key after content was written, content
    /// may call it first to pick another key. Only the first call has any
    /// effect.
    pub fn edit_config(&mut self, edit_key: &str) -> Result<()> {
        if self.edit_config_called {
            return Ok(());
        }
        self.edit_config_called = true;

        self.write(formatdoc! {"

            # ======================================================
            #
            #   Edit config     <prefix>  {edit_key}
            #
            #  tmux might live outside the generic shell path, so the tmux
            #  bin and config file this was generated for are used to
            #  regenerate and source the config.
            #
            # ======================================================
            ",
            edit_key = edit_key,
        })?;

        self.write(format!(
            "bind -N \"Edit local config files\"  {key}  new-window -n \"$TMUX_BIN config\" \
             \"/bin/sh -c '\\${{EDITOR:-vi}} $TMUX_SOURCE && \
             {gen_bin} -r $TMUX_SOURCE $TMUX_CONF && sleep 1 && \
             $TMUX_BIN source $TMUX_CONF && \
             $TMUX_BIN display \\\"$TMUX_CONF sourced\\\"'\"",
            key = edit_key,
            gen_bin = self.options.generator_bin,
        ))?;
        self.write("\n")
    }

    fn verify_replace(&self) -> Result<()> {
        let default_conf = expand_tilde(self.binary.program.default_conf_file());
        let prompt = if self.conf_file == default_conf {
            if self.conf_file.exists() || self.conf_file.is_symlink() {
                "Do you wish to replace the default config file?".to_string()
            } else {
                "Do you wish to create a default config file?".to_string()
            }
        } else if self.conf_file.exists() {
            format!("Do you wish to replace {}?", self.conf_file.display())
        } else {
            return Ok(());
        };

        let confirmed = inquire::Confirm::new(&prompt)
            .with_default(false)
            .prompt()
            .map_err(|e| match e {
                inquire::InquireError::NotTTY | inquire::InquireError::IO(_) => {
                    TmuxConfError::EnvironmentFault(format!(
                        "can't ask for confirmation ({}), use -r to replace",
                        e
                    ))
                }
                _ => TmuxConfError::UserDeclined,
            })?;
        if !confirmed {
            return Err(TmuxConfError::UserDeclined);
        }
        Ok(())
    }

    /// Write `cmd` to the config, see [`ConfigWriter::write_eol`].
    pub fn write(&mut self, cmd: impl Into<Cmd>) -> Result<()> {
        self.writer.write(cmd)
    }

    /// Write `cmd`, ending each line with `eol`.
    pub fn write_eol(&mut self, cmd: impl Into<Cmd>, eol: &str) -> Result<()> {
        self.writer.write_eol(cmd, eol)
    }

    /// Whether the effective version is at least `vers`.
    pub fn vers_ok(&self, vers: impl Into<VersionInput>) -> Result<bool> {
        self.vers.is_at_least(vers)
    }

    /// The version checker for this run.
    pub fn vers(&self) -> &VersionCheck {
        &self.vers
    }

    /// The plugin registry, populated once plugins are scanned.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Script handling, for defining scripts and invoking them.
    pub fn scripts_mut(&mut self) -> &mut EmbeddedScripts {
        &mut self.scripts
    }

    /// Whether the host was marked as slow.
    pub fn is_limited_host(&self) -> bool {
        self.settings.is_limited_host
    }

    /// Whether the config is generated for tmate.
    pub fn is_tmate(&self) -> bool {
        self.binary.program == Program::Tmate
    }

    /// Settings in effect, after tmate and version adjustments.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Full path of the config file.
    pub fn conf_file(&self) -> &Path {
        &self.conf_file
    }

    /// The binary the config is generated for.
    pub fn binary(&self) -> &TmuxBinary {
        &self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PluginDecl;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    struct Basic;

    impl ConfigSource for Basic {
        fn content(&self, cfg: &mut TmuxConfig) -> Result<()> {
            cfg.write("set -g mouse on")?;
            if cfg.vers_ok(3.1)? {
                cfg.write("bind -N 'Split' - split-window -v")?;
            }
            Ok(())
        }
    }

    struct WithPlugins;

    impl ConfigSource for WithPlugins {
        fn content(&self, cfg: &mut TmuxConfig) -> Result<()> {
            cfg.write("set -g base-index 1")
        }

        fn plugins(&self) -> Vec<PluginFn<'_>> {
            let mut callbacks: Vec<PluginFn<'_>> = Vec::new();
            callbacks.push(Box::new(|cfg: &mut TmuxConfig| -> Result<PluginDecl> {
                cfg.write("set -g @menus_trigger Space")?;
                Ok(PluginDecl::new("jaclu/tmux-menus", 3.0, ""))
            }));
            callbacks.push(Box::new(|cfg: &mut TmuxConfig| -> Result<PluginDecl> {
                cfg.write("set -g status-right '#{prefix_highlight}'")?;
                Ok(PluginDecl::new(
                    "tmux-plugins/tmux-prefix-highlight",
                    2.4,
                    "set -g @prefix_highlight_show_copy_mode  on",
                ))
            }));
            callbacks
        }
    }

    fn options(dir: &Path) -> Options {
        Options {
            conf_file: dir.join("tmux/tmux.conf").display().to_string(),
            replace_config: true,
            source: PathBuf::from("/src/tmux-conf.toml"),
            ..Options::default()
        }
    }

    fn generate(source: &dyn ConfigSource, options: Options, vers: &str) -> String {
        let binary = TmuxBinary::new("/usr/bin/tmux", vers);
        let mut cfg = TmuxConfig::with_binary(options, Settings::default(), binary).unwrap();
        match cfg.run(source).unwrap() {
            Outcome::Written(path) => std::fs::read_to_string(path).unwrap(),
            Outcome::Report(_) => panic!("unexpected report"),
        }
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_generate_basic() {
        let dir = tempfile::tempdir().unwrap();
        let conf = generate(&Basic, options(dir.path()), "3.4");
        let lines: Vec<&str> = conf.lines().collect();

        assert_eq!(lines[0], "# : << EMBEDDED-SCRIPTS-STARTING-POINT");
        assert!(conf.contains("#   For tmux version: 3.4\n"));
        assert!(!conf.contains("actual version"));
        assert!(conf.contains("TMUX_BIN=\"/usr/bin/tmux\"\n"));
        assert!(conf.contains(&format!(
            "TMUX_CONF=\"{}\"\n",
            dir.path().join("tmux/tmux.conf").display()
        )));
        assert!(conf.contains("TMUX_SOURCE=\"/src/tmux-conf.toml\"\n"));
        assert!(conf.contains("set -g mouse on\nbind -N 'Split' - split-window -v\n"));
        assert!(conf.contains("#   Edit config     <prefix>  e\n"));
        assert!(conf.contains(
            "bind -N \"Edit local config files\"  e  new-window -n \"$TMUX_BIN config\" \
             \"/bin/sh -c '\\${EDITOR:-vi} $TMUX_SOURCE && tmux-conf -r $TMUX_SOURCE $TMUX_CONF \
             && sleep 1 && $TMUX_BIN source $TMUX_CONF && \
             $TMUX_BIN display \\\"$TMUX_CONF sourced\\\"'\"\n"
        ));
        assert!(conf.contains("#   Local overrides\n"));
        assert!(!conf.contains("Plugins"));
        assert!(!conf.contains("# EMBEDDED-SCRIPTS-STARTING-POINT"));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_generate_forced_old_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.forced_version = Some("2.8".to_string());
        let conf = generate(&Basic, opts, "3.4");

        assert!(conf.contains("#     actual version: (3.4)\n#   For tmux version: 2.8\n"));
        assert!(!conf.contains("Split"));
        assert!(conf.contains("# -N Edit local config files\nbind  e  new-window"));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_generate_with_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let conf = generate(&WithPlugins, options(dir.path()), "2.4");

        let plugins_at = conf.find("#   Plugins\n").unwrap();
        let overrides_at = conf.find("#   Local overrides\n").unwrap();
        let tpm_at = conf.find("#   Tmux Plugin Manager\n").unwrap();
        let scripts_at = conf.find("# EMBEDDED-SCRIPTS-STARTING-POINT\n").unwrap();
        assert!(plugins_at < overrides_at && overrides_at < tpm_at && tpm_at < scripts_at);

        // Only the used plugin gets to write, and only once.
        assert_eq!(conf.matches("#{prefix_highlight}").count(), 1);
        assert!(!conf.contains("@menus_trigger"));
        assert!(!conf.contains("jaclu/tmux-menus"));
        assert!(conf.contains(
            "set -g @plugin \"tmux-plugins/tmux-prefix-highlight\"\n\
             set -g @prefix_highlight_show_copy_mode  on\n"
        ));
        assert!(conf.contains("| sh -s activate_tpm\"\n"));
        assert!(conf.ends_with("# \"$@\" #  This triggers the embedded script\n"));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_old_tmux_uses_manual_handler() {
        let dir = tempfile::tempdir().unwrap();
        let binary = TmuxBinary::new("/usr/bin/tmux", "1.8");
        let cfg = TmuxConfig::with_binary(options(dir.path()), Settings::default(), binary).unwrap();
        assert_eq!(cfg.settings().plugin_handler, MANUAL_HANDLER);
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_tmate_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let binary = TmuxBinary::new("/usr/bin/tmate", "2.4.0");
        let cfg = TmuxConfig::with_binary(options(dir.path()), Settings::default(), binary).unwrap();
        assert!(cfg.is_tmate());
        assert_eq!(cfg.settings().plugin_handler, MANUAL_HANDLER);
        assert_eq!(cfg.vers().get().to_string(), "2.4");
    }

    #[test]
    fn test_apply_tmate_defaults_default_conf() {
        let mut options = Options::default();
        let mut settings = Settings::default();
        apply_tmate_defaults(Program::Tmate, &mut options, &mut settings);
        assert_eq!(options.conf_file, "~/.tmate.conf");
        assert!(options.replace_config);
        assert_eq!(options.forced_version.as_deref(), Some("2.4"));

        let mut options = Options::default();
        let mut settings = Settings {
            plugin_handler: String::new(),
            ..Settings::default()
        };
        apply_tmate_defaults(Program::Tmux, &mut options, &mut settings);
        assert_eq!(options, Options::default());
        apply_tmate_defaults(Program::Tmate, &mut options, &mut settings);
        assert!(settings.plugin_handler.is_empty());
    }

    #[test]
    fn test_new_without_binary_leaves_conf_dir_alone() {
        let dir = tempfile::tempdir().unwrap();
        let opts = Options {
            tmux_bin: "no-such-tmux-binary-here".to_string(),
            ..options(dir.path())
        };
        assert!(matches!(
            TmuxConfig::new(opts, Settings::default()),
            Err(TmuxConfError::NotTmux(_))
        ));
        assert!(!dir.path().join("tmux").exists());
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_edit_config_called_from_content() {
        struct OwnKey;
        impl ConfigSource for OwnKey {
            fn content(&self, cfg: &mut TmuxConfig) -> Result<()> {
                cfg.write("set -g mouse on")?;
                cfg.edit_config("E")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let conf = generate(&OwnKey, options(dir.path()), "3.4");
        assert_eq!(conf.matches("Edit local config files").count(), 1);
        assert!(conf.contains("#   Edit config     <prefix>  E\n"));
        assert!(conf.contains("bind -N \"Edit local config files\"  E  new-window"));
        assert!(!conf.contains("<prefix>  e\n"));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_duplicate_plugin_aborts_before_writing() {
        struct Dup;
        impl ConfigSource for Dup {
            fn content(&self, _cfg: &mut TmuxConfig) -> Result<()> {
                Ok(())
            }
            fn plugins(&self) -> Vec<PluginFn<'_>> {
                let mut callbacks: Vec<PluginFn<'_>> = Vec::new();
                for _ in 0..2 {
                    callbacks.push(Box::new(|_: &mut TmuxConfig| -> Result<PluginDecl> {
                        Ok(PluginDecl::new("a/x", 1.5, ""))
                    }));
                }
                callbacks
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        let conf = PathBuf::from(&opts.conf_file);
        let binary = TmuxBinary::new("/usr/bin/tmux", "3.4");
        let mut cfg = TmuxConfig::with_binary(opts, Settings::default(), binary).unwrap();
        assert!(matches!(cfg.run(&Dup), Err(TmuxConfError::DuplicatePlugin(_))));
        assert!(!conf.exists());
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_report_leaves_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.plugins_display = 3;
        let conf = PathBuf::from(&opts.conf_file);
        std::fs::create_dir_all(conf.parent().unwrap()).unwrap();
        std::fs::write(&conf, "old\n").unwrap();

        let binary = TmuxBinary::new("/usr/bin/tmux", "2.4");
        let mut cfg = TmuxConfig::with_binary(opts, Settings::default(), binary).unwrap();
        let report = match cfg.run(&WithPlugins).unwrap() {
            Outcome::Report(report) => report,
            Outcome::Written(_) => panic!("expected a report"),
        };

        assert_eq!(std::fs::read_to_string(&conf).unwrap(), "old\n");
        assert_eq!(
            report.used()[0].output,
            vec![
                "set -g status-right '#{prefix_highlight}'",
                "set -g @prefix_highlight_show_copy_mode  on",
            ]
        );
    }
}
