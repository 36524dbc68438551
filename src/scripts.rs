//! Helper shell scripts referenced from the generated config.
//!
//! Scripts are emitted in one of two ways, selected once per run:
//!
//! - **Embedded**: the script is stored as commented-out lines at the end of
//!   the config itself. The config's first line is `# : << EMBEDDED-...`, so
//!   `cut -c3- tmux.conf` turns the whole file into a shell script that skips
//!   the tmux commands via a here-document, defines every embedded function,
//!   and finally runs the one named by its first argument.
//! - **External**: the script is written to `<scripts-dir>/<name>.sh` and
//!   run directly.
//!
//! [`EmbeddedScripts`] is the entry point. It combines the
//! [`ScriptRegistry`], which lets user scripts override built-in ones, with
//! the [`ScriptEmitter`], which does the actual emission.

use crate::error::{Result, TmuxConfError};
use crate::loader::{expand_tilde, tilde_path, xdg_config_home};
use crate::tmux::{Program, command_path};
use crate::version::VersionCheck;
use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker separating tmux commands from the embedded scripts.
pub const EMBEDDED_MARKER: &str = "EMBEDDED-SCRIPTS-STARTING-POINT";

/// Plugin handler value selecting manual plugin handling.
pub const MANUAL_HANDLER: &str = "manual";

/// A named shell script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSpec {
    /// Script name, also the name of the shell function it defines.
    pub name: String,
    /// Script lines, entries may contain multiple lines.
    pub lines: Vec<String>,
    /// Run with bash instead of `/bin/sh`.
    pub use_bash: bool,
    /// Provided by this crate rather than the user's description.
    pub built_in: bool,
}

impl ScriptSpec {
    /// A user-defined POSIX sh script.
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        ScriptSpec {
            name: name.into(),
            lines,
            use_bash: false,
            built_in: false,
        }
    }

    /// Run this script with bash.
    pub fn bash(mut self, use_bash: bool) -> Self {
        self.use_bash = use_bash;
        self
    }

    /// Mark this script as built-in.
    pub fn built_in(mut self, built_in: bool) -> Self {
        self.built_in = built_in;
        self
    }
}

/// Decides which script definitions are emitted.
///
/// User-defined scripts are always accepted. A built-in script is only
/// accepted the first time its name is seen, and never if a user script of
/// the same name was registered before it.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    defined: HashSet<String>,
    built_in_accepted: HashSet<String>,
}

impl ScriptRegistry {
    /// Register a script, returning whether it should be emitted.
    pub fn accept(&mut self, spec: &ScriptSpec) -> bool {
        if !spec.built_in {
            self.defined.insert(spec.name.clone());
            return true;
        }

        if self.defined.contains(&spec.name) {
            return false;
        }

        self.built_in_accepted.insert(spec.name.clone())
    }
}

/// Settings shared by everything that emits or references scripts.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// Full path of the config file being generated.
    pub conf_file: PathBuf,
    /// Store scripts inside the config instead of as separate files.
    pub use_embedded: bool,
    /// Plugin handler in use, see [`MANUAL_HANDLER`].
    pub plugin_handler: String,
    /// Program the config is generated for.
    pub program: Program,
    /// Version checker for the run.
    pub vers: VersionCheck,
}

/// Writes scripts and builds the commands that run them.
#[derive(Debug)]
pub struct ScriptEmitter {
    cfg: ScriptConfig,
    embedded_text: Vec<String>,
    bash_scripts: HashSet<String>,
    cached_bash: Option<String>,
}

impl ScriptEmitter {
    /// Create an emitter with an empty embedded buffer.
    pub fn new(cfg: ScriptConfig) -> Self {
        ScriptEmitter {
            cfg,
            embedded_text: Vec::new(),
            bash_scripts: HashSet::new(),
            cached_bash: None,
        }
    }

    /// The settings this emitter was created with.
    pub fn config(&self) -> &ScriptConfig {
        &self.cfg
    }

    /// Emit a script, either into the embedded buffer or as a file.
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::EnvironmentFault`] if an external script
    /// can't be written.
    pub fn emit(&mut self, spec: &ScriptSpec) -> Result<()> {
        if spec.use_bash {
            self.bash_scripts.insert(spec.name.clone());
        } else {
            self.bash_scripts.remove(&spec.name);
        }

        if self.cfg.use_embedded {
            self.emit_embedded(spec);
            Ok(())
        } else {
            self.emit_external(spec)
        }
    }

    fn emit_embedded(&mut self, spec: &ScriptSpec) {
        for line in &spec.lines {
            for part in line.split('\n') {
                self.embedded_text.push(format!("# {}", part));
            }
        }
        self.embedded_text.push(String::new());
    }

    fn emit_external(&self, spec: &ScriptSpec) -> Result<()> {
        let script_dir = self.script_dir()?;
        std::fs::create_dir_all(&script_dir).map_err(|e| {
            TmuxConfError::EnvironmentFault(format!(
                "failed to create {}: {}",
                script_dir.display(),
                e
            ))
        })?;

        let shebang = if spec.use_bash {
            "#!/usr/bin/env bash"
        } else {
            "#!/bin/sh"
        };

        let mut text = String::new();
        text.push_str(shebang);
        text.push('\n');
        for line in &spec.lines {
            text.push_str(line.trim_end_matches('\n'));
            text.push('\n');
        }
        text.push_str(&format!("{} \"$@\"\n", spec.name));

        let path = script_dir.join(format!("{}.sh", spec.name));
        std::fs::write(&path, text).map_err(|e| {
            TmuxConfError::EnvironmentFault(format!("could not write to {}: {}", path.display(), e))
        })?;

        make_executable(&path)?;

        debug!(script = %path.display(), "wrote external script");
        Ok(())
    }

    /// Build the `run-shell` command that runs the named script.
    ///
    /// `-b` is only used if requested and supported (tmux 1.8+).
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::EnvironmentFault`] if the script needs bash
    /// and none can be found.
    pub fn run_invocation(&mut self, name: &str, in_bg: bool) -> Result<String> {
        let mut cmd = String::from("run-shell ");
        if in_bg && self.cfg.vers.is_at_least("1.8")? {
            cmd.push_str("-b ");
        }
        cmd.push('"');

        if self.cfg.use_embedded {
            let shell = if self.bash_scripts.contains(name) {
                self.ensure_bash()?
            } else {
                "sh".to_string()
            };
            cmd.push_str(&format!(
                "cut -c3- '{}' | {} -s {}",
                self.cfg.conf_file.display(),
                shell,
                name
            ));
        } else {
            cmd.push_str(&self.external_path(name)?.display().to_string());
        }

        cmd.push('"');
        Ok(cmd)
    }

    fn ensure_bash(&mut self) -> Result<String> {
        if let Some(bash) = &self.cached_bash {
            return Ok(bash.clone());
        }
        let bash = command_path("bash")
            .ok_or_else(|| TmuxConfError::EnvironmentFault("Failed to find bash!".into()))?
            .display()
            .to_string();
        self.cached_bash = Some(bash.clone());
        Ok(bash)
    }

    /// Path of the external script file for `name`.
    pub fn external_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.script_dir()?.join(format!("{}.sh", name)))
    }

    /// Directory external scripts are written to.
    ///
    /// The default config locations use a fixed sibling directory
    /// (`~/.tmux/scripts`, `~/.tmate/scripts`). Any other location uses
    /// `<base>/<program>/scripts`, where base is `$XDG_CONFIG_HOME` or the
    /// directory above the one holding the config file.
    ///
    /// # Errors
    ///
    /// Returns [`TmuxConfError::StateError`] in embedded mode, which has no
    /// script directory.
    pub fn script_dir(&self) -> Result<PathBuf> {
        if self.cfg.use_embedded {
            return Err(TmuxConfError::StateError(
                "Embedded mode has no script directory".into(),
            ));
        }

        match tilde_path(&self.cfg.conf_file).as_str() {
            "~/.tmux.conf" => return Ok(expand_tilde("~/.tmux/scripts")),
            "~/.tmate.conf" => return Ok(expand_tilde("~/.tmate/scripts")),
            _ => {}
        }

        let base = xdg_config_home().unwrap_or_else(|| {
            self.cfg
                .conf_file
                .parent()
                .and_then(|dir| dir.parent())
                .map(|dir| dir.to_path_buf())
                .unwrap_or_default()
        });
        Ok(base.join(self.cfg.program.name()).join("scripts"))
    }

    /// The trailing block holding all embedded scripts.
    ///
    /// Empty unless embedded mode is used and at least one script was emitted.
    pub fn embedded_block(&self) -> Vec<String> {
        if !(self.cfg.use_embedded && !self.embedded_text.is_empty()) {
            return Vec::new();
        }

        let mut out = vec![
            String::new(),
            "#======================================================".to_string(),
            "#".to_string(),
            format!("# {}", EMBEDDED_MARKER),
            "#".to_string(),
        ];
        out.extend(self.embedded_text.iter().cloned());
        out.push("# \"$@\" #  This triggers the embedded script".to_string());
        out
    }
}

// Sets the execute bits for owner, group and other.
fn make_executable(path: &Path) -> Result<()> {
    let not_executable = |e: std::io::Error| {
        TmuxConfError::EnvironmentFault(format!(
            "could not make {} executable: {}",
            path.display(),
            e
        ))
    };
    let mut permissions = std::fs::metadata(path).map_err(not_executable)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).map_err(not_executable)
}

/// Script handling for one generation run.
#[derive(Debug)]
pub struct EmbeddedScripts {
    registry: ScriptRegistry,
    emitter: ScriptEmitter,
}

impl EmbeddedScripts {
    /// Create script handling for the given settings.
    pub fn new(cfg: ScriptConfig) -> Self {
        EmbeddedScripts {
            registry: ScriptRegistry::default(),
            emitter: ScriptEmitter::new(cfg),
        }
    }

    /// Whether scripts are embedded in the config.
    pub fn is_embedded(&self) -> bool {
        self.emitter.config().use_embedded
    }

    /// Define a script.
    ///
    /// When embedded scripts are combined with the manual plugin handler,
    /// every script is run with bash: they all share one file, and the
    /// manual handler uses bashisms `/bin/sh` may reject.
    ///
    /// Returns whether the script was accepted, see [`ScriptRegistry`].
    pub fn create(
        &mut self,
        name: &str,
        lines: Vec<String>,
        use_bash: bool,
        built_in: bool,
    ) -> Result<bool> {
        let cfg = self.emitter.config();
        let use_bash = use_bash || (cfg.use_embedded && cfg.plugin_handler == MANUAL_HANDLER);

        let spec = ScriptSpec::new(name, lines)
            .bash(use_bash)
            .built_in(built_in);
        self.register(spec)
    }

    /// Register and emit a prepared script spec.
    pub fn register(&mut self, spec: ScriptSpec) -> Result<bool> {
        if !self.registry.accept(&spec) {
            debug!(script = %spec.name, "script already defined, skipped");
            return Ok(false);
        }
        self.emitter.emit(&spec)?;
        Ok(true)
    }

    /// The `run-shell` command running the named script.
    pub fn run_it(&mut self, name: &str, in_bg: bool) -> Result<String> {
        self.emitter.run_invocation(name, in_bg)
    }

    /// How one script refers to another.
    ///
    /// Embedded scripts are functions in the same file, so the bare name is
    /// used; external scripts are referred to by path.
    pub fn script_ref(&self, name: &str) -> Result<String> {
        if self.is_embedded() {
            Ok(name.to_string())
        } else {
            Ok(self.emitter.external_path(name)?.display().to_string())
        }
    }

    /// Directory external scripts are written to.
    pub fn script_dir(&self) -> Result<PathBuf> {
        self.emitter.script_dir()
    }

    /// The trailing embedded script block, to be written last.
    pub fn embedded_block(&self) -> Vec<String> {
        self.emitter.embedded_block()
    }
}
