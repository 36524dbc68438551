//! Description file format.
//!
//! A description is a TOML file listing what the generated config should
//! contain. Reserved top-level keys are `settings`, `content`, `script`,
//! `plugin` and `local_override`; anything else is rejected.
//!
//! # Format
//!
//! ```toml
//! [settings]
//! plugin_handler = "tmux-plugins/tpm"   # "manual", or "" for no plugins
//! edit_key = "e"
//!
//! [[content]]
//! cmd = ["set -g mouse on", "set -g base-index 1"]
//!
//! [[content]]
//! min_version = 3.1
//! cmd = "bind -N 'Split' - split-window -v"
//! fallback = "bind - split-window -v"
//!
//! [[script]]
//! name = "hello"
//! body = """
//! hello() {
//!     $TMUX_BIN display "Hello"
//! }
//! """
//!
//! [[content]]
//! cmd = "bind H {run:hello}"
//!
//! [[plugin]]
//! name = "tmux-plugins/tmux-yank"
//! min_version = 1.5
//! settings = "set -g @yank_selection 'clipboard'"
//!
//! [[plugin]]
//! name = "jaclu/tmux-menus"
//! min_version = "3.0"
//! content = [{ cmd = "set -g @menus_trigger Space" }]
//! ```
//!
//! Block lines may use the placeholders described in
//! [`interpolate`](crate::interpolate).

use crate::error::Result;
use crate::generator::{ConfigSource, LOCAL_OVERRIDES_HEADER, Settings, TmuxConfig};
use crate::interpolate::{Placeholder, interpolate};
use crate::plugins::{PluginDecl, PluginFn, name_sans_prefix};
use crate::version::VersionInput;
use serde::Deserialize;
use serde::de::Error as _;

/// Command field that accepts either a single string or array of strings.
///
/// This allows flexible description syntax:
/// ```toml
/// cmd = "single command"
/// # or
/// cmd = ["command 1", "command 2"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cmd {
    /// A single line, possibly containing newlines.
    Single(String),
    /// Multiple lines written in sequence.
    Multiple(Vec<String>),
}

impl Cmd {
    /// Convert to a `Vec<String>`, normalizing both variants.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Cmd::Single(s) => vec![s.clone()],
            Cmd::Multiple(v) => v.clone(),
        }
    }
}

impl From<&str> for Cmd {
    fn from(s: &str) -> Self {
        Cmd::Single(s.to_string())
    }
}

impl From<String> for Cmd {
    fn from(s: String) -> Self {
        Cmd::Single(s)
    }
}

impl From<&String> for Cmd {
    fn from(s: &String) -> Self {
        Cmd::Single(s.clone())
    }
}

impl From<Vec<String>> for Cmd {
    fn from(v: Vec<String>) -> Self {
        Cmd::Multiple(v)
    }
}

impl From<Vec<&str>> for Cmd {
    fn from(v: Vec<&str>) -> Self {
        Cmd::Multiple(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&Cmd> for Cmd {
    fn from(c: &Cmd) -> Self {
        c.clone()
    }
}

/// Overrides for the default [`Settings`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsDef {
    /// `manual`, a plugin manager repo, or empty for no plugins.
    pub plugin_handler: Option<String>,
    /// Keep `bind -N` notes as comments on older tmux.
    pub use_notes_as_comments: Option<bool>,
    /// Store scripts inside the config.
    pub use_embedded_scripts: Option<bool>,
    /// Mark this host as slow.
    pub is_limited_host: Option<bool>,
    /// Key for the edit-config binding, empty for none.
    pub edit_key: Option<String>,
}

/// A group of lines, optionally written only under some condition.
///
/// # Example
///
/// ```toml
/// [[content]]
/// min_version = 2.9
/// cmd = "set -g pane-border-lines heavy"
/// fallback = "# pane-border-lines needs 2.9"
/// skip_on_limited_host = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Lines to write.
    pub cmd: Cmd,
    /// Only write `cmd` for this tmux version or newer.
    #[serde(default)]
    pub min_version: Option<VersionInput>,
    /// Written instead of `cmd` when `min_version` is not met.
    #[serde(default)]
    pub fallback: Option<Cmd>,
    /// Only write this block if the plugin is used (short name is enough).
    #[serde(default)]
    pub if_plugin: Option<String>,
    /// Skip this block on hosts marked as limited.
    #[serde(default)]
    pub skip_on_limited_host: bool,
}

/// A user-defined shell script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDef {
    /// Script name, the body must define a function of this name.
    pub name: String,
    /// Script body.
    pub body: Cmd,
    /// Run with bash instead of `/bin/sh`.
    #[serde(default)]
    pub bash: bool,
}

/// A plugin declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginDef {
    /// `provider/name` identifier.
    pub name: String,
    /// Oldest supported version, `-1` to never use it.
    pub min_version: VersionInput,
    /// Written after the plugin's `@plugin` line.
    #[serde(default)]
    pub settings: String,
    /// Written before the plugin section, only if the plugin is used.
    #[serde(default)]
    pub content: Vec<Block>,
    /// Never use this plugin on hosts marked as limited.
    #[serde(default)]
    pub skip_on_limited_host: bool,
}

/// A parsed description file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    /// Settings overrides.
    pub settings: SettingsDef,
    /// Main content, in order.
    pub content: Vec<Block>,
    /// User-defined scripts.
    pub scripts: Vec<ScriptDef>,
    /// Plugins, in declaration order.
    pub plugins: Vec<PluginDef>,
    /// Written after everything else, before the plugin handler runs.
    pub local_overrides: Vec<Block>,
}

impl Description {
    /// Parse a description from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `toml::de::Error` if the TOML is malformed, doesn't match the
    /// expected structure, or has unknown top-level keys.
    pub fn from_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(toml_str)?;

        let mut description = Description::default();

        for (key, value) in table {
            match key.as_str() {
                "settings" => {
                    description.settings = value.try_into()?;
                }
                "content" => {
                    description.content = value.try_into()?;
                }
                "script" => {
                    description.scripts = value.try_into()?;
                }
                "plugin" => {
                    description.plugins = value.try_into()?;
                }
                "local_override" => {
                    description.local_overrides = value.try_into()?;
                }
                _ => {
                    return Err(toml::de::Error::custom(format!(
                        "unknown section `{}`",
                        key
                    )));
                }
            }
        }

        Ok(description)
    }

    /// The default settings with this description's overrides applied.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        let def = &self.settings;
        if let Some(handler) = &def.plugin_handler {
            settings.plugin_handler = handler.clone();
        }
        if let Some(v) = def.use_notes_as_comments {
            settings.use_notes_as_comments = v;
        }
        if let Some(v) = def.use_embedded_scripts {
            settings.use_embedded_scripts = v;
        }
        if let Some(v) = def.is_limited_host {
            settings.is_limited_host = v;
        }
        if let Some(key) = &def.edit_key {
            settings.edit_key = key.clone();
        }
        settings
    }
}

/// Expand the placeholders in one line.
pub fn expand_line(line: &str, cfg: &mut TmuxConfig) -> Result<String> {
    interpolate(line, |p| match p {
        Placeholder::Run(name) => cfg.scripts_mut().run_it(name, false),
        Placeholder::RunBg(name) => cfg.scripts_mut().run_it(name, true),
        Placeholder::Script(name) => cfg.scripts_mut().script_ref(name),
        Placeholder::PluginDir => Ok(cfg.plugins().plugin_dir().display().to_string()),
        Placeholder::Vers => Ok(cfg.vers().get().to_string()),
    })
}

impl Block {
    /// Write this block, if its conditions are met.
    pub fn render(&self, cfg: &mut TmuxConfig) -> Result<()> {
        if self.skip_on_limited_host && cfg.is_limited_host() {
            return Ok(());
        }
        if let Some(plugin) = &self.if_plugin {
            let wanted = name_sans_prefix(plugin);
            if !cfg.plugins().installed(true).iter().any(|p| p == wanted) {
                return Ok(());
            }
        }

        let cmd = match &self.min_version {
            Some(vers) if !cfg.vers_ok(vers)? => match &self.fallback {
                Some(fallback) => fallback,
                None => return Ok(()),
            },
            _ => &self.cmd,
        };

        for line in cmd.to_vec() {
            let line = expand_line(&line, cfg)?;
            cfg.write(line)?;
        }
        Ok(())
    }
}

fn render_all(blocks: &[Block], cfg: &mut TmuxConfig) -> Result<()> {
    blocks.iter().try_for_each(|block| block.render(cfg))
}

impl ConfigSource for Description {
    fn content(&self, cfg: &mut TmuxConfig) -> Result<()> {
        for script in &self.scripts {
            cfg.scripts_mut()
                .create(&script.name, script.body.to_vec(), script.bash, false)?;
        }
        render_all(&self.content, cfg)
    }

    fn local_overrides(&self, cfg: &mut TmuxConfig) -> Result<()> {
        cfg.write(LOCAL_OVERRIDES_HEADER)?;
        render_all(&self.local_overrides, cfg)
    }

    fn plugins(&self) -> Vec<PluginFn<'_>> {
        self.plugins.iter().map(plugin_fn).collect()
    }
}

// Plugins skipped on limited hosts are declared with the -1 sentinel.
fn plugin_fn(plugin: &PluginDef) -> PluginFn<'_> {
    Box::new(move |cfg: &mut TmuxConfig| -> Result<PluginDecl> {
        let min_version = if plugin.skip_on_limited_host && cfg.is_limited_host() {
            VersionInput::Int(-1)
        } else {
            plugin.min_version.clone()
        };
        render_all(&plugin.content, cfg)?;
        Ok(PluginDecl::new(&plugin.name, min_version, &plugin.settings))
    })
}
