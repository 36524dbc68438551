//! Plugin declarations and plugin handler deployment.
//!
//! Plugins are declared with `set -g @plugin "provider/name"` and activated
//! by a generated script, run in the background as tmux starts. Two handlers
//! are supported:
//!
//! - **Plugin manager** (any handler value other than `manual`, e.g.
//!   `tmux-plugins/tpm`): the manager is cloned on first use and asked to
//!   install all plugins; later starts just run it.
//! - **Manual** (`manual`): every declared plugin is cloned if missing, and
//!   its `*.tmux` init script is run directly.
//!
//! An empty handler disables plugins entirely.

use crate::error::Result;
use crate::plugins::PluginRegistry;
use crate::scripts::{EmbeddedScripts, MANUAL_HANDLER};
use indoc::formatdoc;

/// Function name of the plugin manager activation script.
pub const FNC_ACTIVATE_TPM: &str = "activate_tpm";

/// Function name of the manual activation script.
pub const FNC_ACTIVATE_MANUALLY: &str = "activate_plugins_manually";

/// Plugin init scripts are found by this filename suffix.
pub const PLUGIN_INIT_SUFFIX: &str = "tmux";

/// Where plugins and plugin managers are cloned from.
pub const PLUGIN_FORGE: &str = "https://github.com";

fn section_header(title: &str) -> Vec<String> {
    vec![
        String::new(),
        "#======================================================".to_string(),
        "#".to_string(),
        format!("#   {}", title),
        "#".to_string(),
        "#======================================================".to_string(),
        String::new(),
    ]
}

/// Generates plugin related config lines and activation scripts.
pub struct PluginDeployment<'a> {
    registry: &'a PluginRegistry,
    scripts: &'a mut EmbeddedScripts,
    plugin_handler: &'a str,
}

impl<'a> PluginDeployment<'a> {
    /// Deployment for the plugins in `registry`, using `plugin_handler`.
    pub fn new(
        registry: &'a PluginRegistry,
        scripts: &'a mut EmbeddedScripts,
        plugin_handler: &'a str,
    ) -> Self {
        PluginDeployment {
            registry,
            scripts,
            plugin_handler,
        }
    }

    /// `@plugin` declarations and static settings for all used plugins.
    ///
    /// Before tmux 1.8, `@variables` make tmux hang while parsing the
    /// config, so each plugin only gets a comment there.
    pub fn plugin_lines(&self) -> Result<Vec<String>> {
        let mut output = Vec::new();
        if !self.registry.has_plugins() {
            return Ok(output);
        }

        let supports_vars = self.registry.version_checker().is_at_least("1.8")?;
        for plugin in self.registry.used() {
            output.push("#------------------------------".to_string());
            if supports_vars {
                output.push(format!("set -g @plugin \"{}\"", plugin.name));
                output.extend(plugin.settings.split('\n').map(|l| l.trim().to_string()));
            } else {
                output.push(format!("# plugin: {}", plugin.name));
                output.push("# in versions < 1.8 @variables can not be used".to_string());
                output.push(String::new());
            }
        }
        Ok(output)
    }

    /// The plugin handler section, ending with the command that runs it.
    ///
    /// Empty if no plugins are used or plugins are disabled.
    pub fn deploy_plugin_handler(&mut self) -> Result<Vec<String>> {
        if !self.registry.has_plugins() || self.plugin_handler.is_empty() {
            return Ok(Vec::new());
        }

        let (mut output, fnc) = if self.plugin_handler == MANUAL_HANDLER {
            (self.mkscript_manual_deploy()?, FNC_ACTIVATE_MANUALLY)
        } else {
            (self.mkscript_tpm_deploy()?, FNC_ACTIVATE_TPM)
        };
        output.push(self.scripts.run_it(fnc, true)?);
        Ok(output)
    }

    /// Define the manual activation script, returning its section header.
    ///
    /// The script clones every missing plugin and runs its init script.
    pub fn mkscript_manual_deploy(&mut self) -> Result<Vec<String>> {
        let output = section_header("Manual Plugin Handling");
        let (plugins_dir, _) = self.registry.env();
        let plugins_dir = plugins_dir.display().to_string();
        let plugins: String = self
            .registry
            .installed(false)
            .iter()
            .map(|name| format!(" {}", name))
            .collect();
        let progress = if self.registry.is_limited_host() {
            "    $TMUX_BIN display \"Initializing plugins...\"\n"
        } else {
            ""
        };

        let script = formatdoc!(
            r#"
            #
            #  Manual plugin handler, plugins are not scanned for.
            #  The list below is regenerated with the config.
            #
            {fnc}() {{
                mkdir -p "{dir}"
            {progress}
                plugins=({plugins} )
                for plugin in "${{plugins[@]}}"; do
                    name="$(echo "$plugin" | cut -d / -f2)"
                    if [[ ! -d "{dir}/$name" ]]; then
                        $TMUX_BIN display "cloning  $name"
                        git clone "{forge}/$plugin" "{dir}/$name"
                    fi
                    #  plugin folders might be symlinks, find init in the real one
                    d_plugin_folder="$(realpath "{dir}/$name")"
                    init_script="$(find "$d_plugin_folder" -maxdepth 1 | grep {suffix}$ | head -n 1)"
                    if [[ -n "$init_script" ]]; then
                        $TMUX_BIN display "running: $init_script"
                        $init_script || $TMUX_BIN display "ERROR in $init_script"
                    else
                        $TMUX_BIN display "Could not find init for plugin: $name"
                        sleep 2
                    fi
                done
                $TMUX_BIN display "Plugins initialized!"
            }}"#,
            fnc = FNC_ACTIVATE_MANUALLY,
            dir = plugins_dir,
            progress = progress,
            plugins = plugins,
            forge = PLUGIN_FORGE,
            suffix = PLUGIN_INIT_SUFFIX,
        );

        self.scripts
            .create(FNC_ACTIVATE_MANUALLY, vec![script], true, true)?;
        Ok(output)
    }

    /// Define the plugin manager activation script, returning its section header.
    ///
    /// An installed manager is just run. Otherwise it is cloned, run, and
    /// asked to install all plugins. Exit codes: 11 clone failed, 12 running
    /// the manager or its installer failed.
    pub fn mkscript_tpm_deploy(&mut self) -> Result<Vec<String>> {
        let output = section_header("Tmux Plugin Manager");
        let (plugins_dir, tpm_env) = self.registry.env();
        let tpm_location = plugins_dir.join("tpm");
        let tpm_app = tpm_location.join("tpm");
        let progress = if self.registry.is_limited_host() {
            "        $TMUX_BIN display \"Initializing plugins...\"\n"
        } else {
            ""
        };

        let script = formatdoc!(
            r#"
            {fnc}() {{
                #
                #  Run already installed plugin manager
                #
                if [ -x "{tpm_app}" ]; then
            {progress}        {env}"{tpm_app}"
                    exit 0
                fi

                mkdir -p "{dir}"

                #  Clear out potentially broken install
                rm -rf "{tpm_location}"

                $TMUX_BIN display "Cloning {handler} into {tpm_location} ..."
                git clone {forge}/{handler} "{tpm_location}"
                if [ "$?" -ne 0 ]; then
                    echo "Failed to clone tmux plugin handler:"
                    echo "  {forge}/{handler}"
                    exit 11
                fi

                $TMUX_BIN display "Running cloned tpm..."
                {env}"{tpm_app}"
                if [ "$?" -ne 0 ]; then
                    echo "Failed to run: {tpm_app}"
                    exit 12
                fi

                #
                #  Plugins are only installed here on a fresh manager install,
                #  later on missing plugins are the manager's job (<prefix> I)
                #
                $TMUX_BIN display "Installing all plugins..."
                {env}"{tpm_location}/bindings/install_plugins"
                if [ "$?" -ne 0 ]; then
                    echo "Failed to run: {tpm_location}/bindings/install_plugins"
                    exit 12
                fi

                $TMUX_BIN display "Plugin setup completed"
            }}"#,
            fnc = FNC_ACTIVATE_TPM,
            tpm_app = tpm_app.display(),
            tpm_location = tpm_location.display(),
            dir = plugins_dir.display(),
            env = tpm_env,
            progress = progress,
            handler = self.plugin_handler,
            forge = PLUGIN_FORGE,
        );

        self.scripts
            .create(FNC_ACTIVATE_TPM, vec![script], false, true)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PluginDecl;
    use crate::scripts::ScriptConfig;
    use crate::tmux::Program;
    use crate::version::VersionCheck;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::path::PathBuf;

    const CONF_FILE: &str = "/tmp/foo32/tmux/tmux.conf";

    fn setup(vers: &str, handler: &str, decls: Vec<PluginDecl>) -> (PluginRegistry, EmbeddedScripts) {
        let vers = VersionCheck::new(vers, None::<&str>).unwrap();
        let mut registry = PluginRegistry::new(CONF_FILE, Program::Tmux, vers.clone());
        registry.scan(decls.into_iter().enumerate()).unwrap();
        let scripts = EmbeddedScripts::new(ScriptConfig {
            conf_file: PathBuf::from(CONF_FILE),
            use_embedded: true,
            plugin_handler: handler.to_string(),
            program: Program::Tmux,
            vers,
        });
        (registry, scripts)
    }

    fn highlight() -> PluginDecl {
        PluginDecl::new(
            "jaclu/tmux-prefix-highlight",
            2.4,
            "\n    set -g @prefix_highlight_show_copy_mode  on\n    ",
        )
    }

    #[test]
    fn test_plugin_lines() {
        let (registry, mut scripts) = setup("2.4", "tmux-plugins/tpm", vec![highlight()]);
        let deployment = PluginDeployment::new(&registry, &mut scripts, "tmux-plugins/tpm");
        assert_eq!(
            deployment.plugin_lines().unwrap(),
            vec![
                "#------------------------------",
                "set -g @plugin \"jaclu/tmux-prefix-highlight\"",
                "",
                "set -g @prefix_highlight_show_copy_mode  on",
                "",
            ]
        );
    }

    #[test]
    fn test_plugin_lines_before_1_8() {
        let (registry, mut scripts) = setup(
            "1.7",
            "manual",
            vec![PluginDecl::new("tmux-plugins/tmux-yank", 1.5, "set -g @yank on")],
        );
        let deployment = PluginDeployment::new(&registry, &mut scripts, "manual");
        assert_eq!(
            deployment.plugin_lines().unwrap(),
            vec![
                "#------------------------------",
                "# plugin: tmux-plugins/tmux-yank",
                "# in versions < 1.8 @variables can not be used",
                "",
            ]
        );
    }

    #[test]
    fn test_nothing_without_plugins() {
        let (registry, mut scripts) = setup("3.4", "tmux-plugins/tpm", vec![]);
        let mut deployment = PluginDeployment::new(&registry, &mut scripts, "tmux-plugins/tpm");
        assert!(deployment.plugin_lines().unwrap().is_empty());
        assert!(deployment.deploy_plugin_handler().unwrap().is_empty());
        assert!(scripts.embedded_block().is_empty());
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_tpm_deploy() {
        let (registry, mut scripts) = setup("3.4", "tmux-plugins/tpm", vec![highlight()]);
        let mut deployment = PluginDeployment::new(&registry, &mut scripts, "tmux-plugins/tpm");
        let lines = deployment.deploy_plugin_handler().unwrap();

        assert_eq!(lines[3], "#   Tmux Plugin Manager");
        assert_eq!(
            lines.last().unwrap(),
            "run-shell -b \"cut -c3- '/tmp/foo32/tmux/tmux.conf' | sh -s activate_tpm\""
        );

        let block = scripts.embedded_block().join("\n");
        assert!(block.contains("# activate_tpm() {"));
        assert!(block.contains(
            "git clone https://github.com/tmux-plugins/tpm \"/tmp/foo32/tmux/plugins/tpm\""
        ));
        assert!(block.contains("XDG_CONFIG_HOME=\"/tmp/foo32\" \"/tmp/foo32/tmux/plugins/tpm/tpm\""));
        assert!(block.contains("exit 11"));
        assert!(block.contains("\"/tmp/foo32/tmux/plugins/tpm/bindings/install_plugins\""));
        assert!(!block.contains("Initializing plugins"));
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "")])]
    fn test_manual_deploy() {
        let (mut registry, mut scripts) = setup(
            "3.4",
            "manual",
            vec![
                highlight(),
                PluginDecl::new("tmux-plugins/tmux-yank", 1.5, ""),
            ],
        );
        registry.set_limited_host(true);
        let mut deployment = PluginDeployment::new(&registry, &mut scripts, "manual");
        let lines = deployment.deploy_plugin_handler().unwrap();

        assert_eq!(lines[3], "#   Manual Plugin Handling");
        let run = lines.last().unwrap();
        assert!(run.starts_with("run-shell -b \"cut -c3- '/tmp/foo32/tmux/tmux.conf' | "));
        assert!(run.ends_with("bash -s activate_plugins_manually\""));

        let block = scripts.embedded_block().join("\n");
        assert!(block.contains(
            "#     plugins=( jaclu/tmux-prefix-highlight tmux-plugins/tmux-yank )"
        ));
        assert!(block.contains("#     mkdir -p \"/tmp/foo32/tmux/plugins\""));
        assert!(block.contains("grep tmux$ | head -n 1"));
        assert!(block.contains("#     $TMUX_BIN display \"Initializing plugins...\""));
    }

    #[test]
    fn test_user_script_overrides_handler() {
        let (registry, mut scripts) = setup("3.4", "tmux-plugins/tpm", vec![highlight()]);
        scripts
            .create(FNC_ACTIVATE_TPM, vec!["activate_tpm() { :; }".into()], false, false)
            .unwrap();
        let mut deployment = PluginDeployment::new(&registry, &mut scripts, "tmux-plugins/tpm");
        deployment.deploy_plugin_handler().unwrap();

        let block = scripts.embedded_block().join("\n");
        assert!(block.contains("# activate_tpm() { :; }"));
        assert!(!block.contains("git clone"));
    }
}
