//! Command-line interface for tmux-conf.
//!
//! Parses arguments using clap and provides the [`Cli`] struct containing
//! all user-specified options.

use crate::generator::Options;
use crate::tmux::Program;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for tmux-conf.
///
/// # Examples
///
/// ```bash
/// # Generate ~/.tmux.conf from a description
/// tmux-conf ~/.config/tmux-conf/desc.toml
///
/// # Generate for an older tmux, into another file, without asking
/// tmux-conf -r -t ~/.local/tmux-2.8/bin/tmux desc.toml /tmp/tmux-2.8.conf
///
/// # List used and skipped plugins
/// tmux-conf -p 2 desc.toml
/// ```
#[derive(Parser, Debug)]
#[command(name = "tmux-conf")]
#[command(version)]
#[command(about = "Tmux config compiler - generate a version-matched tmux.conf")]
#[command(long_about = "tmux-conf generates a tmux config from a TOML description,\n\
    using only what the installed (or requested) tmux version supports.\n\n\
    Notes, plugins and helper scripts are adapted to the version, so one\n\
    description serves every tmux you use.")]
pub struct Cli {
    /// Remove all installed plugins before generating.
    ///
    /// They are reinstalled next time tmux starts with the new config.
    #[arg(short = 'c', long)]
    pub clear_plugins: bool,

    /// Replace an existing config without asking.
    #[arg(short = 'r', long)]
    pub replace: bool,

    /// Report on plugins instead of generating a config.
    ///
    /// 1 lists used plugins, 2 also skipped ones, 3 also what each plugin
    /// writes to the config.
    #[arg(short = 'p', long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub plugins_display: Option<u8>,

    /// tmux (or tmate) binary to generate the config for.
    #[arg(short = 't', long, value_name = "BIN")]
    pub tmux_bin: Option<String>,

    /// Generate for this tmux version instead of the installed one.
    #[arg(short = 'V', long = "forced-version", value_name = "VERSION")]
    pub forced_version: Option<String>,

    /// Description file to generate the config from.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Config file to write [default: ~/.tmux.conf, ~/.tmate.conf for tmate].
    #[arg(value_name = "CONF_FILE")]
    pub conf_file: Option<String>,
}

impl Cli {
    /// Build generation options from the arguments.
    ///
    /// `source` should be the resolved description path, it ends up in the
    /// config header and in the edit binding.
    pub fn options(&self, source: PathBuf, generator_bin: String) -> Options {
        let tmux_bin = self.tmux_bin.clone().unwrap_or_default();
        // tmate picks its own default later on, starting from the tmux one
        let conf_file = self
            .conf_file
            .clone()
            .unwrap_or_else(|| Program::Tmux.default_conf_file().to_string());

        Options {
            conf_file,
            tmux_bin,
            forced_version: self.forced_version.clone(),
            replace_config: self.replace,
            clear_plugins: self.clear_plugins,
            plugins_display: self.plugins_display.unwrap_or(0),
            source,
            generator_bin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "tmux-conf", "-c", "-r", "-p", "2", "-t", "tmate", "-V", "2.8", "desc.toml", "/tmp/t.conf",
        ])
        .unwrap();
        let options = cli.options(PathBuf::from("/src/desc.toml"), "tmux-conf".into());

        assert!(options.clear_plugins);
        assert!(options.replace_config);
        assert_eq!(options.plugins_display, 2);
        assert_eq!(options.tmux_bin, "tmate");
        assert_eq!(options.forced_version.as_deref(), Some("2.8"));
        assert_eq!(options.conf_file, "/tmp/t.conf");
        assert_eq!(options.source, PathBuf::from("/src/desc.toml"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tmux-conf", "desc.toml"]).unwrap();
        let options = cli.options(PathBuf::from("desc.toml"), "tmux-conf".into());
        assert_eq!(options.conf_file, "~/.tmux.conf");
        assert_eq!(options.plugins_display, 0);
        assert!(options.tmux_bin.is_empty());
        assert!(!options.replace_config);
    }

    #[test]
    fn test_display_level_range() {
        assert!(Cli::try_parse_from(["tmux-conf", "-p", "4", "desc.toml"]).is_err());
        assert!(Cli::try_parse_from(["tmux-conf", "-p", "0", "desc.toml"]).is_err());
    }

    #[test]
    fn test_source_required() {
        assert!(Cli::try_parse_from(["tmux-conf"]).is_err());
    }
}
