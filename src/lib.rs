//! # tmux-conf
//!
//! A tmux config compiler that generates a version-matched `tmux.conf` from
//! a TOML description.
//!
//! tmux keeps adding and changing features. tmux-conf writes one config per
//! tmux version from a single description, keeping only what the target
//! version supports and working around what it lacks.
//!
//! ## Features
//!
//! - **Version gating**: blocks with a `min_version` and optional fallback
//! - **Notes**: `bind -N` notes turn into comments for tmux older than 3.1
//! - **Plugins**: declared with a minimum version, installed through tpm or
//!   by a generated manual handler
//! - **Embedded scripts**: helper scripts stored inside the config itself
//! - **tmate**: handled as tmux 2.4 with manual plugin handling
//!
//! ## Quick Example
//!
//! ```toml
//! # ~/.config/tmux-conf/desc.toml
//!
//! [[content]]
//! cmd = "set -g mouse on"
//!
//! [[content]]
//! min_version = 3.1
//! cmd = "bind -N 'Split' - split-window -v"
//!
//! [[plugin]]
//! name = "tmux-plugins/tmux-yank"
//! min_version = 1.5
//! ```
//!
//! ```bash
//! tmux-conf ~/.config/tmux-conf/desc.toml
//! ```
//!
//! ## Architecture
//!
//! The crate is organized into these modules:
//!
//! - [`version`]: Version parsing and comparison
//! - [`scripts`]: Embedded and external helper scripts
//! - [`plugins`]: Plugin registry, used and skipped plugins
//! - [`deploy`]: `@plugin` lines and plugin handler scripts
//! - [`report`]: Plugin status report
//! - [`writer`]: The output document, note filtering
//! - [`generator`]: The generation run
//! - [`config`]: TOML description format
//! - [`interpolate`]: Placeholders (`{run:NAME}`, `{vers}`)
//! - [`loader`]: Paths and description loading
//! - [`tmux`]: tmux binary discovery
//! - [`cli`]: Command-line argument parsing with clap
//! - [`error`]: Error types

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod generator;
pub mod interpolate;
pub mod loader;
pub mod plugins;
pub mod report;
pub mod scripts;
pub mod tmux;
pub mod version;
pub mod writer;

pub use config::{Block, Cmd, Description, PluginDef, ScriptDef};
pub use error::{Result, TmuxConfError};
pub use generator::{ConfigSource, Options, Outcome, Settings, TmuxConfig};
pub use version::{Version, VersionCheck, VersionInput};
