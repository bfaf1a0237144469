pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "feedsweep")]
#[command(about = "Mark unread feed items as read when they match your rules", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/feedsweep/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show what would be marked as read without marking anything
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Log every unread item and debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not read or write the local item cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run one filtering pass (default)
    Run,
    /// Check that the configured credentials are accepted
    Check,
    /// Delete every entry from the local item cache
    ClearCache,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Flags win over the config file and environment.
    pub fn apply(&self, config: &mut Config) {
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}
