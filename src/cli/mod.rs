//! Command-line interface for bomsync.
//!
//! # Commands
//!
//! - `tree` - resolve and print a multi-level BOM
//! - `pull` - resolve a BOM and write it as flat push lines
//! - `consolidate` - roll placed assemblies up into per-item totals
//! - `push` - replace a parent's remote BOM with local lines
//! - `config` - initialize or inspect the configuration file
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: no logging and no progress indicators
//! - `--config` / `-c`: configuration file (also `BOMSYNC_CONFIG`)
//! - `--no-progress`: no progress indicators (also `BOMSYNC_NO_PROGRESS`)
//!
//! # Examples
//!
//! ```bash
//! bomsync tree RACK-A1 --depth 4
//! bomsync pull RACK-A1 -o rack-a1.csv
//! bomsync consolidate hall-north.csv hall-south.csv --assembly RACK-A1
//! bomsync push RACK-A1 rack-a1.csv
//! bomsync tree RACK-A1 --export export.json
//! ```

pub mod common;
mod config;
mod consolidate;
mod pull;
mod push;
mod tree;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;
use common::CliContext;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level for the subscriber; `None` disables logging
    pub log_level: Option<String>,
    pub no_progress: bool,
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber. `RUST_LOG` wins when set.
    pub fn init_logging(&self) {
        let Some(level) = &self.log_level else {
            return;
        };
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("bomsync_cli={level},bomsync={level},warn"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Hierarchical BOM resolution and synchronization against an item master.
#[derive(Parser)]
#[command(
    name = "bomsync",
    about = "Resolve, consolidate and synchronize hierarchical bills of materials",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress logging and progress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "BOMSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and display the BOM tree below an item
    Tree(tree::TreeCommand),

    /// Resolve a BOM and write it as flat push lines
    Pull(pull::PullCommand),

    /// Consolidate placed assemblies into per-item quantities
    Consolidate(consolidate::ConsolidateCommand),

    /// Replace the remote BOM of an item with local lines
    Push(push::PushCommand),

    /// Manage the configuration file
    Config(config::ConfigCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Tree(cmd) => cmd.execute(&Self::context(&config).await?).await,
            Commands::Pull(cmd) => cmd.execute(&Self::context(&config).await?).await,
            Commands::Consolidate(cmd) => cmd.execute(&Self::context(&config).await?).await,
            Commands::Push(cmd) => cmd.execute(&Self::context(&config).await?).await,
            Commands::Config(cmd) => cmd.execute(config.config_path).await,
        }
    }

    async fn context(config: &CliConfig) -> Result<CliContext> {
        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;
        Ok(CliContext::new(global, config.no_progress))
    }
}
