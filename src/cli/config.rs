//! Manage the bomsync configuration file.
//!
//! ```bash
//! bomsync config init     # write an example config
//! bomsync config show     # print the effective config, token masked
//! bomsync config          # same as show
//! bomsync config path     # print the config file location
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::aggregate::validate_hierarchy;
use crate::config::GlobalConfig;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write an example configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Init { force }) => Self::init(force, config_path).await,
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Path) => Self::show_path(config_path),
        }
    }

    async fn init(force: bool, config_path: Option<PathBuf>) -> Result<()> {
        let path = GlobalConfig::resolve_path(config_path)?;

        if path.exists() && !force {
            println!("❌ Config already exists at: {}", path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let config = GlobalConfig::init_example();
        config.save_to(&path).await?;

        println!("✅ Created config at: {}", path.display());
        println!("\n{}", "Example configuration:".bold());
        println!("{}", toml::to_string_pretty(&config)?);
        println!("{}", "Next steps:".yellow());
        println!("  1. Point api.base_url at your item master");
        println!("  2. Set api.token, or export BOMSYNC_TOKEN");
        Ok(())
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let path = GlobalConfig::resolve_path(config_path.clone())?;
        let config = GlobalConfig::load_with_optional(config_path).await?;

        if path.exists() {
            println!("{} {}", "Config:".bold(), path.display());
        } else {
            println!("{} {} (not found, showing defaults)", "Config:".bold(), path.display());
        }
        println!();
        println!("{}", toml::to_string_pretty(&config.redacted())?);

        if config.api.token.is_none() && config.token().is_some() {
            println!("{}", "Token: from BOMSYNC_TOKEN".dimmed());
        }
        if let Err(problems) = validate_hierarchy(&config.hierarchy) {
            for problem in problems {
                println!("{}: hierarchy {problem}", "warning".yellow());
            }
        }
        Ok(())
    }

    fn show_path(config_path: Option<PathBuf>) -> Result<()> {
        let path = GlobalConfig::resolve_path(config_path)?;
        println!("{}", path.display());
        if !path.exists() {
            println!("{}", "(file does not exist yet; run 'bomsync config init')".dimmed());
        }
        Ok(())
    }
}
