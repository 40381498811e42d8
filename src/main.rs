//! bomsync CLI entry point
//!
//! Parses arguments, runs the selected command and turns failures into a
//! user-friendly message with exit status 1.
//!
//! - `tree` - resolve and print a BOM
//! - `pull` - write a resolved BOM as push lines
//! - `consolidate` - roll placements up into per-item totals
//! - `push` - replace a remote BOM with local lines
//! - `config` - manage the configuration file

use anyhow::Result;
use bomsync_cli::cli;
use bomsync_cli::core::error::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
