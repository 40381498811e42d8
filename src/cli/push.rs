//! Replace a parent's remote BOM with local lines.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::CliContext;
use crate::api::NewItem;
use crate::surface::read_sync_lines;
use crate::sync::{ParentTarget, Synchronizer};

#[derive(Args)]
pub struct PushCommand {
    /// Item number of the parent whose BOM is replaced
    parent: String,

    /// Lines to push (CSV with level,item_number,quantity, or JSON); deeper
    /// levels are written into the BOM of the line above them
    #[arg(value_name = "LINES")]
    lines: PathBuf,

    /// Create the parent with this name when it does not exist
    #[arg(long, value_name = "NAME")]
    create_name: Option<String>,

    /// Category of a created parent
    #[arg(long, value_name = "CATEGORY", requires = "create_name")]
    create_category: Option<String>,

    /// Description of a created parent
    #[arg(long, value_name = "TEXT", requires = "create_name")]
    create_description: Option<String>,

    /// Delay after each line creation (defaults to sync.request_delay_ms)
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Fail when any line was not created
    #[arg(long)]
    strict: bool,
}

impl PushCommand {
    fn target(&self) -> ParentTarget {
        match &self.create_name {
            Some(name) => ParentTarget::CreateIfMissing {
                item: NewItem {
                    number: self.parent.clone(),
                    name: name.clone(),
                    description: self.create_description.clone().unwrap_or_default(),
                    category: self.create_category.clone().unwrap_or_default(),
                },
            },
            None => ParentTarget::existing(self.parent.clone()),
        }
    }

    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let lines = read_sync_lines(&self.lines)
            .with_context(|| format!("Failed to read lines from {}", self.lines.display()))?;

        let delay = self
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| ctx.config.sync.request_delay());

        let api = ctx.api()?;
        let progress = ctx.bar(lines.len() as u64);
        let report = Synchronizer::new(&api)
            .with_request_delay(delay)
            .with_progress(progress.clone())
            .push(&self.target(), &lines)
            .await?;
        progress.finish_and_clear();

        if report.parent_created {
            println!("{} parent {}", "Created".green(), report.parent.number);
        }
        let summary = format!(
            "Pushed {} of {} lines to {} ({} existing lines deleted)",
            report.created,
            report.requested,
            report.parent.number,
            report.deleted
        );
        if report.is_complete() {
            println!("{}", summary.green());
        } else {
            println!("{}", summary.yellow());
        }
        if report.merged > 0 {
            println!("{} repeated sub-assembly lines written once", report.merged);
        }
        for warning in &report.warnings {
            println!("{}: {warning}", "warning".yellow());
        }

        if self.strict && !report.is_complete() {
            bail!(
                "Push to {} incomplete: {} warning(s)",
                report.parent.number,
                report.warnings.len()
            );
        }
        Ok(())
    }
}
