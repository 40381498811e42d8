//! Consolidate placed assemblies across placement surfaces.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use colored::Colorize;
use tracing::warn;

use super::common::{CliContext, create_output, read_export};
use crate::aggregate::{Aggregator, LevelClassifier, RemoteCatalog, StaticCatalog};
use crate::export;
use crate::models::{ConsolidatedEntry, PlacementSurface, SyncBomLine};
use crate::surface::{LineFormat, read_surface, write_consolidated_csv, write_sync_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Csv,
}

#[derive(Args)]
pub struct ConsolidateCommand {
    /// Placement surface CSV files
    #[arg(required = true, value_name = "SURFACE")]
    surfaces: Vec<PathBuf>,

    /// Assembly numbers to count (defaults to the configured list)
    #[arg(short, long = "assembly", value_name = "NUMBER")]
    assemblies: Vec<String>,

    /// Level for items whose category is not in the hierarchy
    #[arg(long, default_value_t = 0)]
    default_level: usize,

    /// Maximum number of levels resolved below each assembly
    #[arg(long)]
    depth: Option<usize>,

    /// Resolve assemblies from a bulk export file
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the result as push lines
    #[arg(long, value_name = "FILE")]
    lines: Option<PathBuf>,
}

impl ConsolidateCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let assemblies = if self.assemblies.is_empty() {
            ctx.config.assemblies.clone()
        } else {
            self.assemblies.clone()
        };
        if assemblies.is_empty() {
            bail!("No assemblies to count: pass --assembly or set 'assemblies' in the config");
        }

        let surfaces = self
            .surfaces
            .iter()
            .map(|path| {
                read_surface(path)
                    .with_context(|| format!("Failed to read surface {}", path.display()))
            })
            .collect::<Result<Vec<PlacementSurface>>>()?;

        let api = ctx.api()?;
        let aggregator = Aggregator::new(&api, LevelClassifier::new(ctx.config.hierarchy.clone()))
            .with_default_level(self.default_level);
        let max_depth = self.depth.unwrap_or(ctx.config.resolver.max_depth);

        let spinner = ctx.spinner("Consolidating placements");
        let entries = match &self.export {
            Some(path) => {
                let catalog = export_catalog(&read_export(path)?, &assemblies, max_depth)?;
                aggregator.consolidate(&surfaces, &catalog).await
            }
            None => {
                let catalog = RemoteCatalog::new(&api, assemblies)
                    .with_max_depth(max_depth)
                    .with_batch_timeout(ctx.config.resolver.batch_timeout());
                aggregator.consolidate(&surfaces, &catalog).await
            }
        };
        spinner.finish_and_clear();

        match (&self.output, self.format) {
            (Some(path), _) => {
                write_consolidated_csv(create_output(path)?, &entries)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Wrote {} entries to {}", entries.len(), path.display());
            }
            (None, OutputFormat::Csv) => {
                write_consolidated_csv(std::io::stdout().lock(), &entries)?;
            }
            (None, OutputFormat::Table) => print_table(&entries),
        }

        if let Some(path) = &self.lines {
            let lines: Vec<SyncBomLine> =
                entries.iter().map(ConsolidatedEntry::to_sync_line).collect();
            write_sync_lines(create_output(path)?, &lines, LineFormat::from_path(path))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

fn export_catalog(
    payload: &serde_json::Value,
    assemblies: &[String],
    max_depth: usize,
) -> Result<StaticCatalog> {
    export::detect_shape(payload)?;
    let mut catalog = StaticCatalog::new();
    for number in assemblies {
        let Some(item) = export::find_item(payload, number) else {
            warn!("Assembly {number} not found in export");
            continue;
        };
        let children = export::build_tree_from_export_with_depth(payload, &item.id, max_depth)?;
        catalog = catalog.with(item, children);
    }
    Ok(catalog)
}

fn print_table(entries: &[ConsolidatedEntry]) {
    if entries.is_empty() {
        println!("{}", "No placements found".yellow());
        return;
    }

    for entry in entries {
        let indent = "  ".repeat(entry.level);
        let mut label = format!("{indent}{}", entry.item.number);
        if !entry.item.name.is_empty() {
            label.push_str(&format!(" {}", entry.item.name));
        }
        let label = format!("{label:<48}");
        let label = if entry.resolved { label.normal() } else { label.yellow() };
        let category = if entry.item.category.is_empty() { "-" } else { &entry.item.category };
        println!("{label} {category:<16} {:>10}", entry.quantity);
    }

    let unresolved = entries.iter().filter(|entry| !entry.resolved).count();
    if unresolved > 0 {
        println!("\n{}", format!("{unresolved} item(s) could not be resolved").yellow());
    }
}
