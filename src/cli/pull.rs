//! Write a resolved BOM as flat push lines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::common::{CliContext, TreeSourceArgs, create_output};
use crate::resolver::flatten_tree;
use crate::surface::{LineFormat, write_sync_lines};

#[derive(Args)]
pub struct PullCommand {
    /// Item number of the root assembly
    number: String,

    #[command(flatten)]
    source: TreeSourceArgs,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (defaults to the output file's extension, else csv)
    #[arg(long, value_enum)]
    format: Option<LineFormat>,
}

impl PullCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let (root, nodes) = self.source.load_tree(ctx, &self.number).await?;
        let lines = flatten_tree(&nodes);

        let format = self
            .format
            .or_else(|| self.output.as_deref().map(LineFormat::from_path))
            .unwrap_or_default();

        match &self.output {
            Some(path) => {
                let file = create_output(path)?;
                write_sync_lines(file, &lines, format)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Wrote {} lines of {} to {}", lines.len(), root.number, path.display());
            }
            None => write_sync_lines(std::io::stdout().lock(), &lines, format)?,
        }
        Ok(())
    }
}
