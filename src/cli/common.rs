//! Helpers shared by the CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use crate::api::{BomApi, HttpBomApi};
use crate::config::GlobalConfig;
use crate::export;
use crate::models::{BomNode, ItemRef};
use crate::resolver::TreeResolver;
use crate::utils::progress::{ProgressBar, spinner_with_message};

/// Loaded configuration plus the global flags commands care about.
pub struct CliContext {
    pub config: GlobalConfig,
    pub no_progress: bool,
}

impl CliContext {
    pub fn new(config: GlobalConfig, no_progress: bool) -> Self {
        Self {
            config,
            no_progress,
        }
    }

    /// HTTP client for the configured item master.
    pub fn api(&self) -> Result<HttpBomApi> {
        HttpBomApi::from_config(&self.config.api, self.config.token())
            .with_context(|| format!("Failed to create client for {}", self.config.api.base_url))
    }

    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.no_progress {
            ProgressBar::hidden()
        } else {
            spinner_with_message(message)
        }
    }

    pub fn bar(&self, len: u64) -> ProgressBar {
        if self.no_progress { ProgressBar::hidden() } else { ProgressBar::new(len) }
    }
}

/// Where a command takes its BOM tree from.
#[derive(Args, Debug, Clone, Default)]
pub struct TreeSourceArgs {
    /// Maximum number of levels to resolve (defaults to resolver.max_depth)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Build from a bulk export file instead of fetching per item
    #[arg(long, value_name = "FILE", conflicts_with = "from_remote_export")]
    pub export: Option<PathBuf>,

    /// Download the bulk export once and build from it
    #[arg(long)]
    pub from_remote_export: bool,
}

impl TreeSourceArgs {
    pub fn max_depth(&self, config: &GlobalConfig) -> usize {
        self.depth.unwrap_or(config.resolver.max_depth)
    }

    /// Resolve the item numbered `number` and the tree below it.
    pub async fn load_tree(
        &self,
        ctx: &CliContext,
        number: &str,
    ) -> Result<(ItemRef, Vec<BomNode>)> {
        if let Some(path) = &self.export {
            return tree_from_export(&read_export(path)?, number, self.max_depth(&ctx.config));
        }
        let api = ctx.api()?;
        self.load_tree_with(&api, ctx, number).await
    }

    /// Like [`load_tree`](Self::load_tree) but against `api`, either from its
    /// bulk export (`--from-remote-export`) or level by level.
    pub async fn load_tree_with<A: BomApi + ?Sized>(
        &self,
        api: &A,
        ctx: &CliContext,
        number: &str,
    ) -> Result<(ItemRef, Vec<BomNode>)> {
        let max_depth = self.max_depth(&ctx.config);

        if self.from_remote_export {
            let spinner = ctx.spinner("Downloading bulk export");
            let payload = api.bulk_export().await.context("Failed to download bulk export")?;
            spinner.finish_and_clear();
            return tree_from_export(&payload, number, max_depth);
        }

        let root = api
            .resolve_by_number(number)
            .await
            .with_context(|| format!("Failed to look up {number}"))?
            .with_context(|| format!("Item {number} not found in the item master"))?;

        let spinner = ctx.spinner(format!("Resolving {number}"));
        let nodes = TreeResolver::new(api)
            .with_max_depth(max_depth)
            .with_batch_timeout(ctx.config.resolver.batch_timeout())
            .with_progress(spinner.clone())
            .resolve_tree(&root.id)
            .await?;
        spinner.finish_and_clear();
        Ok((root, nodes))
    }
}

fn tree_from_export(
    payload: &Value,
    number: &str,
    max_depth: usize,
) -> Result<(ItemRef, Vec<BomNode>)> {
    export::detect_shape(payload)?;
    let Some(root) = export::find_item(payload, number) else {
        bail!("Item {number} not found in export");
    };
    let nodes = export::build_tree_from_export_with_depth(payload, &root.id, max_depth)
        .with_context(|| format!("Failed to build the tree of {number} from export"))?;
    Ok((root, nodes))
}

/// Read and parse a bulk export file.
pub fn read_export(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read export {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse export {}", path.display()))
}

/// Create `path`'s parent directory and open it for writing.
pub fn create_output(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}
