//! Full-replace synchronization of a parent's BOM.
//!
//! A push replaces every remote BOM line of the parent with the given lines:
//! existing lines are deleted one at a time, then each local line is resolved
//! by item number and recreated. There is no stable key tying a local row to
//! a remote line, so nothing is diffed.
//!
//! Lines carry their level below the push target, the way
//! [`flatten_tree`](crate::resolver::flatten_tree) writes them. A line's
//! parent is the nearest preceding line with a lower level, and lines without
//! one go directly under the target. Each item that receives lines this way
//! has its own BOM replaced as well, exactly once: a sub-assembly repeated in
//! the input is written from its first occurrence. Items that receive no
//! lines keep their remote BOM, so a tree pulled at a limited depth can be
//! pushed back without clearing what lies below the cut.
//!
//! Individual deletions, lookups and creations that fail become warnings in
//! the [`SyncReport`] and processing continues. Only the parent itself is
//! fatal: if it can be neither found nor created, [`Synchronizer::push`]
//! fails before anything is deleted.
//!
//! Another writer changing the same parent during a push is not detected;
//! the remote system keeps whatever was written last.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{ApiError, BomApi, NewBomLine, NewItem};
use crate::constants::DEFAULT_REQUEST_DELAY_MS;
use crate::core::BomError;
use crate::models::{ItemRef, SyncBomLine};
use crate::resolver::ItemRefCache;
use crate::utils::progress::ProgressBar;

/// Which parent a push writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentTarget {
    /// An item that must already exist
    Existing { number: String },
    /// Use the item if it exists, create it from `item` otherwise
    CreateIfMissing { item: NewItem },
}

impl ParentTarget {
    pub fn existing(number: impl Into<String>) -> Self {
        Self::Existing {
            number: number.into(),
        }
    }

    pub fn number(&self) -> &str {
        match self {
            Self::Existing { number } => number,
            Self::CreateIfMissing { item } => &item.number,
        }
    }
}

/// Outcome of a push or sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// The parent written to; only the id is known after a bare [`Synchronizer::sync`]
    pub parent: ItemRef,
    /// True when the parent was created by this push
    pub parent_created: bool,
    /// Number of input lines
    pub requested: usize,
    /// Lines created on the remote system
    pub created: usize,
    /// Lines identical to an earlier occurrence of the same sub-assembly,
    /// written once through that occurrence
    pub merged: usize,
    /// Pre-existing lines deleted
    pub deleted: usize,
    /// One message per skipped or failed line, in processing order
    pub warnings: Vec<String>,
}

impl SyncReport {
    /// True when every requested line was written and nothing failed.
    pub fn is_complete(&self) -> bool {
        self.created + self.merged == self.requested && self.warnings.is_empty()
    }
}

/// Writes BOM lines to the item master.
pub struct Synchronizer<'a, A: BomApi + ?Sized> {
    api: &'a A,
    request_delay: Duration,
    progress: ProgressBar,
}

impl<'a, A: BomApi + ?Sized> Synchronizer<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            progress: ProgressBar::hidden(),
        }
    }

    /// Delay after each line creation.
    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve (or create) the parent, then replace its BOM with `lines`.
    ///
    /// Fails only while resolving the parent, before any deletion.
    pub async fn push(
        &self,
        target: &ParentTarget,
        lines: &[SyncBomLine],
    ) -> Result<SyncReport, BomError> {
        let (parent, created) = self.resolve_parent(target).await?;
        info!("Pushing {} lines to {} ({})", lines.len(), parent.number, parent.id);

        let mut report = self.sync(&parent.id, lines).await;
        report.parent = parent;
        report.parent_created = created;
        Ok(report)
    }

    async fn resolve_parent(&self, target: &ParentTarget) -> Result<(ItemRef, bool), BomError> {
        let number = target.number();
        let existing = self.api.resolve_by_number(number).await.map_err(|err| match err {
            ApiError::Transport(reason) => BomError::Transport {
                operation: format!("looking up parent {number}"),
                reason,
            },
            other => BomError::ParentLookupFailed {
                number: number.to_string(),
                reason: other.to_string(),
            },
        })?;

        if let Some(parent) = existing {
            return Ok((parent, false));
        }

        match target {
            ParentTarget::Existing { number } => Err(BomError::ParentNotFound {
                number: number.clone(),
            }),
            ParentTarget::CreateIfMissing { item } => {
                info!("Parent {} not found, creating it", item.number);
                let parent = self.api.create_item(item).await.map_err(|err| {
                    BomError::ParentCreateFailed {
                        number: item.number.clone(),
                        reason: err.to_string(),
                    }
                })?;
                Ok((parent, true))
            }
        }
    }

    /// Replace the BOM of `parent_id` with `lines`, nested lines included.
    /// Never fails; problems are reported as warnings.
    pub async fn sync(&self, parent_id: &str, lines: &[SyncBomLine]) -> SyncReport {
        let mut report = SyncReport {
            parent: ItemRef::new(parent_id, ""),
            requested: lines.len(),
            ..SyncReport::default()
        };

        let plan = plan_lines(lines);
        report.merged = plan.merged;
        for (number, skipped) in &plan.conflicts {
            warn!("Repeated {number} has different lines, keeping its first occurrence");
            report.warnings.push(format!(
                "Skipped {skipped} lines under repeated {number}: they differ from the first"
            ));
        }

        self.progress.set_prefix("Pushing");
        self.progress.inc((lines.len() - plan.placed()) as u64);

        let mut items = ItemRefCache::new();
        for group in &plan.groups {
            let target = match &group.parent {
                None => parent_id.to_string(),
                Some(number) => match self.sub_parent_id(number, &mut items).await {
                    Some(id) => id,
                    None => {
                        for index in &group.lines {
                            report.warnings.push(format!(
                                "Line {}: parent {number} could not be resolved",
                                index + 1
                            ));
                        }
                        self.progress.inc(group.lines.len() as u64);
                        continue;
                    }
                },
            };
            self.replace(&target, lines, &group.lines, &mut items, &mut report).await;
        }

        info!(
            "Synced {parent_id}: {} of {} lines created, {} merged, {} deleted, {} warnings",
            report.created,
            report.requested,
            report.merged,
            report.deleted,
            report.warnings.len()
        );
        report
    }

    /// Id of a sub-assembly that receives nested lines. Its own line was
    /// looked up earlier, so this normally hits the cache.
    async fn sub_parent_id(&self, number: &str, items: &mut ItemRefCache) -> Option<String> {
        if number.is_empty() {
            return None;
        }
        match items.lookup(self.api, number).await {
            Ok(Some(item)) if !item.id.is_empty() => Some(item.id),
            Ok(_) => None,
            Err(err) => {
                debug!("Sub-assembly {number} unavailable: {err}");
                None
            }
        }
    }

    /// Delete the BOM of `parent_id`, then create `lines[indices]` under it.
    async fn replace(
        &self,
        parent_id: &str,
        lines: &[SyncBomLine],
        indices: &[usize],
        items: &mut ItemRefCache,
        report: &mut SyncReport,
    ) {
        let existing = match self.api.fetch_bom(parent_id).await {
            Ok(existing) => existing,
            Err(err) => {
                info!("No existing BOM for {parent_id} ({err}), treating as empty");
                Vec::new()
            }
        };

        debug!("Deleting {} existing lines of {parent_id}", existing.len());
        for line in &existing {
            if line.line_id.is_empty() {
                report.warnings.push(format!(
                    "Cannot delete existing line for {}: no line id",
                    line.item.number
                ));
                continue;
            }
            match self.api.delete_bom_line(parent_id, &line.line_id).await {
                Ok(()) => report.deleted += 1,
                Err(err) => {
                    warn!("Failed to delete line {} of {parent_id}: {err}", line.line_id);
                    report.warnings.push(format!(
                        "Failed to delete line {} ({}): {err}",
                        line.line_id, line.item.number
                    ));
                }
            }
        }

        for &index in indices {
            let line = &lines[index];
            self.progress.inc(1);
            let number = line.item_number.trim();
            if number.is_empty() {
                report.warnings.push(format!("Line {}: missing item number", index + 1));
                continue;
            }
            self.progress.set_message(number.to_string());

            let item = match items.lookup(self.api, number).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    warn!("Item not found: {number}");
                    report.warnings.push(format!("Item not found: {number}"));
                    continue;
                }
                Err(err) => {
                    warn!("Failed to look up {number}: {err}");
                    report.warnings.push(format!("Failed to look up item {number}: {err}"));
                    continue;
                }
            };

            let new_line = NewBomLine {
                item_id: item.id,
                quantity: line.quantity,
                level: line.level,
            };
            match self.api.create_bom_line(parent_id, &new_line).await {
                Ok(()) => report.created += 1,
                Err(err) => {
                    warn!("Failed to create line for {number}: {err}");
                    report.warnings.push(format!("Failed to create line for {number}: {err}"));
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }
    }
}

/// Lines bound for one remote parent.
#[derive(Debug, Clone, PartialEq)]
struct LineGroup {
    /// Item number of the parent line; `None` for the push target
    parent: Option<String>,
    /// Indices into the pushed lines, in input order
    lines: Vec<usize>,
}

/// Where every pushed line goes.
#[derive(Debug, Default)]
struct LinePlan {
    /// The push target first, then sub-assemblies in input order
    groups: Vec<LineGroup>,
    merged: usize,
    /// Repeated sub-assemblies whose lines differ: `(number, lines skipped)`
    conflicts: Vec<(String, usize)>,
}

impl LinePlan {
    /// Lines that will be written through a group.
    fn placed(&self) -> usize {
        self.groups.iter().map(|group| group.lines.len()).sum()
    }
}

fn plan_lines(lines: &[SyncBomLine]) -> LinePlan {
    // Keyed by the index of the parent line; the target sorts first
    let mut by_parent: BTreeMap<Option<usize>, Vec<usize>> = BTreeMap::new();
    by_parent.insert(None, Vec::new());

    let mut ancestors: Vec<usize> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        while ancestors.last().is_some_and(|&top| lines[top].level >= line.level) {
            ancestors.pop();
        }
        by_parent.entry(ancestors.last().copied()).or_default().push(index);
        ancestors.push(index);
    }

    let mut plan = LinePlan::default();
    let mut first_group: HashMap<&str, usize> = HashMap::new();
    for (parent, indices) in by_parent {
        let Some(parent_index) = parent else {
            plan.groups.push(LineGroup {
                parent: None,
                lines: indices,
            });
            continue;
        };

        let number = lines[parent_index].item_number.trim();
        match first_group.get(number) {
            None => {
                first_group.insert(number, plan.groups.len());
                plan.groups.push(LineGroup {
                    parent: Some(number.to_string()),
                    lines: indices,
                });
            }
            Some(&position) => {
                let first = signature(lines, &plan.groups[position].lines);
                if first == signature(lines, &indices) {
                    plan.merged += indices.len();
                } else {
                    plan.conflicts.push((number.to_string(), indices.len()));
                }
            }
        }
    }
    plan
}

/// What a group writes, independent of where the lines sit in the input.
fn signature<'l>(lines: &'l [SyncBomLine], indices: &[usize]) -> Vec<(&'l str, f64)> {
    indices
        .iter()
        .map(|&index| (lines[index].item_number.trim(), lines[index].quantity))
        .collect()
}
