//! Quantity consolidation across placement surfaces.
//!
//! The [`Aggregator`] counts how often each known assembly is placed on a set
//! of [`PlacementSurface`]s, resolves every placed assembly once, and rolls
//! the quantities of its whole tree up into one [`ConsolidatedEntry`] per
//! item number:
//!
//! - the assembly itself contributes `placements × 1`
//! - every node below it contributes `placements × q1 × q2 × ... × qn`, the
//!   product of the quantities on its path from the assembly
//! - contributions are summed, never overwritten, so an item shared between
//!   assemblies accumulates across all of them
//!
//! Items that the resolved trees do not describe (no name or category) are
//! looked up once per number. Levels come from the [`LevelClassifier`], and
//! the result is ordered by level, then category, then item number, which
//! is the order downstream indentation depends on.

pub mod classifier;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use anyhow::anyhow;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::api::BomApi;
use crate::constants::{DEFAULT_MAX_DEPTH, batch_operation_timeout};
use crate::models::{BomNode, ConsolidatedEntry, ItemRef, PlacementSurface};
use crate::resolver::{ItemRefCache, TreeResolver};

pub use classifier::{LevelClassifier, validate_hierarchy};

/// A placed assembly with its resolved tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssembly {
    pub item: ItemRef,
    /// Direct children of the assembly, subtrees attached
    pub children: Vec<BomNode>,
}

/// The set of assemblies the caller can resolve.
///
/// `contains` decides which surface cells count as placements;
/// `resolve_children` is called at most once per placed assembly.
pub trait AssemblyCatalog: Send + Sync {
    fn contains(&self, number: &str) -> bool;

    fn resolve_children<'a>(&'a self, number: &'a str)
    -> BoxFuture<'a, anyhow::Result<ResolvedAssembly>>;
}

/// Catalog of pre-resolved assemblies.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    assemblies: HashMap<String, ResolvedAssembly>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, assembly: ResolvedAssembly) {
        self.assemblies.insert(assembly.item.number.clone(), assembly);
    }

    #[must_use]
    pub fn with(mut self, item: ItemRef, children: Vec<BomNode>) -> Self {
        self.insert(ResolvedAssembly { item, children });
        self
    }
}

impl AssemblyCatalog for StaticCatalog {
    fn contains(&self, number: &str) -> bool {
        self.assemblies.contains_key(number)
    }

    fn resolve_children<'a>(
        &'a self,
        number: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<ResolvedAssembly>> {
        let result = self
            .assemblies
            .get(number)
            .cloned()
            .ok_or_else(|| anyhow!("Assembly {number} is not in the catalog"));
        futures::future::ready(result).boxed()
    }
}

/// Catalog of configured assembly numbers resolved through the item master.
pub struct RemoteCatalog<'a, A: BomApi + ?Sized> {
    api: &'a A,
    numbers: BTreeSet<String>,
    max_depth: usize,
    batch_timeout: Duration,
}

impl<'a, A: BomApi + ?Sized> RemoteCatalog<'a, A> {
    pub fn new<I, S>(api: &'a A, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api,
            numbers: numbers.into_iter().map(Into::into).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            batch_timeout: batch_operation_timeout(),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }
}

impl<A: BomApi + ?Sized> AssemblyCatalog for RemoteCatalog<'_, A> {
    fn contains(&self, number: &str) -> bool {
        self.numbers.contains(number)
    }

    fn resolve_children<'b>(
        &'b self,
        number: &'b str,
    ) -> BoxFuture<'b, anyhow::Result<ResolvedAssembly>> {
        async move {
            let item = self
                .api
                .resolve_by_number(number)
                .await
                .map_err(|e| anyhow!("Failed to look up assembly {number}: {e}"))?
                .ok_or_else(|| anyhow!("Assembly {number} not found in the item master"))?;

            let children = TreeResolver::new(self.api)
                .with_max_depth(self.max_depth)
                .with_batch_timeout(self.batch_timeout)
                .resolve_tree(&item.id)
                .await?;

            Ok(ResolvedAssembly { item, children })
        }
        .boxed()
    }
}

/// Consolidates placements into per-item totals.
pub struct Aggregator<'a, A: BomApi + ?Sized> {
    api: &'a A,
    classifier: LevelClassifier,
    default_level: usize,
}

impl<'a, A: BomApi + ?Sized> Aggregator<'a, A> {
    pub fn new(api: &'a A, classifier: LevelClassifier) -> Self {
        Self {
            api,
            classifier,
            default_level: 0,
        }
    }

    /// Level kept by entries whose category is not in the hierarchy.
    #[must_use]
    pub fn with_default_level(mut self, level: usize) -> Self {
        self.default_level = level;
        self
    }

    /// Consolidate every placement on `surfaces` into sorted entries.
    pub async fn consolidate<C>(
        &self,
        surfaces: &[PlacementSurface],
        catalog: &C,
    ) -> Vec<ConsolidatedEntry>
    where
        C: AssemblyCatalog + ?Sized,
    {
        let placements = count_placements(surfaces, catalog);
        info!(
            "Found {} placements of {} assemblies",
            placements.values().map(|p| p.count).sum::<usize>(),
            placements.len()
        );

        let mut totals = Totals::default();
        for (number, placement) in &placements {
            let assembly = match catalog.resolve_children(number).await {
                Ok(assembly) => assembly,
                Err(err) => {
                    warn!("Failed to resolve assembly {number}: {err:#}");
                    ResolvedAssembly {
                        item: ItemRef::stub(number.clone()),
                        children: Vec::new(),
                    }
                }
            };

            let count = placement.count as f64;
            totals.add(&assembly.item, count, &placement.surfaces);
            totals.add_tree(&assembly.children, count, &placement.surfaces);
        }

        let mut entries = totals.into_entries();
        self.backfill(&mut entries).await;

        for entry in &mut entries {
            entry.level = self
                .classifier
                .level_for(&entry.item.category)
                .unwrap_or(self.default_level);
        }
        entries.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.item.category.cmp(&b.item.category))
                .then_with(|| a.item.number.cmp(&b.item.number))
        });
        entries
    }

    /// Look up undescribed items, once per item number.
    async fn backfill(&self, entries: &mut [ConsolidatedEntry]) {
        let mut cache = ItemRefCache::new();
        for entry in entries.iter_mut().filter(|entry| !entry.item.is_described()) {
            let number = entry.item.number.clone();
            if number.is_empty() {
                entry.resolved = false;
                continue;
            }

            match cache.lookup(self.api, &number).await {
                Ok(Some(found)) => {
                    debug!("Backfilled {number}");
                    let id = std::mem::take(&mut entry.item.id);
                    entry.item = found;
                    if entry.item.id.is_empty() {
                        entry.item.id = id;
                    }
                }
                Ok(None) => {
                    warn!("Item {number} not found in the item master");
                    entry.item = ItemRef::stub(number);
                    entry.resolved = false;
                }
                Err(err) => {
                    warn!("Failed to look up item {number}: {err}");
                    entry.item = ItemRef::stub(number);
                    entry.resolved = false;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Placement {
    count: usize,
    surfaces: BTreeSet<String>,
}

fn count_placements<C>(surfaces: &[PlacementSurface], catalog: &C) -> BTreeMap<String, Placement>
where
    C: AssemblyCatalog + ?Sized,
{
    let mut placements: BTreeMap<String, Placement> = BTreeMap::new();
    for surface in surfaces {
        let counts = surface.count_matching(|value| catalog.contains(value));
        for (number, count) in counts {
            debug!("{}: {number} placed {count} times", surface.name);
            let placement = placements.entry(number).or_default();
            placement.count += count;
            placement.surfaces.insert(surface.name.clone());
        }
    }
    placements
}

/// Running totals keyed by item number, in first-seen order.
#[derive(Default)]
struct Totals {
    index: HashMap<String, usize>,
    entries: Vec<ConsolidatedEntry>,
}

impl Totals {
    fn add(&mut self, item: &ItemRef, quantity: f64, surfaces: &BTreeSet<String>) {
        let key = if item.number.is_empty() { &item.id } else { &item.number };
        match self.index.get(key) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                entry.quantity += quantity;
                entry.source_surfaces.extend(surfaces.iter().cloned());
                if !entry.item.is_described() && item.is_described() {
                    entry.item = item.clone();
                }
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(ConsolidatedEntry {
                    item: item.clone(),
                    quantity,
                    level: 0,
                    source_surfaces: surfaces.clone(),
                    resolved: true,
                });
            }
        }
    }

    fn add_tree(&mut self, nodes: &[BomNode], multiplier: f64, surfaces: &BTreeSet<String>) {
        for node in nodes {
            let quantity = multiplier * node.quantity;
            self.add(&node.item, quantity, surfaces);
            self.add_tree(&node.children, quantity, surfaces);
        }
    }

    fn into_entries(self) -> Vec<ConsolidatedEntry> {
        self.entries
    }
}
