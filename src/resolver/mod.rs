//! Multi-level BOM tree resolution.
//!
//! [`TreeResolver`] turns a root item identifier into the root's direct
//! children with their subtrees attached, fetching one BOM per unique item.
//!
//! # Strategy
//!
//! The primary path walks the tree breadth first. Each level's unseen
//! identifiers are reserved in a [`DedupCache`], fetched together as one
//! batch (`join_all` under a batch timeout) and parsed only after the whole
//! batch has returned. A tree with heavy sub-assembly reuse therefore costs
//! one round trip per level instead of one per node, and an item shared by
//! many parents is fetched exactly once.
//!
//! When a batch fails at the transport level (any request in it could not
//! reach the remote system, or the batch timeout elapsed) the partial cache
//! is discarded and the tree is fetched again sequentially from the root,
//! one node at a time, depth first. Individual fetch failures on either path
//! only turn that node into a leaf.
//!
//! # Levels and depth
//!
//! The root's direct children are level 0. Nodes at level `max_depth - 1`
//! are leaves; deeper structure is silently truncated.

pub mod cache;

use std::collections::HashMap;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tracing::{debug, info, warn};

use crate::api::{ApiResult, BomApi};
use crate::constants::{DEFAULT_MAX_DEPTH, batch_operation_timeout};
use crate::core::BomError;
use crate::models::{BomNode, ItemRef, SyncBomLine};
use crate::utils::progress::ProgressBar;

pub use cache::{DedupCache, ItemRefCache};

/// Which path produced a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Batched breadth-first fetching
    Parallel,
    /// Node-by-node depth-first fetching after a batch failed
    Sequential,
}

/// Result of one tree resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The root's direct children, subtrees attached
    pub nodes: Vec<BomNode>,
    pub strategy: FetchStrategy,
    /// Remote BOM fetches issued, across both strategies
    pub fetches: usize,
}

/// Why the batched path gave up.
#[derive(Debug)]
enum BatchFailure {
    Timeout { depth: usize, size: usize },
    Transport { depth: usize, reason: String },
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchFailure::Timeout { depth, size } => {
                write!(f, "batch of {size} fetches at depth {depth} timed out")
            }
            BatchFailure::Transport { depth, reason } => {
                write!(f, "batch at depth {depth} failed: {reason}")
            }
        }
    }
}

/// Memo for the sequential path: item id to its direct `(item, quantity)` lines.
#[derive(Default)]
struct SequentialState {
    lines: HashMap<String, Vec<(ItemRef, f64)>>,
    fetches: usize,
}

/// Resolves BOM trees against a [`BomApi`].
pub struct TreeResolver<'a, A: BomApi + ?Sized> {
    api: &'a A,
    max_depth: usize,
    batch_timeout: Duration,
    progress: ProgressBar,
}

impl<'a, A: BomApi + ?Sized> TreeResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            max_depth: DEFAULT_MAX_DEPTH,
            batch_timeout: batch_operation_timeout(),
            progress: ProgressBar::hidden(),
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

    /// Report per-level progress on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve the tree below `root_id`, returning the root's direct children.
    pub async fn resolve_tree(&self, root_id: &str) -> Result<Vec<BomNode>, BomError> {
        self.resolve(root_id).await.map(|resolution| resolution.nodes)
    }

    /// Resolve the tree below `root_id`, reporting which strategy was used.
    ///
    /// Fails only when the sequential fallback cannot reach the remote
    /// system for the root itself.
    pub async fn resolve(&self, root_id: &str) -> Result<Resolution, BomError> {
        if self.max_depth == 0 {
            return Ok(Resolution {
                nodes: Vec::new(),
                strategy: FetchStrategy::Parallel,
                fetches: 0,
            });
        }

        let mut fetches = 0;
        match self.resolve_parallel(root_id, &mut fetches).await {
            Ok(cache) => {
                let nodes = reconstruct(&cache, root_id, 0, self.max_depth);
                info!(
                    "Resolved {} nodes below {root_id} with {fetches} fetches",
                    nodes.iter().map(BomNode::subtree_len).sum::<usize>()
                );
                Ok(Resolution {
                    nodes,
                    strategy: FetchStrategy::Parallel,
                    fetches,
                })
            }
            Err(failure) => {
                warn!(
                    "Parallel resolution of {root_id} abandoned ({failure}), fetching sequentially"
                );
                self.progress.set_message(format!("Resolving {root_id} sequentially"));

                let mut state = SequentialState::default();
                let result = self.fetch_subtree(root_id.to_string(), 0, &mut state).await;
                fetches += state.fetches;

                let nodes = match result {
                    Ok(nodes) => nodes,
                    Err(err) if err.is_transport() => {
                        return Err(BomError::Transport {
                            operation: format!("resolving the BOM of {root_id}"),
                            reason: err.to_string(),
                        });
                    }
                    Err(err) => {
                        warn!("Failed to fetch BOM of {root_id}: {err}");
                        Vec::new()
                    }
                };

                Ok(Resolution {
                    nodes,
                    strategy: FetchStrategy::Sequential,
                    fetches,
                })
            }
        }
    }

    async fn resolve_parallel(
        &self,
        root_id: &str,
        fetches: &mut usize,
    ) -> Result<DedupCache, BatchFailure> {
        let mut cache = DedupCache::new();
        let mut queue = vec![root_id.to_string()];

        for depth in 0..self.max_depth {
            let batch = cache.reserve(queue.drain(..));
            if batch.is_empty() {
                break;
            }

            debug!("Fetching {} BOMs at depth {depth}", batch.len());
            self.progress.set_message(format!("Resolving level {depth} ({} items)", batch.len()));
            *fetches += batch.len();

            let requests = batch.iter().map(|id| self.api.fetch_bom(id));
            let results = tokio::time::timeout(self.batch_timeout, join_all(requests))
                .await
                .map_err(|_| BatchFailure::Timeout {
                    depth,
                    size: batch.len(),
                })?;

            let transport =
                results.iter().filter_map(|r| r.as_ref().err()).find(|e| e.is_transport());
            if let Some(err) = transport {
                return Err(BatchFailure::Transport {
                    depth,
                    reason: err.to_string(),
                });
            }

            for (id, result) in batch.into_iter().zip(results) {
                match result {
                    Ok(lines) => {
                        let children: Vec<BomNode> = lines
                            .into_iter()
                            .map(|line| BomNode::leaf(line.item, line.quantity, depth))
                            .collect();
                        for child in &children {
                            let child_id = &child.item.id;
                            if !child_id.is_empty()
                                && !child.item.is_known_leaf()
                                && !cache.contains(child_id)
                            {
                                queue.push(child_id.clone());
                            }
                        }
                        cache.store(id, children);
                    }
                    Err(err) => {
                        warn!("Failed to fetch BOM of {id}: {err}");
                        cache.mark_failed(id);
                    }
                }
            }
            self.progress.inc(1);
        }

        Ok(cache)
    }

    /// Children of `id` at `level`, fetched depth first.
    ///
    /// Errors are returned only for `id` itself; failures below it become
    /// leaves. A BOM fetched once is reused wherever the item reappears.
    fn fetch_subtree<'s>(
        &'s self,
        id: String,
        level: usize,
        state: &'s mut SequentialState,
    ) -> BoxFuture<'s, ApiResult<Vec<BomNode>>> {
        async move {
            if level >= self.max_depth {
                return Ok(Vec::new());
            }

            let lines = match state.lines.get(&id) {
                Some(lines) => lines.clone(),
                None => {
                    state.fetches += 1;
                    match self.api.fetch_bom(&id).await {
                        Ok(remote) => {
                            let lines: Vec<(ItemRef, f64)> =
                                remote.into_iter().map(|line| (line.item, line.quantity)).collect();
                            state.lines.insert(id.clone(), lines.clone());
                            lines
                        }
                        Err(err) => {
                            state.lines.insert(id, Vec::new());
                            return Err(err);
                        }
                    }
                }
            };

            let mut nodes = Vec::with_capacity(lines.len());
            for (item, quantity) in lines {
                let children = if item.id.is_empty() || item.is_known_leaf() {
                    Vec::new()
                } else {
                    match self.fetch_subtree(item.id.clone(), level + 1, state).await {
                        Ok(children) => children,
                        Err(err) => {
                            warn!("Failed to fetch BOM of {}: {err}", item.id);
                            Vec::new()
                        }
                    }
                };
                nodes.push(BomNode::leaf(item, quantity, level).with_children(children));
            }
            Ok(nodes)
        }
        .boxed()
    }
}

/// Attach cached children top-down, recomputing levels from the root.
fn reconstruct(cache: &DedupCache, id: &str, level: usize, max_depth: usize) -> Vec<BomNode> {
    if level >= max_depth {
        return Vec::new();
    }

    cache
        .children(id)
        .iter()
        .map(|child| {
            let grandchildren = if child.item.id.is_empty() {
                Vec::new()
            } else {
                reconstruct(cache, &child.item.id, level + 1, max_depth)
            };
            BomNode::leaf(child.item.clone(), child.quantity, level).with_children(grandchildren)
        })
        .collect()
}

/// Flatten a resolved tree into push lines, parent before children.
pub fn flatten_tree(nodes: &[BomNode]) -> Vec<SyncBomLine> {
    fn walk(nodes: &[BomNode], out: &mut Vec<SyncBomLine>) {
        for node in nodes {
            out.push(SyncBomLine::new(node.level, node.item.number.clone(), node.quantity));
            walk(&node.children, out);
        }
    }

    let mut lines = Vec::new();
    walk(nodes, &mut lines);
    lines
}
