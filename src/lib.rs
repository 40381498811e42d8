//! bomsync - hierarchical BOM resolution and synchronization
//!
//! bomsync mirrors multi-level bills of materials held in a remote item
//! master, consolidates quantities across placed assemblies, and pushes
//! locally edited BOMs back.
//!
//! # Architecture Overview
//!
//! The engine is an in-process layer between the item master's REST API and
//! local data. Everything remote goes through the [`api::BomApi`] trait;
//! remote JSON is normalized into the [`models`] types at that boundary.
//!
//! - [`resolver`] fetches a tree breadth first, one batch per level, with
//!   deduplication of shared sub-assemblies and a sequential fallback
//! - [`export`] builds the same trees from a bulk export in any of its three
//!   layouts
//! - [`aggregate`] counts placements on grids and rolls quantities up through
//!   whole trees, then classifies and orders the result
//! - [`sync`] replaces a parent's BOM line by line, reporting partial
//!   failures instead of aborting
//!
//! # Core Modules
//!
//! - [`api`] - remote API trait, HTTP client and JSON normalization
//! - [`models`] - items, tree nodes, push lines and consolidation entries
//! - [`resolver`] - tree resolution and per-operation caches
//! - [`export`] - bulk export shape detection and tree builders
//! - [`aggregate`] - placement consolidation and level classification
//! - [`sync`] - full-replace BOM synchronization
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - configuration file (`~/.bomsync/config.toml`)
//! - [`core`] - error types and user-facing error display
//! - [`surface`] - CSV/JSON readers and writers
//! - [`utils`] - progress indicators
//!
//! # Example
//!
//! ```rust,no_run
//! use bomsync_cli::api::HttpBomApi;
//! use bomsync_cli::resolver::{TreeResolver, flatten_tree};
//! use bomsync_cli::sync::{ParentTarget, Synchronizer};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let api = HttpBomApi::new("https://plm.example.com/api/v2", None, Duration::from_secs(30))?;
//! let nodes = TreeResolver::new(&api).with_max_depth(4).resolve_tree("8f1c-guid").await?;
//!
//! let report = Synchronizer::new(&api)
//!     .push(&ParentTarget::existing("RACK-A1-COPY"), &flatten_tree(&nodes))
//!     .await?;
//! for warning in &report.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod export;
pub mod models;
pub mod resolver;
pub mod surface;
pub mod sync;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
