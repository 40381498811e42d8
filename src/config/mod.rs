//! Configuration management for bomsync
//!
//! A single TOML file carries the item master endpoint, resolver and sync
//! tuning, the known assembly list and the category hierarchy. See
//! [`global`] for the file format and location rules.
//!
//! Configuration *editing* tooling is deliberately thin: `bomsync config init`
//! writes an example and `bomsync config show` prints what a run will use.

pub mod global;

pub use global::{ApiConfig, GlobalConfig, ResolverConfig, SyncConfig};
