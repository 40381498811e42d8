//! Integration test suite for bomsync
//!
//! Drives the public API against the in-memory `MockBomApi` (enabled through
//! the `test-utils` feature) and the binary through `assert_cmd`.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolver**: deduplication, depth bound, sequential fallback
//! - **export**: shape detection and equivalence with the resolver
//! - **consolidate**: multiplier law and consolidation ordering
//! - **sync**: push round trips and partial failure
//! - **cli**: command-line behavior without a remote system

mod cli;
mod consolidate;
mod export;
mod fixtures;
mod resolver;
mod sync;
