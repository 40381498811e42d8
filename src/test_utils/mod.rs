//! Test utilities for bomsync
//!
//! Compiled for unit tests and, through the `test-utils` feature, for the
//! integration suite.
//!
//! - [`MockBomApi`]: an in-memory item master with call counting and failure
//!   injection, standing in for the HTTP client
//! - [`init_test_logging`]: opt-in tracing output for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use bomsync_cli::models::ItemRef;
//! use bomsync_cli::resolver::TreeResolver;
//! use bomsync_cli::test_utils::MockBomApi;
//!
//! # async fn example() {
//! let api = MockBomApi::new();
//! api.add_item(ItemRef::new("root", "RACK-1"));
//! api.add_item(ItemRef::new("a", "CHASSIS-1"));
//! api.add_bom_line("root", "a", 2.0);
//!
//! let nodes = TreeResolver::new(&api).resolve_tree("root").await.unwrap();
//! assert_eq!(api.fetch_count("root"), 1);
//! # }
//! ```

pub mod mock_api;

pub use mock_api::MockBomApi;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run silently.
///
/// ```bash
/// RUST_LOG=bomsync_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
