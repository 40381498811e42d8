//! Global constants used throughout the bomsync codebase.
//!
//! Timeout durations, retry parameters and engine defaults that are shared
//! across the resolver, the synchronizer and the HTTP client live here so
//! that magic numbers stay discoverable.

use std::time::Duration;

/// Default maximum number of BOM levels fetched below a resolution root.
///
/// Deeper assemblies are silently truncated: nodes on the last level are
/// returned as leaves.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default delay between consecutive BOM line creations (250ms).
///
/// The remote item master throttles write bursts; one request every quarter
/// second stays below its documented limit.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 250;

/// Timeout for one fan-out batch of BOM fetches (60 seconds).
///
/// Elapsing this timeout is treated as a transport failure of the batch and
/// triggers the sequential fallback.
pub fn batch_operation_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Timeout for a single HTTP request to the item master (30 seconds).
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Starting delay for exponential backoff on throttled requests (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Number of retries for a throttled or 5xx response before giving up.
pub const MAX_HTTP_RETRIES: usize = 5;

/// Environment variable consulted for the API token when the config has none.
pub const TOKEN_ENV_VAR: &str = "BOMSYNC_TOKEN";

/// Environment variable that disables progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "BOMSYNC_NO_PROGRESS";

/// Environment variable pointing at an alternate config file.
pub const CONFIG_ENV_VAR: &str = "BOMSYNC_CONFIG";
