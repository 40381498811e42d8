//! Remote item/BOM API boundary
//!
//! The engine talks to the item master exclusively through [`BomApi`]. The
//! trait is object safe (methods return boxed futures), so callers can hold
//! `&dyn BomApi` or a concrete client alike.
//!
//! Implementations are responsible for turning whatever JSON the remote
//! system produces into the canonical [`ItemRef`] / [`RemoteBomLine`] shapes;
//! [`normalize`] provides the casing-tolerant helpers for that.
//!
//! Session acquisition and renewal are not handled here: an implementation
//! is handed a ready-to-use token.

pub mod http;
pub mod normalize;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::models::ItemRef;

pub use http::HttpBomApi;

/// Result type for [`BomApi`] calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS,
    /// reset, timeout). The resolver treats this as a batch-level failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote system answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response body could not be interpreted
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// True for failures of the transport itself rather than of one item.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// True for responses worth retrying after a backoff (throttling, 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == 429 || *status >= 500)
    }

    /// True when the remote system rejected the request before acting on it.
    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::Status { status: 429, .. })
    }
}

/// One existing BOM line of a remote parent item.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBomLine {
    /// Remote identifier of the line itself, needed for deletion
    pub line_id: String,
    /// The child item
    pub item: ItemRef,
    /// Child quantity per one parent
    pub quantity: f64,
    /// Level stored on the line, when the remote system keeps one. Structure
    /// never depends on it: every fetched line is a direct child.
    pub level: Option<usize>,
}

/// Payload for creating a BOM line under a parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBomLine {
    pub item_id: String,
    pub quantity: f64,
    /// Level below the push target. Informational only: the line is always
    /// a direct child of the parent it is created under.
    pub level: usize,
}

/// Payload for creating a new item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub number: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
}

/// Collaborator contract for the remote item master.
///
/// Every method is a suspension point; nothing else in the engine awaits.
pub trait BomApi: Send + Sync {
    /// Fetch the direct BOM lines of an item.
    fn fetch_bom<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, ApiResult<Vec<RemoteBomLine>>>;

    /// Look an item up by its human-readable number.
    fn resolve_by_number<'a>(&'a self, number: &'a str)
    -> BoxFuture<'a, ApiResult<Option<ItemRef>>>;

    /// Create a new item and return its reference.
    fn create_item<'a>(&'a self, item: &'a NewItem) -> BoxFuture<'a, ApiResult<ItemRef>>;

    /// Delete one BOM line from a parent.
    fn delete_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>>;

    /// Append one BOM line to a parent.
    fn create_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line: &'a NewBomLine,
    ) -> BoxFuture<'a, ApiResult<()>>;

    /// Download the bulk export of the whole item-and-BOM graph.
    fn bulk_export(&self) -> BoxFuture<'_, ApiResult<serde_json::Value>>;
}
