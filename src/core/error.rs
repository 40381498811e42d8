//! Error handling for bomsync
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`BomError`]) for the failures the engine
//!    surfaces to its callers
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for CLI users
//!
//! Recoverable per-node and per-line failures are *not* errors here: the
//! resolver turns them into leaves and the synchronizer into warnings. Only
//! the fatal classes reach [`BomError`]:
//! - **Unrecognized export format**: retrying cannot fix a structural mismatch
//! - **Parent resolution failure**: raised before any destructive deletion
//! - **Transport failure**: only once the sequential fallback failed as well

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for bomsync operations.
#[derive(Error, Debug)]
pub enum BomError {
    /// The bulk export payload matches none of the known shapes
    #[error("Unrecognized export format: {reason}")]
    UnrecognizedExportFormat {
        /// What the detector saw at the top level
        reason: String,
    },

    /// The push target does not exist and no creation data was supplied
    #[error("Parent item '{number}' not found in the item master")]
    ParentNotFound {
        /// Item number of the requested parent
        number: String,
    },

    /// The push target was missing and creating it failed
    #[error("Failed to create parent item '{number}': {reason}")]
    ParentCreateFailed {
        /// Item number of the requested parent
        number: String,
        /// Underlying API failure
        reason: String,
    },

    /// Looking the push target up failed for a reason other than transport
    #[error("Failed to look up parent item '{number}': {reason}")]
    ParentLookupFailed {
        /// Item number of the requested parent
        number: String,
        /// Underlying API failure
        reason: String,
    },

    /// The remote system could not be reached at all
    #[error("Transport failure during {operation}: {reason}")]
    Transport {
        /// What was being attempted
        operation: String,
        /// Underlying cause
        reason: String,
    },

    /// Configuration is missing or invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// IO error from the standard library
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV parsing or serialization failed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// TOML parsing failed
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Error context wrapper that attaches user-facing help to a [`BomError`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {:#}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion where the
/// failure class is known.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let bom_error = error.chain().find_map(|cause| cause.downcast_ref::<BomError>());

    let (suggestion, details) = match bom_error {
        Some(BomError::UnrecognizedExportFormat { .. }) => (
            Some(
                "Check that the file is a bulk export from the item master \
                 (item list, {\"items\": [...]} envelope, or flat parent/child lines)",
            ),
            Some("Export format mismatches are not transient; retrying will not help"),
        ),
        Some(BomError::ParentNotFound { .. }) => (
            Some(
                "Verify the item number, or pass --create-name to create the parent before pushing",
            ),
            Some("Nothing was deleted: the push aborts before touching the remote BOM"),
        ),
        Some(BomError::ParentLookupFailed { .. }) => (
            Some("Check that your token may read items, then retry the push"),
            Some("Nothing was deleted: the push aborts before touching the remote BOM"),
        ),
        Some(BomError::ParentCreateFailed { .. }) => (
            Some("Check that your token may create items and that the category exists"),
            Some("Nothing was deleted: the push aborts before touching the remote BOM"),
        ),
        Some(BomError::Transport { .. }) => (
            Some("Check network connectivity and the api.base_url setting (bomsync config show)"),
            None,
        ),
        Some(BomError::ConfigError { .. }) | Some(BomError::TomlError(_)) => (
            Some("Run 'bomsync config init' to write an example configuration"),
            None,
        ),
        Some(BomError::CsvError(_)) => (
            Some("Line files need a header row: level,item_number,quantity"),
            None,
        ),
        _ => (None, None),
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        ctx = ctx.with_suggestion(suggestion);
    }
    if let Some(details) = details {
        ctx = ctx.with_details(details);
    }
    ctx
}
