//! Core types and error handling for bomsync
//!
//! - [`BomError`] - the fatal failure classes the engine surfaces
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI presentation of errors

pub mod error;

pub use error::{BomError, ErrorContext, user_friendly_error};
