//! Supporting utilities.
//!
//! - [`progress`] - indicatif progress bars honoring `--no-progress`

pub mod progress;

pub use progress::{ProgressBar, spinner_with_message};
