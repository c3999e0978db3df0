//! Error types for KPod core.

use thiserror::Error;

/// Core error type for KPod domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid encoder scale: {0} (must be 100 or 200)")]
    InvalidScale(u16),
}
