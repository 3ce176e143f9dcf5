//! Error Types
//!
//! Shared error enum and result alias for the drill engine.

use thiserror::Error;

/// Drill engine error type
#[derive(Error, Debug)]
pub enum DrillError {
    /// A probability vector or table does not describe a valid distribution
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    /// A configuration parameter is structurally invalid
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A historical attempt record or session file cannot be used
    #[error("corrupt history: {0}")]
    CorruptHistory(String),

    /// Underlying I/O failure while touching the history store
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DrillResult<T> = Result<T, DrillError>;
