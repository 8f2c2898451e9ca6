// src/error.rs
//
// Error taxonomy for the experiment runner.
//
// Only genuinely fatal conditions live here. A participant pressing the
// abort key is a normal outcome (`Flow::Abort`), and a failed
// comprehension check is a retry, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Invalid trial-count / pool-size / timing parameters, detected before
    /// the session starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A block asked for more stimuli than the pool still holds.
    #[error("{pool} pool exhausted: requested {requested}, {remaining} remaining")]
    PoolExhausted {
        pool: &'static str,
        requested: usize,
        remaining: usize,
    },

    /// Participant metadata that is not numeric where it must be.
    #[error("invalid participant metadata: {0}")]
    InvalidMetadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;

impl ExperimentError {
    pub fn config(msg: impl Into<String>) -> Self {
        ExperimentError::Configuration(msg.into())
    }
}
