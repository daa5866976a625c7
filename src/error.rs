//! Error types for the scheduling engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScheduleError>;

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Caller supplied a value outside the accepted set. No state was changed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A document could not be read or written.
    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be encoded.
    #[error("JSON error on '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A lookup target does not exist (channel, schedule, entry).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored schedule does not cover the requested instant and must be
    /// regenerated before it can answer.
    #[error("Stale schedule: {0}")]
    Stale(String),
}

impl ScheduleError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ScheduleError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        ScheduleError::Json {
            path: path.display().to_string(),
            source,
        }
    }
}
