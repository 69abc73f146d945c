//! Error types for sync task construction.
//!
//! Reference filtering itself never fails: it is a total function over an
//! already validated [`SyncRepoTask`](crate::SyncRepoTask). Everything that can
//! go wrong happens earlier, while a task is being built from configuration.
//!
//! # Example
//!
//! ```
//! use syncer_core::{SyncRepoTask, TaskError};
//!
//! let result = SyncRepoTask::builder()
//!     .source("https://example.com/a.git")
//!     .target("https://example.com/b.git")
//!     .exclude_ref_pattern("refs/heads/(")
//!     .build();
//!
//! assert!(matches!(result, Err(TaskError::InvalidPattern { .. })));
//! ```

use thiserror::Error;

/// Errors raised while building a [`SyncRepoTask`](crate::SyncRepoTask).
#[derive(Debug, Error)]
pub enum TaskError {
    /// A required field was never set on the builder.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A reference pattern is not a valid regular expression.
    #[error("invalid reference pattern '{pattern}': {cause}")]
    InvalidPattern {
        /// The pattern as written in the configuration
        pattern: String,
        /// Underlying regex compilation error
        #[source]
        cause: regex::Error,
    },
}

impl TaskError {
    /// Creates a new invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, cause: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            cause,
        }
    }
}

/// Result type alias for task construction.
pub type Result<T> = std::result::Result<T, TaskError>;
