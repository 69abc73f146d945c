//! Error types for mirror synchronization.

use crate::client::PushedRef;
use crate::sync::PoolError;

/// Errors that can occur during one clone, filter and push cycle.
///
/// Every variant carries the address or reference involved so a single log
/// line is enough to act on the failure.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The scoped workspace could not be created or used.
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// Cloning the source repository failed.
    #[error("failed to clone {url}: {message}")]
    Clone { url: String, message: String },

    /// The references of the local mirror could not be enumerated.
    #[error("failed to list references: {0}")]
    ListReferences(String),

    /// An excluded reference could not be removed from the local mirror.
    #[error("failed to delete reference {reference}: {message}")]
    DeleteReference { reference: String, message: String },

    /// The destination remote could not be registered.
    #[error("failed to add remote {name} ({url}): {message}")]
    AddRemote {
        name: String,
        url: String,
        message: String,
    },

    /// The push itself failed before reporting any reference.
    #[error("failed to push to {remote}: {message}")]
    Push { remote: String, message: String },

    /// The push completed but the destination rejected some references.
    #[error("push to {target} rejected {} reference(s): {}", failures.len(), describe(failures))]
    PushRejected {
        target: String,
        failures: Vec<PushedRef>,
    },

    /// The sync observed a cancellation request and stopped.
    #[error("sync cancelled")]
    Cancelled,

    /// The worker pool could not run the sync.
    #[error("worker pool error: {0}")]
    Worker(String),
}

impl SyncError {
    /// Creates a new clone error.
    pub fn clone_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new reference listing error.
    pub fn list_references(message: impl Into<String>) -> Self {
        Self::ListReferences(message.into())
    }

    /// Creates a new push error.
    pub fn push(remote: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Push {
            remote: remote.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error stems from a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<PoolError> for SyncError {
    fn from(err: PoolError) -> Self {
        Self::Worker(err.to_string())
    }
}

fn describe(failures: &[PushedRef]) -> String {
    failures
        .iter()
        .map(|r| format!("{} {}", r.remote_ref, r.summary))
        .collect::<Vec<_>>()
        .join(", ")
}
