//! Error types for the git-syncer application.

use std::path::PathBuf;
use std::time::Duration;

use syncer_core::TaskError;

/// Errors raised while loading settings. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `GIT_SYNCER_SETTINGS_YAML` names a file that does not exist.
    #[error("settings file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The settings sources could not be read or deserialized.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A `{{env "NAME"}}` placeholder refers to an unset variable.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// A repository entry does not form a valid sync task.
    #[error("invalid repository {index}: {source}")]
    InvalidRepo {
        index: usize,
        #[source]
        source: TaskError,
    },
}

/// Errors raised by the application runtime.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Jobs were still running when the overall time budget ran out.
    #[error("application has timed out after {0:?}")]
    Timeout(Duration),

    /// Shutdown did not complete cleanly.
    #[error("application has shut down with errors: {0}")]
    Dispose(String),

    /// Settings could not be turned into jobs.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl AppError {
    /// Returns true if this error is an overall timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
