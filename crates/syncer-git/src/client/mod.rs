//! Version-control client capability.
//!
//! The mirror orchestrator only needs five blocking operations from a git
//! implementation. They are collected in [`GitClient`] so the orchestration
//! can be exercised without a network or a `git` binary.

mod git_cli;
mod push;

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

pub use git_cli::GitCli;
pub use push::{PushFlag, PushOutcome, PushedRef, parse_porcelain};

use crate::error::SyncError;

/// A local bare mirror created by [`GitClient::clone_mirror`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRepo {
    path: PathBuf,
}

impl MirrorRepo {
    /// Wraps an existing local mirror.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the mirror's directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Blocking git operations used by a mirror sync.
///
/// All methods may block on network or filesystem I/O and must only be called
/// from a worker thread, never from the cooperative scheduler. Methods taking
/// a [`CancellationToken`] abandon their work and return
/// [`SyncError::Cancelled`] once it fires.
pub trait GitClient: Send + Sync {
    /// Clones `source` into `path` as a full mirror: every reference, no
    /// working tree.
    fn clone_mirror(
        &self,
        source: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MirrorRepo, SyncError>;

    /// Lists the full path of every reference in the mirror.
    fn list_references(&self, repo: &MirrorRepo) -> Result<Vec<String>, SyncError>;

    /// Removes a reference from the mirror.
    fn delete_reference(
        &self,
        repo: &MirrorRepo,
        ref_path: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError>;

    /// Registers a named remote.
    fn add_remote(
        &self,
        repo: &MirrorRepo,
        name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError>;

    /// Pushes every reference to `remote` in mirror mode, so the remote ends up
    /// with exactly the mirror's reference set.
    fn push_mirror(
        &self,
        repo: &MirrorRepo,
        remote: &str,
        cancel: &CancellationToken,
    ) -> Result<PushOutcome, SyncError>;
}
