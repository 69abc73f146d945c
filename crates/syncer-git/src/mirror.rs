//! Mirror synchronization: one clone, filter and push cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use syncer_core::SyncRepoTask;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{GitClient, PushOutcome};
use crate::error::SyncError;

/// Name under which the target is registered in the temporary mirror.
pub const DESTINATION_REMOTE_NAME: &str = "destination";

/// Performs mirror syncs with a [`GitClient`].
///
/// Each call to [`sync`](Self::sync) works in its own temporary directory,
/// removed on every exit path. A failing step aborts the whole sync; retrying
/// is left to the caller.
#[derive(Clone)]
pub struct MirrorSync {
    client: Arc<dyn GitClient>,
    workspace_root: Option<PathBuf>,
}

impl MirrorSync {
    /// Creates a new orchestrator. Workspaces go to the system temp directory.
    pub fn new(client: Arc<dyn GitClient>) -> Self {
        Self {
            client,
            workspace_root: None,
        }
    }

    /// Places workspaces under `root` instead of the system temp directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Returns the configured workspace root, if any.
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Mirrors `task.source` to `task.target`, dropping every reference the
    /// task excludes.
    ///
    /// Blocks on network and filesystem I/O. The cancellation token is checked
    /// between steps; once cancelled, the sync unwinds with
    /// [`SyncError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Any clone, reference deletion, remote registration or push failure, and
    /// [`SyncError::PushRejected`] if the destination refused some references.
    pub fn sync(
        &self,
        task: &SyncRepoTask,
        cancel: &CancellationToken,
    ) -> Result<PushOutcome, SyncError> {
        let workspace = self.create_workspace()?;
        let mirror_path = workspace.path().join("mirror.git");

        checkpoint(cancel)?;
        info!("Cloning from {} to {}", task.source(), task.target());
        let repo = self.client.clone_mirror(task.source(), &mirror_path, cancel)?;

        checkpoint(cancel)?;
        let refs = self.client.list_references(&repo)?;
        info!("Fetched refs:");
        for ref_path in &refs {
            info!("\t{}", ref_path);
        }

        info!("Deleting excluded refs...");
        for ref_path in refs.iter().filter(|r| !task.includes(r)) {
            checkpoint(cancel)?;
            info!("\t{}", ref_path);
            self.client.delete_reference(&repo, ref_path, cancel)?;
        }

        checkpoint(cancel)?;
        info!("Creating destination remote...");
        self.client
            .add_remote(&repo, DESTINATION_REMOTE_NAME, task.target(), cancel)?;

        checkpoint(cancel)?;
        info!("Pushing...");
        let outcome = self
            .client
            .push_mirror(&repo, DESTINATION_REMOTE_NAME, cancel)?;

        info!("Pushed refs:");
        for pushed in outcome.refs() {
            info!("\t{} {}", pushed.remote_ref, pushed.summary);
        }

        outcome.into_result(task.target())
    }

    fn create_workspace(&self) -> Result<tempfile::TempDir, SyncError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("git-syncer-");

        let workspace = match &self.workspace_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            },
            None => builder.tempdir()?,
        };

        Ok(workspace)
    }
}

impl std::fmt::Debug for MirrorSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSync")
            .field("workspace_root", &self.workspace_root)
            .finish()
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), SyncError> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}
