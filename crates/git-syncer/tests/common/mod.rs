#![allow(dead_code)]
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use syncer_git::{
    CancellationToken, GitClient, MirrorRepo, PushFlag, PushOutcome, PushedRef, SyncError,
};

/// In-memory [`GitClient`]: every source holds the same references and
/// every push succeeds. Records what reached each target.
#[derive(Default)]
pub struct RecordingClient {
    refs: Vec<String>,
    remotes: Mutex<HashMap<PathBuf, String>>,
    deleted: Mutex<HashMap<PathBuf, Vec<String>>>,
    pushed: Mutex<HashMap<String, Vec<String>>>,
}

impl RecordingClient {
    pub fn with_refs(refs: &[&str]) -> Self {
        Self {
            refs: refs.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    /// References pushed to `target` by the last push.
    pub fn pushed_to(&self, target: &str) -> Vec<String> {
        self.pushed.lock().get(target).cloned().unwrap_or_default()
    }
}

impl GitClient for RecordingClient {
    fn clone_mirror(
        &self,
        _source: &str,
        path: &Path,
        _cancel: &CancellationToken,
    ) -> Result<MirrorRepo, SyncError> {
        std::fs::create_dir_all(path)?;
        Ok(MirrorRepo::new(path))
    }

    fn list_references(&self, _repo: &MirrorRepo) -> Result<Vec<String>, SyncError> {
        Ok(self.refs.clone())
    }

    fn delete_reference(
        &self,
        repo: &MirrorRepo,
        ref_path: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.deleted
            .lock()
            .entry(repo.path().to_path_buf())
            .or_default()
            .push(ref_path.to_string());
        Ok(())
    }

    fn add_remote(
        &self,
        repo: &MirrorRepo,
        _name: &str,
        url: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.remotes
            .lock()
            .insert(repo.path().to_path_buf(), url.to_string());
        Ok(())
    }

    fn push_mirror(
        &self,
        repo: &MirrorRepo,
        remote: &str,
        _cancel: &CancellationToken,
    ) -> Result<PushOutcome, SyncError> {
        let target = self
            .remotes
            .lock()
            .get(repo.path())
            .cloned()
            .ok_or_else(|| SyncError::push(remote, "unknown remote"))?;
        let deleted = self
            .deleted
            .lock()
            .remove(repo.path())
            .unwrap_or_default();

        let surviving: Vec<String> = self
            .refs
            .iter()
            .filter(|r| !deleted.contains(r))
            .cloned()
            .collect();

        let outcome = PushOutcome::new(
            surviving
                .iter()
                .map(|r| PushedRef {
                    flag: PushFlag::New,
                    local_ref: Some(r.clone()),
                    remote_ref: r.clone(),
                    summary: "[new branch]".to_string(),
                })
                .collect(),
        );

        self.pushed.lock().insert(target, surviving);
        Ok(outcome)
    }
}
