#![allow(dead_code)]
use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;
use syncer_git::{GitClient, MirrorRepo, PushFlag, PushOutcome, PushedRef, SyncError};
use tokio_util::sync::CancellationToken;

/// Everything the fake client was asked to do.
#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub cloned_into: Option<PathBuf>,
    pub deleted: Vec<String>,
    pub remotes: Vec<(String, String)>,
    pub pushed: Vec<String>,
}

/// In-memory [`GitClient`] serving a fixed set of source references.
pub struct FakeGitClient {
    refs: Vec<String>,
    rejected: Option<String>,
    calls: Mutex<Calls>,
}

impl FakeGitClient {
    pub fn with_refs(refs: &[&str]) -> Self {
        Self {
            refs: refs.iter().map(|r| r.to_string()).collect(),
            rejected: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Makes the destination reject `ref_path` on push.
    pub fn rejecting(mut self, ref_path: &str) -> Self {
        self.rejected = Some(ref_path.to_string());
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().clone()
    }
}

impl GitClient for FakeGitClient {
    fn clone_mirror(
        &self,
        _source: &str,
        path: &Path,
        _cancel: &CancellationToken,
    ) -> Result<MirrorRepo, SyncError> {
        std::fs::create_dir_all(path)?;
        self.calls.lock().cloned_into = Some(path.to_path_buf());
        Ok(MirrorRepo::new(path))
    }

    fn list_references(&self, _repo: &MirrorRepo) -> Result<Vec<String>, SyncError> {
        Ok(self.refs.clone())
    }

    fn delete_reference(
        &self,
        _repo: &MirrorRepo,
        ref_path: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.calls.lock().deleted.push(ref_path.to_string());
        Ok(())
    }

    fn add_remote(
        &self,
        _repo: &MirrorRepo,
        name: &str,
        url: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.calls
            .lock()
            .remotes
            .push((name.to_string(), url.to_string()));
        Ok(())
    }

    fn push_mirror(
        &self,
        _repo: &MirrorRepo,
        _remote: &str,
        _cancel: &CancellationToken,
    ) -> Result<PushOutcome, SyncError> {
        let mut calls = self.calls.lock();
        let surviving: Vec<String> = self
            .refs
            .iter()
            .filter(|r| !calls.deleted.contains(r))
            .cloned()
            .collect();

        let pushed = surviving
            .iter()
            .map(|r| {
                let rejected = self.rejected.as_deref() == Some(r.as_str());
                PushedRef {
                    flag: if rejected { PushFlag::Rejected } else { PushFlag::New },
                    local_ref: Some(r.clone()),
                    remote_ref: r.clone(),
                    summary: if rejected {
                        "[remote rejected] (pre-receive hook declined)".to_string()
                    } else {
                        "[new branch]".to_string()
                    },
                }
            })
            .collect();

        calls.pushed = surviving;
        Ok(PushOutcome::new(pushed))
    }
}

/// Returns true if a `git` binary can be run.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Runs git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Creates a bare repository under `root` with the given branches, all
/// pointing at one empty commit. Returns its path.
pub fn bare_repo_with_branches(root: &Path, name: &str, branches: &[&str]) -> PathBuf {
    let work = root.join(format!("{}-work", name));
    std::fs::create_dir_all(&work).expect("Failed to create work dir");

    git(&work, &["init", "--quiet"]);
    git(
        &work,
        &[
            "-c",
            "user.email=test@example.com",
            "-c",
            "user.name=Test",
            "commit",
            "--quiet",
            "--allow-empty",
            "-m",
            "initial",
        ],
    );
    git(&work, &["branch", "-M", "main"]);
    for branch in branches.iter().filter(|b| **b != "main") {
        git(&work, &["branch", branch]);
    }

    let bare = root.join(format!("{}.git", name));
    git(
        root,
        &[
            "clone",
            "--quiet",
            "--bare",
            work.to_str().expect("utf-8 path"),
            bare.to_str().expect("utf-8 path"),
        ],
    );
    bare
}

/// Lists every reference of a repository.
pub fn list_refs(repo: &Path) -> Vec<String> {
    let mut refs: Vec<String> = git(repo, &["for-each-ref", "--format=%(refname)"])
        .lines()
        .map(str::to_string)
        .collect();
    refs.sort();
    refs
}
