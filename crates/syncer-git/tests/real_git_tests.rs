//! Mirrors between local repositories with the real `git` binary.
//! Skipped when `git` is not installed.

mod common;

use std::sync::Arc;

use common::{bare_repo_with_branches, git_available, list_refs};
use syncer_core::SyncRepoTask;
use syncer_git::{GitCli, GitClient, MirrorSync};
use tokio_util::sync::CancellationToken;

#[test]
fn test_mirror_between_local_repositories() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let source = bare_repo_with_branches(root.path(), "source", &["main", "tmp1", "release"]);
    let target = bare_repo_with_branches(root.path(), "target", &["main", "stale"]);

    let task = SyncRepoTask::builder()
        .source(source.to_str().unwrap())
        .target(target.to_str().unwrap())
        .exclude_ref_pattern("refs/heads/tmp.*")
        .build()
        .unwrap();

    let sync = MirrorSync::new(Arc::new(GitCli::new())).with_workspace_root(root.path().join("work"));
    let outcome = sync.sync(&task, &CancellationToken::new()).unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        list_refs(&target),
        vec!["refs/heads/main", "refs/heads/release"]
    );
    assert_eq!(
        std::fs::read_dir(root.path().join("work")).unwrap().count(),
        0
    );
}

#[test]
fn test_list_references_reads_mirror() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let source = bare_repo_with_branches(root.path(), "source", &["main", "dev"]);

    let client = GitCli::new();
    let repo = client
        .clone_mirror(
            source.to_str().unwrap(),
            &root.path().join("mirror.git"),
            &CancellationToken::new(),
        )
        .unwrap();
    let mut refs = client.list_references(&repo).unwrap();
    refs.sort();

    assert_eq!(refs, vec!["refs/heads/dev", "refs/heads/main"]);
}

#[test]
fn test_unreachable_source_is_clone_error() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let client = GitCli::new();
    let err = client
        .clone_mirror(
            root.path().join("missing.git").to_str().unwrap(),
            &root.path().join("mirror.git"),
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(err, syncer_git::SyncError::Clone { .. }));
}
