//! Git mirroring and job scheduling for git-syncer.
//!
//! This crate provides:
//! - A [`GitClient`] capability with a `git` CLI implementation ([`GitCli`])
//! - The mirror sync orchestrator ([`MirrorSync`]): clone, filter, push
//! - A bounded [`WorkerPool`] for blocking git work
//! - Repeatable jobs with jittered startup, success and retry delays
//! - A [`JobScheduler`] that spawns jobs and reports liveness
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use syncer_core::SyncRepoTask;
//! use syncer_git::{GitCli, GitSyncRepoJob, JobDelays, JobScheduler, MirrorSync, WorkerPool};
//!
//! let task = SyncRepoTask::builder()
//!     .source("https://example.com/a.git")
//!     .target("https://example.com/b.git")
//!     .exclude_ref_pattern("refs/heads/tmp.*")
//!     .build()?;
//!
//! let scheduler = JobScheduler::new(Duration::from_secs(10));
//! let job = GitSyncRepoJob::for_task(
//!     scheduler.next_job_id(),
//!     task,
//!     MirrorSync::new(Arc::new(GitCli::new())),
//!     WorkerPool::with_default_size(),
//!     JobDelays::default(),
//!     true,
//! );
//! scheduler.defer_job(Arc::new(job));
//! scheduler.spawn_deferred_jobs();
//! ```

pub mod client;
pub mod error;
pub mod mirror;
pub mod sync;

pub use client::{GitCli, GitClient, MirrorRepo, PushFlag, PushOutcome, PushedRef};
pub use error::SyncError;
pub use mirror::{DESTINATION_REMOTE_NAME, MirrorSync};
pub use sync::{
    GitSyncRepoJob, Job, JobDelays, JobId, JobIdGenerator, JobScheduler, JobState, JobStats,
    JobWork, MirrorWork, PoolError, RepeatableJob, WorkerPool,
};
pub use tokio_util::sync::CancellationToken;
