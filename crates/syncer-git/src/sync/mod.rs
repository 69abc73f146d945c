//! Job execution: worker pool, repeatable jobs and the scheduler.

mod git_sync;
mod job;
mod pool;
mod scheduler;
mod stats;

pub use git_sync::{GitSyncRepoJob, MirrorWork};
pub use job::{Job, JobDelays, JobId, JobIdGenerator, JobState, JobWork, RepeatableJob};
pub use pool::{PoolError, WorkerPool};
pub use scheduler::JobScheduler;
pub use stats::JobStats;
