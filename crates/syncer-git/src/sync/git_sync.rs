//! The repeatable job that mirrors one repository.

use syncer_core::SyncRepoTask;
use tokio_util::sync::CancellationToken;

use super::job::{JobDelays, JobId, JobWork, RepeatableJob};
use super::pool::WorkerPool;
use crate::error::SyncError;
use crate::mirror::MirrorSync;

/// One mirror sync of a configured repository, as a unit of job work.
#[derive(Debug, Clone)]
pub struct MirrorWork {
    task: SyncRepoTask,
    mirror: MirrorSync,
}

impl MirrorWork {
    /// Pairs a task with the orchestrator that performs it.
    pub fn new(task: SyncRepoTask, mirror: MirrorSync) -> Self {
        Self { task, mirror }
    }
}

impl JobWork for MirrorWork {
    type Error = SyncError;

    fn label(&self) -> &str {
        "GitSyncRepoJob"
    }

    fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.mirror.sync(&self.task, cancel).map(|_| ())
    }
}

/// Repeatedly mirrors one repository.
pub type GitSyncRepoJob = RepeatableJob<MirrorWork>;

impl RepeatableJob<MirrorWork> {
    /// Creates the job for one configured repository.
    pub fn for_task(
        id: JobId,
        task: SyncRepoTask,
        mirror: MirrorSync,
        pool: WorkerPool,
        delays: JobDelays,
        one_time: bool,
    ) -> Self {
        Self::new(id, MirrorWork::new(task, mirror), pool, delays, one_time)
    }
}
