//! Job scheduler: spawns jobs and tracks whether any is still alive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::{Job, JobId, JobIdGenerator};

/// Owns every job of the process and the tasks running them.
///
/// Jobs are registered with [`defer_job`](Self::defer_job) and launched
/// together by [`spawn_deferred_jobs`](Self::spawn_deferred_jobs). Each spawned
/// job gets a child of the scheduler's cancellation token, so
/// [`dispose`](Self::dispose) stops all of them at once.
pub struct JobScheduler {
    ids: Mutex<JobIdGenerator>,
    deferred: Mutex<Vec<Arc<dyn Job>>>,
    tasks: Mutex<JoinSet<()>>,
    active: Arc<AtomicUsize>,
    cancel: CancellationToken,
    close_timeout: Duration,
}

/// Decrements the active count when a job task ends, whether it returned or
/// was aborted.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("git_syncer_active_jobs").set(now as f64);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let now = self.0.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("git_syncer_active_jobs").set(now as f64);
    }
}

impl JobScheduler {
    /// Creates an empty scheduler. `close_timeout` bounds how long
    /// [`dispose`](Self::dispose) waits for cancelled jobs.
    pub fn new(close_timeout: Duration) -> Self {
        Self {
            ids: Mutex::new(JobIdGenerator::new()),
            deferred: Mutex::new(Vec::new()),
            tasks: Mutex::new(JoinSet::new()),
            active: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            close_timeout,
        }
    }

    /// Allocates the identity of a job about to be created.
    pub fn next_job_id(&self) -> JobId {
        self.ids.lock().next_id()
    }

    /// Registers a job to be launched by the next
    /// [`spawn_deferred_jobs`](Self::spawn_deferred_jobs).
    pub fn defer_job(&self, job: Arc<dyn Job>) {
        debug!("Deferring job {}", job.name());
        self.deferred.lock().push(job);
    }

    /// Returns the number of jobs waiting to be spawned.
    pub fn deferred_jobs(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Spawns every deferred job on the current runtime and clears the
    /// deferred set. Returns how many jobs were spawned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_deferred_jobs(&self) -> usize {
        let jobs = std::mem::take(&mut *self.deferred.lock());
        let mut tasks = self.tasks.lock();

        for job in &jobs {
            let job = Arc::clone(job);
            let cancel = self.cancel.child_token();
            let guard = ActiveGuard::enter(&self.active);

            tasks.spawn(async move {
                let _guard = guard;
                job.process(cancel).await;
                debug!("Job {} has ended", job.name());
            });
        }

        if !jobs.is_empty() {
            info!("Spawned {} job(s)", jobs.len());
        }
        jobs.len()
    }

    /// Returns the number of spawned jobs that have not ended yet.
    pub fn active_jobs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns true when no job is deferred and every spawned job has ended.
    pub fn is_empty(&self) -> bool {
        self.active_jobs() == 0 && self.deferred.lock().is_empty()
    }

    /// Cancels every job and waits up to the close timeout for them to end.
    /// Jobs still running afterwards are aborted.
    ///
    /// Returns true if all jobs ended on their own.
    pub async fn dispose(&self) -> bool {
        self.deferred.lock().clear();
        self.cancel.cancel();

        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        let drained = tokio::time::timeout(self.close_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                remaining = tasks.len(),
                "Jobs did not stop within {:?}, aborting", self.close_timeout
            );
            tasks.shutdown().await;
        }

        info!("Job scheduler disposed");
        drained
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("deferred", &self.deferred_jobs())
            .field("active", &self.active_jobs())
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}
