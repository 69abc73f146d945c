//! Application runtime: builds the jobs, runs them, shuts them down.

use std::sync::Arc;
use std::time::Duration;

use syncer_git::{GitClient, GitSyncRepoJob, JobScheduler, MirrorSync, WorkerPool};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::settings::Settings;

/// How often [`Application::start`] checks whether all jobs have finished.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A deadline that may never expire.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutTimer {
    deadline: Option<Instant>,
}

impl TimeoutTimer {
    /// Starts a timer expiring after `timeout`, or never if `None`.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() > d)
    }
}

/// The running daemon: one job per configured repository.
pub struct Application {
    settings: Settings,
    scheduler: JobScheduler,
    pool: WorkerPool,
    jobs: Vec<Arc<GitSyncRepoJob>>,
}

impl Application {
    /// Builds the worker pool, the scheduler and every job. Jobs are deferred
    /// until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`AppError::Settings`] if a repository does not form a valid task.
    pub fn from_settings(settings: Settings, client: Arc<dyn GitClient>) -> Result<Self, AppError> {
        info!("Initializing application");

        let tasks = settings.tasks()?;

        info!("Initializing scheduler");
        let pool = match settings.scheduler.executor_max_workers {
            Some(size) => WorkerPool::new(size),
            None => WorkerPool::with_default_size(),
        };
        let scheduler = JobScheduler::new(settings.scheduler.close_timeout());

        let mut mirror = MirrorSync::new(client);
        if let Some(dir) = &settings.scheduler.workspace_dir {
            mirror = mirror.with_workspace_root(dir);
        }

        let delays = settings.scheduler.delays();
        let jobs: Vec<Arc<GitSyncRepoJob>> = tasks
            .into_iter()
            .map(|task| {
                Arc::new(GitSyncRepoJob::for_task(
                    scheduler.next_job_id(),
                    task,
                    mirror.clone(),
                    pool.clone(),
                    delays,
                    settings.scheduler.one_time,
                ))
            })
            .collect();

        for job in &jobs {
            scheduler.defer_job(job.clone());
        }

        info!(
            jobs = jobs.len(),
            workers = pool.size(),
            "Initializing application finished"
        );

        Ok(Self {
            settings,
            scheduler,
            pool,
            jobs,
        })
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn jobs(&self) -> &[Arc<GitSyncRepoJob>] {
        &self.jobs
    }

    /// Spawns the jobs and waits until all of them have finished.
    ///
    /// Without one-time mode jobs never finish on their own, so this only
    /// returns on timeout; callers race it against a shutdown signal.
    ///
    /// # Errors
    ///
    /// [`AppError::Timeout`] if jobs are still active when the overall time
    /// budget runs out.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler.spawn_deferred_jobs();
        info!("Deferred jobs have been spawned");
        info!("Application is starting");

        let total_timeout = self.settings.scheduler.total_timeout();
        let timer = TimeoutTimer::new(total_timeout);

        loop {
            if timer.is_expired() {
                warn!("Application has timed out and will be stopped prematurely");
                return Err(AppError::Timeout(total_timeout.unwrap_or_default()));
            }
            if self.scheduler.is_empty() {
                info!("All jobs have been finished");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        info!("Application has finished successfully");
        Ok(())
    }

    /// Cancels every job, then drains the worker pool. Each step waits at
    /// most the configured close timeout.
    ///
    /// # Errors
    ///
    /// [`AppError::Dispose`] if jobs had to be aborted or workers were still
    /// busy.
    pub async fn dispose(&self) -> Result<(), AppError> {
        info!("Application is shutting down...");

        let mut problems = Vec::new();
        if !self.scheduler.dispose().await {
            problems.push("jobs were aborted");
        }
        if !self.pool.shutdown(self.settings.scheduler.close_timeout()).await {
            problems.push("workers were still busy");
        }

        if problems.is_empty() {
            info!("Application has successfully shut down");
            Ok(())
        } else {
            error!("Application has shut down with errors");
            Err(AppError::Dispose(problems.join(", ")))
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("jobs", &self.jobs.len())
            .field("scheduler", &self.scheduler)
            .field("pool", &self.pool)
            .finish()
    }
}
