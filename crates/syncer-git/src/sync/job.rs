//! Repeatable jobs and their retry state machine.
//!
//! A [`RepeatableJob`] owns one unit of blocking work and runs it forever:
//!
//! ```text
//! WaitingStartup -> Running -> SuccessDelay -> Running -> ...
//!                           \-> RetryDelay  -> Running -> ...
//!                           \-> Finished (finish requested, or cancelled)
//! ```
//!
//! The work itself executes on a [`WorkerPool`]; the job's own task only
//! sleeps, waits for the pool and reacts to cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use metrics::{counter, histogram};
use syncer_core::JitteredDelay;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, error, info, info_span};

use super::pool::{PoolError, WorkerPool};
use super::stats::JobStats;

/// Stable identity of a job, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Returns the raw sequence number.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out increasing job identities, starting at 1. Identities are never
/// reused by the same generator.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: u64,
}

impl JobIdGenerator {
    /// Creates a generator whose first identity is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identity.
    pub fn next_id(&mut self) -> JobId {
        self.last += 1;
        JobId(self.last)
    }
}

/// Where a repeatable job currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting out the initial startup delay.
    WaitingStartup,
    /// A run is in flight on the worker pool.
    Running,
    /// The last run succeeded; waiting before the next one.
    SuccessDelay,
    /// The last run failed; waiting before retrying.
    RetryDelay,
    /// Terminal.
    Finished,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingStartup => "waiting_startup",
            Self::Running => "running",
            Self::SuccessDelay => "success_delay",
            Self::RetryDelay => "retry_delay",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// A job the [`JobScheduler`](super::JobScheduler) can spawn.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns the job's identity.
    fn id(&self) -> JobId;

    /// Returns a human-readable name for logs.
    fn name(&self) -> &str;

    /// Runs the job until it finishes or `cancel` fires.
    async fn process(&self, cancel: CancellationToken);

    /// Asks the job to stop at its next decision point.
    fn finish(&self);
}

/// A blocking unit of work repeated by a [`RepeatableJob`].
pub trait JobWork: Send + Sync + 'static {
    /// Error returned by a failed run.
    type Error: std::error::Error + From<PoolError> + Send + 'static;

    /// Short label used to build the job name, e.g. `GitSyncRepoJob`.
    fn label(&self) -> &str;

    /// Performs one run. Called on a worker thread; may block.
    ///
    /// Long-running work should poll `cancel` at I/O boundaries and return
    /// early once it is cancelled.
    fn run(&self, cancel: &CancellationToken) -> Result<(), Self::Error>;
}

/// The three waits of a repeatable job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobDelays {
    /// Before the first run.
    pub startup: JitteredDelay,
    /// After a successful run.
    pub success: JitteredDelay,
    /// After a failed run.
    pub retry: JitteredDelay,
}

/// Runs a [`JobWork`] over and over with jittered delays between runs.
pub struct RepeatableJob<W: JobWork> {
    id: JobId,
    name: String,
    work: Arc<W>,
    pool: WorkerPool,
    delays: JobDelays,
    one_time: bool,
    finish_requested: AtomicBool,
    state: watch::Sender<JobState>,
    stats: JobStats,
}

impl<W: JobWork> RepeatableJob<W> {
    /// Creates a new job.
    ///
    /// With `one_time` set, the job finishes after its first run whatever the
    /// outcome.
    pub fn new(id: JobId, work: W, pool: WorkerPool, delays: JobDelays, one_time: bool) -> Self {
        let name = format!("{}[id={}]", work.label(), id);
        let (state, _) = watch::channel(JobState::WaitingStartup);

        Self {
            id,
            name,
            work: Arc::new(work),
            pool,
            delays,
            one_time,
            finish_requested: AtomicBool::new(false),
            state,
            stats: JobStats::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    /// Returns the run statistics.
    pub fn stats(&self) -> &JobStats {
        &self.stats
    }

    /// Returns the configured delays.
    pub fn delays(&self) -> &JobDelays {
        &self.delays
    }

    /// Returns the unit of work.
    pub fn work(&self) -> &W {
        &self.work
    }

    /// Returns true once [`finish`](Job::finish) has been called.
    pub fn is_finish_requested(&self) -> bool {
        self.finish_requested.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: JobState) {
        self.state.send_replace(state);
    }

    /// Sleeps for a sample of `delay`. Returns false if cancelled first.
    async fn wait(&self, delay: &JitteredDelay, cancel: &CancellationToken) -> bool {
        let duration = delay.sample();
        if duration.is_zero() {
            return !cancel.is_cancelled();
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Runs the work once on the pool, inside the job's span.
    async fn attempt(&self, cancel: &CancellationToken) -> Result<(), W::Error> {
        let work = Arc::clone(&self.work);
        let token = cancel.clone();
        let span = Span::current();

        self.pool
            .run(move || span.in_scope(|| work.run(&token)))
            .await?
    }

    fn record(&self, outcome: &'static str, started: Instant) {
        counter!(
            "git_syncer_sync_runs_total",
            "job" => self.id.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!("git_syncer_sync_duration_seconds", "job" => self.id.to_string())
            .record(started.elapsed().as_secs_f64());
    }

    async fn run_loop(&self, cancel: CancellationToken) {
        self.set_state(JobState::WaitingStartup);

        if !self.wait(&self.delays.startup, &cancel).await {
            info!("Job {} has been cancelled", self.name);
            self.set_state(JobState::Finished);
            return;
        }

        loop {
            self.set_state(JobState::Running);
            let started = Instant::now();

            // A finished attempt wins over a cancellation seen in the same poll.
            let result = tokio::select! {
                biased;
                result = self.attempt(&cancel) => Some(result),
                _ = cancel.cancelled() => None,
            };

            let Some(result) = result else {
                self.record("cancelled", started);
                info!("Job {} has been cancelled", self.name);
                break;
            };

            if self.one_time {
                info!("Job is set to one-time mode, finishing...");
                self.finish();
            }

            match result {
                Ok(()) => {
                    self.stats.record_success();
                    self.record("success", started);

                    if self.is_finish_requested() {
                        info!("Job {} has been finished", self.name);
                        break;
                    }

                    info!(
                        "Job {} finished successfully, it will be repeated after {}",
                        self.name, self.delays.success
                    );
                    self.set_state(JobState::SuccessDelay);
                    if !self.wait(&self.delays.success, &cancel).await {
                        info!("Job {} has been cancelled", self.name);
                        break;
                    }
                },
                Err(_) if cancel.is_cancelled() => {
                    self.record("cancelled", started);
                    info!("Job {} has been cancelled", self.name);
                    break;
                },
                Err(e) => {
                    self.stats.record_failure(e.to_string());
                    self.record("failure", started);

                    if self.is_finish_requested() {
                        error!(error = %e, "Job {} has crashed", self.name);
                        info!("Job {} has been finished", self.name);
                        break;
                    }

                    error!(
                        error = %e,
                        consecutive_failures = self.stats.consecutive_failures(),
                        "Job {} has crashed, it will be retried after {}",
                        self.name,
                        self.delays.retry
                    );
                    self.set_state(JobState::RetryDelay);
                    if !self.wait(&self.delays.retry, &cancel).await {
                        info!("Job {} has been cancelled", self.name);
                        break;
                    }
                },
            }
        }

        self.set_state(JobState::Finished);
    }
}

#[async_trait]
impl<W: JobWork> Job for RepeatableJob<W> {
    fn id(&self) -> JobId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, cancel: CancellationToken) {
        let span = info_span!("job", id = %self.id, name = %self.name);
        self.run_loop(cancel).instrument(span).await;
    }

    fn finish(&self) {
        self.finish_requested.store(true, Ordering::SeqCst);
    }
}

impl<W: JobWork> fmt::Debug for RepeatableJob<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatableJob")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("one_time", &self.one_time)
            .finish()
    }
}
