//! Bounded pool for blocking work.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Errors returned by [`WorkerPool::run`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool was shut down before the work could start.
    #[error("worker pool is closed")]
    Closed,

    /// The blocking task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs blocking closures on tokio's blocking threads, at most `size` at once.
///
/// The pool is cheap to clone; clones share the same bound.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` closures concurrently.
    /// A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Creates a pool sized `min(32, cpus + 4)`.
    pub fn with_default_size() -> Self {
        Self::new(default_size())
    }

    /// Returns the maximum concurrency.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns how many more closures could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `work` on a blocking thread once a slot is free.
    ///
    /// The slot is held by the blocking closure itself, so dropping the
    /// returned future does not free it before the work has really finished.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] after [`shutdown`](Self::shutdown), or
    /// [`PoolError::Join`] if the closure panicked.
    pub async fn run<F, T>(&self, work: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        });

        Ok(handle.await?)
    }

    /// Stops accepting work and waits up to `timeout` for running work to
    /// finish. Returns true if the pool drained in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let size = u32::try_from(self.size).unwrap_or(u32::MAX);
        let drained = tokio::time::timeout(timeout, self.permits.acquire_many(size)).await;
        self.permits.close();

        match drained {
            Ok(_) => {
                debug!("Worker pool drained");
                true
            },
            Err(_) => {
                warn!(
                    busy = self.size - self.available(),
                    "Worker pool did not drain within {:?}", timeout
                );
                false
            },
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_default_size()
    }
}

fn default_size() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}
