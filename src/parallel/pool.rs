//! Worker threads for chunked trial batches.
//!
//! A batch is split into a fixed number of chunks before it runs, so a pool
//! never needs more threads than there are chunks. `workers = 0` keeps the
//! global rayon pool.

use rayon::{ThreadPool, ThreadPoolBuilder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPool {
    /// Requested worker threads; 0 means the global rayon pool.
    pub workers: usize,
}

impl WorkerPool {
    pub fn default_workers() -> Self {
        Self::default()
    }

    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Threads a dedicated pool would get for `chunks` chunks, or `None` for the global pool.
    pub fn threads_for(&self, chunks: usize) -> Option<usize> {
        if self.workers == 0 {
            return None;
        }
        Some(self.workers.min(chunks).max(1))
    }

    /// Runs `f` on a pool sized for `chunks`. A pool that fails to build falls
    /// back to the global one; results do not depend on thread count.
    pub fn run<F, R>(&self, chunks: usize, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let Some(threads) = self.threads_for(chunks) else {
            return f();
        };
        match build_pool(threads) {
            Ok(pool) => pool.install(f),
            Err(err) => {
                tracing::warn!(threads, %err, "worker pool unavailable, running on the global pool");
                f()
            }
        }
    }
}

fn build_pool(threads: usize) -> Result<ThreadPool, rayon::ThreadPoolBuildError> {
    tracing::trace!(threads, "building worker pool");
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("mathhammer-worker-{index}"))
        .build()
}
