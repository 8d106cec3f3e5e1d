//! Worker pool and cancellation.
//!
//! Samplers hand batches of points to a [`WorkerPool`]; each point is
//! evaluated independently against the shared, read-only pipeline. Results
//! come back in input order whatever the thread count, so ordered samplers
//! (grid, ensemble halves) write deterministic output.

use cosmix_types::ErrorCode;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure to start the worker threads.
#[derive(Debug, Error)]
#[error("failed to start worker pool with {threads} threads: {message}")]
pub struct PoolError {
    pub threads: usize,
    pub message: String,
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        "POOL_BUILD_FAILED"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Evaluates batches, serially or on a dedicated rayon pool.
pub struct WorkerPool {
    threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Creates a pool; `threads <= 1` evaluates on the calling thread.
    ///
    /// # Errors
    ///
    /// [`PoolError`] if the threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let pool = if threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("cosmix-worker-{i}"))
                .build()
                .map_err(|e| PoolError {
                    threads,
                    message: e.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };
        debug!(threads, "Worker pool ready");
        Ok(Self { threads, pool })
    }

    /// A pool that always runs on the calling thread.
    #[must_use]
    pub fn serial() -> Self {
        Self {
            threads: 1,
            pool: None,
        }
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Maps `f` over `items`, preserving order.
    ///
    /// Either path reports the error of the earliest failing item. The
    /// serial path stops there; the parallel path evaluates every item.
    ///
    /// # Errors
    ///
    /// The first `Err`, in input order, returned by `f`.
    pub fn map<T, R, E, F>(&self, items: &[T], f: F) -> Result<Vec<R>, E>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool
                .install(|| items.par_iter().map(&f).collect::<Vec<_>>())
                .into_iter()
                .collect(),
            None => items.iter().map(f).collect(),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

/// Shared cancellation flag.
///
/// Cloned into signal handlers; checked before every batch and every
/// evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_and_parallel_agree() {
        let items: Vec<u64> = (0..100).collect();
        let square = |x: &u64| Ok::<_, String>(x * x);

        let serial = WorkerPool::serial().map(&items, square).expect("serial");
        let parallel = WorkerPool::new(4)
            .expect("pool")
            .map(&items, square)
            .expect("parallel");
        assert_eq!(serial, parallel);
        assert_eq!(parallel[10], 100);
    }

    #[test]
    fn errors_propagate() {
        let items = vec![1, 2, 3];
        let result = WorkerPool::new(2)
            .expect("pool")
            .map(&items, |&x| if x == 2 { Err("two") } else { Ok(x) });
        assert_eq!(result, Err("two"));
    }

    #[test]
    fn earliest_error_wins_in_parallel() {
        let items: Vec<u32> = (0..400).collect();
        let fail_late_items = |&x: &u32| {
            // Later items fail fast, the earliest failing item is slow.
            if x == 7 {
                std::thread::sleep(std::time::Duration::from_millis(20));
            }
            if x == 7 || x > 300 {
                Err(x)
            } else {
                Ok(x)
            }
        };
        for pool in [WorkerPool::serial(), WorkerPool::new(4).expect("pool")] {
            assert_eq!(pool.map(&items, fail_late_items), Err(7));
        }
    }

    #[test]
    fn zero_threads_is_serial() {
        assert_eq!(WorkerPool::new(0).expect("pool").threads(), 1);
    }

    #[test]
    fn cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
