//! Ordered worker pool.
//!
//! CPU-bound per-item work (histogram matching, decode/encode) is submitted
//! to a pool; every task carries its input index and results are re-sorted
//! by that index, so output order always equals input order.

use std::sync::mpsc;

use rayon::ThreadPool;
use tracing::debug;

use crate::{ComputeError, ComputeResult};

/// Thread pool with ordered result collection.
pub struct WorkerPool {
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    /// Runs every task on the calling thread.
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// Pool with `threads` workers; 0 picks rayon's default, 1 is sequential.
    pub fn with_threads(threads: usize) -> ComputeResult<Self> {
        if threads == 1 {
            return Ok(Self::sequential());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("grade-worker-{i}"))
            .build()
            .map_err(|e| ComputeError::OperationFailed(format!("worker pool: {e}")))?;
        debug!(threads = pool.current_num_threads(), "worker pool created");
        Ok(Self { pool: Some(pool) })
    }

    /// Number of worker threads (1 when sequential).
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, ThreadPool::current_num_threads)
    }

    /// Whether tasks run on the calling thread.
    pub fn is_sequential(&self) -> bool {
        self.pool.is_none()
    }

    /// Maps `f` over `items`, returning results in input order.
    pub fn map_ordered<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let Some(pool) = &self.pool else {
            return items.into_iter().map(f).collect();
        };

        let count = items.len();
        let (tx, rx) = mpsc::channel();
        let f = &f;
        pool.scope(|scope| {
            for (index, item) in items.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let _ = tx.send((index, f(item)));
                });
            }
        });
        drop(tx);

        let mut done: Vec<(usize, R)> = rx.into_iter().collect();
        done.sort_by_key(|(index, _)| *index);
        debug_assert_eq!(done.len(), count);
        done.into_iter().map(|(_, r)| r).collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::sequential()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("threads", &self.threads()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sequential_preserves_order() {
        let pool = WorkerPool::sequential();
        assert!(pool.is_sequential());
        assert_eq!(pool.map_ordered(vec![3, 1, 2], |x| x * 10), vec![30, 10, 20]);
    }

    #[test]
    fn parallel_results_sorted_by_index() {
        let pool = WorkerPool::with_threads(4).unwrap();
        // early items finish last
        let out = pool.map_ordered((0..16u64).collect(), |i| {
            std::thread::sleep(Duration::from_millis(16 - i));
            i
        });
        assert_eq!(out, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn one_thread_is_sequential() {
        assert!(WorkerPool::with_threads(1).unwrap().is_sequential());
        assert_eq!(WorkerPool::with_threads(3).unwrap().threads(), 3);
    }
}
