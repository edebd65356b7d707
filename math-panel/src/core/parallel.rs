//! Portable parallel iteration
//!
//! - `native` feature: rayon
//! - otherwise: sequential fallbacks with the same signatures
//!
//! Work is split into contiguous blocks, one per worker, so that each block
//! writes a disjoint slice of the output.
//!
//! ```ignore
//! use crate::core::parallel::*;
//!
//! let rows: Vec<Vec<f64>> = parallel_map_blocks(n_rows, workers, |range| {
//!     range.map(|i| assemble_row(i)).collect()
//! });
//! ```

use std::ops::Range;

/// Number of workers of the current pool
#[cfg(feature = "native")]
pub fn current_workers() -> usize {
    rayon::current_num_threads()
}

/// Sequential fallback
#[cfg(not(feature = "native"))]
pub fn current_workers() -> usize {
    1
}

/// Split `0..count` into at most `workers` contiguous, balanced blocks
pub fn partition(count: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1).min(count.max(1));
    let base = count / workers;
    let extra = count % workers;
    let mut blocks = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let len = base + usize::from(w < extra);
        if len == 0 {
            continue;
        }
        blocks.push(start..start + len);
        start += len;
    }
    blocks
}

/// Map every contiguous block of `0..count` and concatenate the results in
/// index order
#[cfg(feature = "native")]
pub fn parallel_map_blocks<U, F>(count: usize, workers: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(Range<usize>) -> Vec<U> + Sync + Send,
{
    use rayon::prelude::*;
    partition(count, workers)
        .into_par_iter()
        .map(f)
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Sequential fallback
#[cfg(not(feature = "native"))]
pub fn parallel_map_blocks<U, F>(count: usize, workers: usize, f: F) -> Vec<U>
where
    F: Fn(Range<usize>) -> Vec<U>,
{
    partition(count, workers).into_iter().flat_map(f).collect()
}

/// Worker pool reused by every point of a task
///
/// `threads == 0` runs on the global pool.
#[cfg(feature = "native")]
pub struct WorkerPool {
    pool: Option<rayon::ThreadPool>,
}

#[cfg(feature = "native")]
impl WorkerPool {
    /// Build a pool of `threads` workers
    pub fn new(threads: usize) -> Self {
        if threads == 0 {
            return Self { pool: None };
        }
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                log::warn!("failed to build a {threads}-thread pool ({e}), using the global pool");
                Self { pool: None }
            }
        }
    }

    /// Run `f` on the workers of this pool
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

/// Sequential fallback
#[cfg(not(feature = "native"))]
pub struct WorkerPool;

#[cfg(not(feature = "native"))]
impl WorkerPool {
    /// No workers to build
    pub fn new(_threads: usize) -> Self {
        Self
    }

    /// Run `f` on the calling thread
    pub fn install<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        f()
    }
}

/// Run `f` inside a pool of `threads` workers (0 = default pool)
#[cfg(feature = "native")]
pub fn with_pool<R, F>(threads: usize, f: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    WorkerPool::new(threads).install(f)
}

/// Sequential fallback
#[cfg(not(feature = "native"))]
pub fn with_pool<R, F>(_threads: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}
