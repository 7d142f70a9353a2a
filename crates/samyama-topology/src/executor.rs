//! Explicit parallel executor handle
//!
//! Every construction routine in this crate takes an `&Executor` instead
//! of reaching for rayon's global pool, so callers decide how many
//! workers a build may use and tests can run single-threaded.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::Arc;

/// Minimum chunk length for the parallel prefix sum
const PREFIX_SUM_GRAIN: usize = 4096;

/// Handle to a work-stealing pool
#[derive(Clone)]
pub struct Executor {
    pool: Arc<ThreadPool>,
}

impl Executor {
    /// Create an executor with `num_threads` workers (0 = one per core)
    pub fn new(num_threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("rdg-worker-{}", i))
            .build()?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Create an executor with exactly one worker
    pub fn single_threaded() -> Self {
        match Self::new(1) {
            Ok(exec) => exec,
            Err(e) => panic!("cannot create single-threaded pool: {}", e),
        }
    }

    /// Number of workers
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool; rayon iterators used by `op` run on its workers
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

/// Inclusive prefix sum in three phases: per-chunk local scans, a serial
/// scan over chunk totals, then a per-chunk offset fix-up.
pub fn parallel_prefix_sum(exec: &Executor, input: &[u64]) -> Vec<u64> {
    if input.is_empty() {
        return Vec::new();
    }
    let chunk = PREFIX_SUM_GRAIN.max(input.len().div_ceil(exec.num_threads() * 4));

    exec.install(|| {
        let mut out = input.to_vec();

        out.par_chunks_mut(chunk).for_each(|c| {
            let mut acc = 0u64;
            for v in c.iter_mut() {
                acc += *v;
                *v = acc;
            }
        });

        let mut offsets: Vec<u64> = out.chunks(chunk).map(|c| c[c.len() - 1]).collect();
        let mut acc = 0u64;
        for offset in offsets.iter_mut() {
            let total = *offset;
            *offset = acc;
            acc += total;
        }

        out.par_chunks_mut(chunk)
            .zip(offsets.par_iter())
            .for_each(|(c, &offset)| {
                if offset != 0 {
                    for v in c.iter_mut() {
                        *v += offset;
                    }
                }
            });
        out
    })
}

/// Split `data` into consecutive sub-slices ending at each of `ends`
/// (cumulative, non-decreasing). Each sub-slice can then be handed to a
/// different worker.
pub(crate) fn split_by_indices<'a, T>(mut data: &'a mut [T], ends: &[u64]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(ends.len());
    let mut prev = 0u64;
    for &end in ends {
        let (head, tail) = std::mem::take(&mut data).split_at_mut((end - prev) as usize);
        parts.push(head);
        data = tail;
        prev = end;
    }
    parts
}
