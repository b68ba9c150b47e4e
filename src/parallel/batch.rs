//! Chunked batch execution.
//!
//! Splits a batch of trials into chunks, runs the chunks on a [WorkerPool],
//! reports progress at chunk boundaries and checks for cancellation before a
//! chunk starts. Results come back in chunk order.

use rayon::prelude::*;

use crate::parallel::pool::WorkerPool;
use crate::parallel::progress::{CancelToken, Progress};

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use mathhammer::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Seed for chunk `index` of a batch seeded with `base_seed`.
pub fn chunk_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add(index as u64)
}

#[derive(Debug, Clone)]
pub struct ChunkedRun<T> {
    pub items: Vec<T>,
    /// Chunks that were skipped because cancellation was requested.
    pub skipped_chunks: usize,
}

impl<T> ChunkedRun<T> {
    pub fn cancelled(&self) -> bool {
        self.skipped_chunks > 0
    }
}

/// Runs `run_chunk(index, start, end)` for every chunk of `total` items.
pub fn run_chunks<T, F>(
    total: usize,
    num_chunks: usize,
    pool: &WorkerPool,
    progress: &Progress,
    cancel: &CancelToken,
    run_chunk: F,
) -> ChunkedRun<T>
where
    T: Send,
    F: Fn(usize, usize, usize) -> Vec<T> + Sync,
{
    let ranges = batch_ranges(total, num_chunks);
    progress.start(total);

    let chunks: Vec<Option<Vec<T>>> = pool.run(ranges.len(), || {
        ranges
            .par_iter()
            .enumerate()
            .map(|(index, &(start, end))| {
                if cancel.is_cancelled() {
                    return None;
                }
                let items = run_chunk(index, start, end);
                progress.advance(end - start);
                Some(items)
            })
            .collect()
    });

    let skipped_chunks = chunks.iter().filter(|chunk| chunk.is_none()).count();
    if skipped_chunks > 0 {
        tracing::debug!(skipped_chunks, total_chunks = chunks.len(), "chunked run cancelled");
    }
    ChunkedRun {
        items: chunks.into_iter().flatten().flatten().collect(),
        skipped_chunks,
    }
}
