use crate::combat::{simulate_trial, DefenderProfile, Rng, SimulationConfig, TrialResult, WeaponProfile};
use crate::parallel::{chunk_seed, run_chunks, CancelToken, ChunkedRun, Progress, WorkerPool};

/// Runs `trials` trials of `weapon` against `defender` from one seeded stream,
/// consumed in order. The same seed always yields the same results.
pub fn run_batch(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    trials: usize,
    seed: u64,
    config: &SimulationConfig,
) -> Vec<TrialResult> {
    let mut rng = Rng::new(seed);
    (0..trials)
        .map(|_| simulate_trial(weapon, defender, config, &mut rng))
        .collect()
}

/// Options for [run_batch_chunked]. Progress and cancellation are optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkOptions<'a> {
    pub chunks: usize,
    pub pool: WorkerPool,
    pub progress: Option<&'a Progress>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> ChunkOptions<'a> {
    pub fn new(chunks: usize, pool: WorkerPool) -> Self {
        Self {
            chunks,
            pool,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: &'a Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Splits a batch into chunks seeded `seed + index`, runs them in parallel and
/// merges the results in chunk order. Reproducible for a fixed seed and chunk
/// count regardless of worker count.
pub fn run_batch_chunked(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    trials: usize,
    seed: u64,
    config: &SimulationConfig,
    options: &ChunkOptions<'_>,
) -> ChunkedRun<TrialResult> {
    let idle_progress = Progress::new();
    let never_cancelled = CancelToken::new();
    run_chunks(
        trials,
        options.chunks.max(1),
        &options.pool,
        options.progress.unwrap_or(&idle_progress),
        options.cancel.unwrap_or(&never_cancelled),
        |index, start, end| run_batch(weapon, defender, end - start, chunk_seed(seed, index), config),
    )
}
