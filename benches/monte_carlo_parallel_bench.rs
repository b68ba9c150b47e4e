//! Single-stream vs chunked parallel batch run times.
//!
//! Run with: `cargo bench --bench monte_carlo_parallel`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mathhammer::combat::{DefenderProfile, DiceExpr, SimulationConfig, WeaponProfile};
use mathhammer::orchestrator::{run_batch, run_batch_chunked, ChunkOptions};
use mathhammer::parallel::WorkerPool;

fn bench_batch_sequential_vs_chunked(c: &mut Criterion) {
    let weapon = WeaponProfile::new("heavy bolter", DiceExpr::constant(3), 3, 5, 1, DiceExpr::constant(2))
        .with_amount(5)
        .with_keywords(&["sustained hits 1"]);
    let defender = DefenderProfile::new("marines", 4, 2, 10, 3);
    let config = SimulationConfig::default();
    let trials = 20_000;
    let seed = 42u64;

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(run_batch(&weapon, &defender, trials, seed, &config)));
    });

    for workers in [1usize, 0] {
        let label = if workers == 0 { "chunked_all_cores".to_string() } else { format!("chunked_{workers}_worker") };
        let options = ChunkOptions::new(100, WorkerPool::with_workers(workers));
        group.bench_function(label, |b| {
            b.iter(|| black_box(run_batch_chunked(&weapon, &defender, trials, seed, &config, &options)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batch_sequential_vs_chunked);
criterion_main!(benches);
