pub mod aggregate;
pub mod monte_carlo;
pub mod ranking;
pub mod report;

use std::collections::HashSet;

use serde::Serialize;

use crate::combat::{
    simulate_trial_traced, CombatEvent, Rng, SimulationConfig, TraceCollector, TrialResult,
    WeaponProfile,
};
use crate::config::SimulationSettings;
use crate::data::ResolvedScenario;
use crate::parallel::{CancelToken, Progress, WorkerPool};

pub use aggregate::{compute_stats, compute_stats_with_models, summarize, Stats, WeaponResult};
pub use monte_carlo::{run_batch, run_batch_chunked, ChunkOptions};
pub use ranking::{rank_weapons, RankedWeapon};
pub use report::{approximate_kills, BatchReport, DefenderReport, ReportRow, KILLS_KEY};

#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub report: BatchReport,
    /// True when cancellation stopped the run early; the report then holds
    /// only the combinations that finished.
    pub cancelled: bool,
}

pub fn run_scenario(scenario: &ResolvedScenario, settings: &SimulationSettings, seed: u64) -> BatchReport {
    run_scenario_with_progress(scenario, settings, seed, &Progress::new(), &CancelToken::new()).report
}

/// Runs every attacker × defender × weapon combination as its own batch.
///
/// `progress` restarts for each combination and advances at chunk boundaries.
pub fn run_scenario_with_progress(
    scenario: &ResolvedScenario,
    settings: &SimulationSettings,
    seed: u64,
    progress: &Progress,
    cancel: &CancelToken,
) -> ScenarioRun {
    let trials = settings.clamped_trials();
    let config = simulation_config(scenario, settings);
    let options = ChunkOptions::new(settings.progress_reports.max(1), WorkerPool::with_workers(settings.workers))
        .with_progress(progress)
        .with_cancel(cancel);

    let mut report = BatchReport::default();
    for attacker in &scenario.attackers {
        let keys = weapon_keys(&attacker.weapons);
        for defender in &scenario.defenders {
            let mut mean_damage = 0.0;
            for (weapon, key) in attacker.weapons.iter().zip(&keys) {
                let batch_seed = stable_seed(seed, &[&attacker.name, &defender.name, key]);
                tracing::debug!(
                    attacker = %attacker.name,
                    defender = %defender.name,
                    weapon = %key,
                    trials,
                    batch_seed,
                    "running batch"
                );
                let run = run_batch_chunked(weapon, defender, trials, batch_seed, &config, &options);
                if run.cancelled() {
                    tracing::info!(completed = run.items.len(), trials, "scenario run cancelled");
                    return ScenarioRun {
                        report,
                        cancelled: true,
                    };
                }
                let result = summarize(&run.items, Some(defender.models));
                mean_damage += result.damage;
                report.insert(&attacker.name, &defender.name, key.clone(), result);
            }
            if let Some(entry) = report
                .attackers
                .get_mut(&attacker.name)
                .and_then(|defenders| defenders.get_mut(&defender.name))
            {
                entry.kills = approximate_kills(mean_damage, defender);
            }
        }
    }

    ScenarioRun {
        report,
        cancelled: false,
    }
}

/// One traced trial per combination.
#[derive(Debug, Clone, Serialize)]
pub struct TracedTrial {
    pub attacker: String,
    pub defender: String,
    pub weapon: String,
    pub seed: u64,
    pub result: TrialResult,
    pub events: Vec<CombatEvent>,
}

pub fn trace_scenario(
    scenario: &ResolvedScenario,
    settings: &SimulationSettings,
    seed: u64,
) -> Vec<TracedTrial> {
    let config = simulation_config(scenario, settings);
    let mut traces = Vec::new();
    for attacker in &scenario.attackers {
        let keys = weapon_keys(&attacker.weapons);
        for defender in &scenario.defenders {
            for (weapon, key) in attacker.weapons.iter().zip(&keys) {
                let trial_seed = stable_seed(seed, &[&attacker.name, &defender.name, key]);
                let mut rng = Rng::new(trial_seed);
                let mut trace = TraceCollector::new(true);
                let result = simulate_trial_traced(weapon, defender, &config, &mut rng, &mut trace);
                traces.push(TracedTrial {
                    attacker: attacker.name.clone(),
                    defender: defender.name.clone(),
                    weapon: key.clone(),
                    seed: trial_seed,
                    result,
                    events: trace.into_events(),
                });
            }
        }
    }
    traces
}

fn simulation_config(scenario: &ResolvedScenario, settings: &SimulationSettings) -> SimulationConfig {
    SimulationConfig {
        engagement: scenario.engagement,
        feel_no_pain: settings.feel_no_pain,
    }
}

/// Report keys for an attacker's weapons. Repeated names become `name#2`,
/// `name#3`, ...; a weapon named like the `Kills` field is always suffixed.
pub fn weapon_keys(weapons: &[WeaponProfile]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::from([KILLS_KEY.to_string()]);
    weapons
        .iter()
        .map(|weapon| {
            let mut key = weapon.name.clone();
            let mut n = 1;
            while used.contains(&key) {
                n += 1;
                key = format!("{}#{}", weapon.name, n);
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

/// Per-combination seed: the same names and base seed always give the same stream.
pub fn stable_seed(seed: u64, parts: &[&str]) -> u64 {
    let mut acc = seed;
    for part in parts {
        for b in part.bytes() {
            acc = acc.wrapping_mul(37).wrapping_add(u64::from(b));
        }
        // separator so ("ab", "c") and ("a", "bc") differ
        acc = acc.wrapping_mul(37).wrapping_add(0xff);
    }
    acc
}
