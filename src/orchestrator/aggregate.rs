//! Reduces a batch of trial records into summary statistics.

use serde::Serialize;

use crate::combat::TrialResult;

/// Distribution of damage over a batch, plus kill rates.
///
/// Percentiles index straight into the sorted damage sample, so they are
/// always actual observed values and never decrease from p25 to p95.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    /// Fraction of trials that destroyed at least one model.
    #[serde(rename = "killChance")]
    pub kill_chance: f64,
    /// Fraction of trials that destroyed every model in the unit.
    #[serde(rename = "wipeChance")]
    pub wipe_chance: f64,
    #[serde(rename = "meanModelsDestroyed")]
    pub mean_models_destroyed: f64,
}

/// Averaged per-phase counts for one weapon against one defender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeaponResult {
    #[serde(rename = "Hits")]
    pub hits: f64,
    #[serde(rename = "Wounds")]
    pub wounds: f64,
    #[serde(rename = "FailedSaves")]
    pub failed_saves: f64,
    #[serde(rename = "Damage")]
    pub damage: f64,
    #[serde(rename = "Stats")]
    pub stats: Stats,
}

pub fn compute_stats(results: &[TrialResult]) -> Stats {
    compute_stats_with_models(results, None)
}

/// Like [compute_stats], with `wipe_chance` measured against `models` when known.
pub fn compute_stats_with_models(results: &[TrialResult], models: Option<u32>) -> Stats {
    if results.is_empty() {
        return Stats::default();
    }
    let n = results.len();
    let count = n as f64;

    let mut damage: Vec<u32> = results.iter().map(|r| r.damage).collect();
    damage.sort_unstable();

    let mean = damage.iter().map(|&d| f64::from(d)).sum::<f64>() / count;
    let variance = damage
        .iter()
        .map(|&d| {
            let delta = f64::from(d) - mean;
            delta * delta
        })
        .sum::<f64>()
        / count;
    let percentile = |pct: usize| f64::from(damage[(n * pct / 100).min(n - 1)]);

    let kills = results.iter().filter(|r| r.models_destroyed >= 1).count();
    let wipes = match models {
        Some(models) => results.iter().filter(|r| r.models_destroyed >= models).count(),
        None => 0,
    };
    let destroyed: u64 = results.iter().map(|r| u64::from(r.models_destroyed)).sum();

    Stats {
        mean,
        median: f64::from(damage[n / 2]),
        std: variance.sqrt(),
        min: f64::from(damage[0]),
        max: f64::from(damage[n - 1]),
        p25: percentile(25),
        p75: percentile(75),
        p90: percentile(90),
        p95: percentile(95),
        kill_chance: kills as f64 / count,
        wipe_chance: wipes as f64 / count,
        mean_models_destroyed: destroyed as f64 / count,
    }
}

/// Per-phase means plus the damage distribution.
pub fn summarize(results: &[TrialResult], models: Option<u32>) -> WeaponResult {
    if results.is_empty() {
        return WeaponResult::default();
    }
    let count = results.len() as f64;
    let mean_of = |field: fn(&TrialResult) -> u32| {
        results.iter().map(|r| f64::from(field(r))).sum::<f64>() / count
    };
    WeaponResult {
        hits: mean_of(|r| r.hits),
        wounds: mean_of(|r| r.wounds),
        failed_saves: mean_of(|r| r.failed_saves),
        damage: mean_of(|r| r.damage),
        stats: compute_stats_with_models(results, models),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(damage: u32, models_destroyed: u32) -> TrialResult {
        TrialResult {
            damage,
            models_destroyed,
            ..TrialResult::default()
        }
    }

    #[test]
    fn empty_batch_gives_zeroed_stats() {
        assert_eq!(compute_stats(&[]), Stats::default());
        assert_eq!(summarize(&[], Some(3)), WeaponResult::default());
    }

    #[test]
    fn stats_over_known_sample() {
        let results: Vec<_> = [4, 0, 2, 8, 6].into_iter().map(|d| trial(d, d / 4)).collect();
        let stats = compute_stats_with_models(&results, Some(2));
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 8.0);
        assert!((stats.std - 8.0_f64.sqrt()).abs() < 1e-12);
        // sorted [0, 2, 4, 6, 8]; index floor(5 * p / 100)
        assert_eq!(stats.p25, 2.0);
        assert_eq!(stats.p75, 6.0);
        assert_eq!(stats.p90, 8.0);
        assert_eq!(stats.p95, 8.0);
        assert_eq!(stats.kill_chance, 0.6);
        assert_eq!(stats.wipe_chance, 0.2);
        assert!((stats.mean_models_destroyed - 0.8).abs() < 1e-12);
    }

    #[test]
    fn median_uses_upper_middle_for_even_samples() {
        let results: Vec<_> = [1, 2, 3, 10].into_iter().map(|d| trial(d, 0)).collect();
        assert_eq!(compute_stats(&results).median, 3.0);
    }

    #[test]
    fn percentiles_are_monotonic_and_kill_chance_bounded() {
        let results: Vec<_> = (0..97u32).map(|i| trial((i * 37) % 11, i % 3)).collect();
        let s = compute_stats(&results);
        assert!(s.min <= s.p25 && s.p25 <= s.median && s.median <= s.p75);
        assert!(s.p75 <= s.p90 && s.p90 <= s.p95 && s.p95 <= s.max);
        assert!((0.0..=1.0).contains(&s.kill_chance));
    }

    #[test]
    fn summary_averages_each_phase() {
        let results = vec![
            TrialResult {
                hits: 4,
                wounds: 2,
                failed_saves: 1,
                damage: 2,
                ..TrialResult::default()
            },
            TrialResult {
                hits: 2,
                wounds: 1,
                failed_saves: 0,
                damage: 0,
                ..TrialResult::default()
            },
        ];
        let summary = summarize(&results, None);
        assert_eq!(summary.hits, 3.0);
        assert_eq!(summary.wounds, 1.5);
        assert_eq!(summary.failed_saves, 0.5);
        assert_eq!(summary.damage, 1.0);
    }

    #[test]
    fn weapon_result_serializes_with_report_field_names() {
        let json = serde_json::to_value(WeaponResult::default()).unwrap();
        for key in ["Hits", "Wounds", "FailedSaves", "Damage", "Stats"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["Stats"].get("killChance").is_some());
    }
}
