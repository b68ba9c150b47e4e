use mathhammer::combat::{DefenderProfile, DiceExpr, SimulationConfig, WeaponProfile};
use mathhammer::config::SimulationSettings;
use mathhammer::data::{Attacker, ResolvedScenario};
use mathhammer::orchestrator::{
    compute_stats, rank_weapons, run_batch, run_batch_chunked, run_scenario,
    run_scenario_with_progress, summarize, ChunkOptions,
};
use mathhammer::parallel::{CancelToken, Progress, WorkerPool};

fn approx_within(actual: f64, expected: f64, fraction: f64) {
    let tolerance = expected * fraction;
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ±{tolerance}, got {actual}"
    );
}

#[test]
fn guaranteed_lethal_profile_always_kills() {
    let hammer = WeaponProfile::new(
        "hammer",
        DiceExpr::constant(10),
        2,
        10,
        0,
        DiceExpr::constant(10),
    );
    let grot = DefenderProfile::new("grot", 1, 1, 1, 7);
    let results = run_batch(&hammer, &grot, 200, 1, &SimulationConfig::default());
    let stats = compute_stats(&results);
    assert_eq!(stats.kill_chance, 1.0);
    assert!(results.iter().all(|r| r.models_destroyed == 1));
}

#[test]
fn ten_attacks_at_four_plus_match_expected_averages() {
    let rifle = WeaponProfile::new("rifle", DiceExpr::constant(10), 4, 4, 0, DiceExpr::constant(1));
    let marines = DefenderProfile::new("marines", 4, 1, 20, 3);
    let results = run_batch(&rifle, &marines, 1000, 2024, &SimulationConfig::default());
    let summary = summarize(&results, Some(marines.models));

    approx_within(summary.hits, 5.0, 0.10);
    approx_within(summary.wounds, 2.5, 0.10);
    approx_within(summary.failed_saves, 2.5 / 3.0, 0.15);
    assert_eq!(summary.damage, summary.failed_saves);
}

#[test]
fn percentiles_are_ordered_for_random_damage() {
    let cannon = WeaponProfile::new("cannon", DiceExpr::dice(1, 6, 0), 3, 8, 2, DiceExpr::dice(1, 6, 1));
    let tanks = DefenderProfile::new("tanks", 9, 12, 2, 3);
    let stats = compute_stats(&run_batch(&cannon, &tanks, 2000, 77, &SimulationConfig::default()));

    assert!(stats.min <= stats.p25);
    assert!(stats.p25 <= stats.median);
    assert!(stats.median <= stats.p75);
    assert!(stats.p75 <= stats.p90);
    assert!(stats.p90 <= stats.p95);
    assert!(stats.p95 <= stats.max);
    assert!((0.0..=1.0).contains(&stats.kill_chance));
    assert!(stats.std > 0.0);
}

#[test]
fn chunked_batch_agrees_with_single_stream_statistically() {
    let rifle = WeaponProfile::new("rifle", DiceExpr::constant(10), 3, 4, 1, DiceExpr::constant(1));
    let marines = DefenderProfile::new("marines", 4, 2, 10, 3);
    let config = SimulationConfig::default();

    let sequential = compute_stats(&run_batch(&rifle, &marines, 5000, 3, &config));
    let (progress, updates) = Progress::channel();
    let options = ChunkOptions::new(50, WorkerPool::with_workers(4)).with_progress(&progress);
    let chunked = run_batch_chunked(&rifle, &marines, 5000, 3, &config, &options);

    assert_eq!(chunked.items.len(), 5000);
    assert_eq!(progress.completed(), 5000);
    assert_eq!(progress.fraction(), 1.0);
    assert_eq!(updates.try_iter().count(), 51);
    approx_within(compute_stats(&chunked.items).mean, sequential.mean, 0.08);
}

#[test]
fn pre_cancelled_scenario_returns_nothing() {
    let scenario = sample_scenario();
    let cancel = CancelToken::new();
    cancel.cancel();
    let run = run_scenario_with_progress(
        &scenario,
        &SimulationSettings::default(),
        9,
        &Progress::new(),
        &cancel,
    );
    assert!(run.cancelled);
    assert!(run.report.attackers.is_empty());
}

fn sample_scenario() -> ResolvedScenario {
    let bolter = WeaponProfile::new("bolter", DiceExpr::constant(2), 3, 4, 0, DiceExpr::constant(1))
        .with_amount(10);
    let melta = WeaponProfile::new("melta", DiceExpr::constant(1), 3, 9, 4, DiceExpr::dice(1, 6, 0))
        .with_keywords(&["melta 2"]);
    ResolvedScenario {
        engagement: Default::default(),
        attackers: vec![
            Attacker {
                name: "Tactical".to_string(),
                weapons: vec![bolter.clone(), melta],
            },
            Attacker {
                name: "Devastators".to_string(),
                weapons: vec![bolter],
            },
        ],
        defenders: vec![
            DefenderProfile::new("Boyz", 5, 1, 10, 5),
            DefenderProfile::new("Rhino", 9, 10, 1, 3),
        ],
    }
}

#[test]
fn scenario_report_has_every_combination_and_bounded_kills() {
    let scenario = sample_scenario();
    let settings = SimulationSettings::default().with_trials(300);
    let report = run_scenario(&scenario, &settings, 42);

    assert_eq!(report.attackers.len(), 2);
    for attacker in &scenario.attackers {
        for defender in &scenario.defenders {
            let entry = report
                .defender_report(&attacker.name, &defender.name)
                .expect("every combination is reported");
            assert_eq!(entry.weapons.len(), attacker.weapons.len());
            assert!(entry.kills <= defender.models);
        }
    }

    let json: serde_json::Value =
        serde_json::from_str(&report.to_json_pretty().unwrap()).expect("report is valid JSON");
    assert!(json["Tactical"]["Boyz"]["bolter"]["Hits"].is_number());
    assert!(json["Tactical"]["Rhino"]["Kills"].is_number());
}

#[test]
fn same_seed_same_report_and_ranking() {
    let scenario = sample_scenario();
    let settings = SimulationSettings::default().with_trials(200);
    let first = run_scenario(&scenario, &settings, 1234);
    let second = run_scenario(&scenario, &settings, 1234);
    assert_eq!(first, second);

    let ranked = rank_weapons(&first);
    assert_eq!(ranked.len(), 6);
    for pair in ranked.windows(2) {
        assert!(pair[0].kill_chance >= pair[1].kill_chance);
    }
}
