use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_mathhammer")
}

fn unique_temp_path(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("mathhammer-{name}-{stamp}.yaml"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env_remove("MATHHAMMER_TRIALS")
        .env_remove("MATHHAMMER_SEED")
        .env_remove("MATHHAMMER_WORKERS")
        .env_remove("MATHHAMMER_CONFIG")
        .output()
        .expect("binary should run")
}

#[test]
fn simulate_command_emits_nested_json_report() {
    let output = run(&["simulate", "scenarios/sample.yaml", "50", "11"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("simulate should emit json");
    let boyz = &payload["Intercessor Squad"]["Boyz"];
    assert!(boyz["bolt rifle"]["Damage"].is_number());
    assert!(boyz["Kills"].is_number());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("seed: 11"));
}

#[test]
fn simulate_is_reproducible_for_a_seed() {
    let first = run(&["simulate", "scenarios/sample.yaml", "40", "5"]);
    let second = run(&["simulate", "scenarios/sample.yaml", "40", "5"]);
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn simulate_csv_and_table_formats() {
    let csv = run(&["simulate", "scenarios/sample.yaml", "20", "1", "--csv"]);
    assert_eq!(csv.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&csv.stdout);
    assert!(stdout.starts_with("attacker,defender,weapon,"));

    let table = run(&["simulate", "--table", "scenarios/sample.yaml", "20", "1"]);
    assert_eq!(table.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&table.stdout);
    assert!(stdout.starts_with("attacker\tdefender\tweapon"));
    assert!(stdout.contains("best: "));
}

#[test]
fn simulate_missing_scenario_fails() {
    let output = run(&["simulate", "no/such/file.yaml", "10", "1"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("scenario error"));
}

#[test]
fn trace_command_emits_phase_events() {
    let output = run(&["trace", "scenarios/sample.yaml", "3"]);
    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("trace should emit json");
    let first = &payload[0];
    assert_eq!(first["events"].as_array().map(Vec::len), Some(4));
    assert_eq!(first["events"][0]["phase"], "hit");
}

#[test]
fn validate_command_passes_sample_and_fails_bad_file() {
    let ok = run(&["validate", "scenarios/sample.yaml"]);
    assert_eq!(ok.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&ok.stdout).contains("validation passed"));

    let path = unique_temp_path("invalid-scenario");
    fs::write(
        &path,
        "attackers:\n  - weapons:\n      - { attacks: 1, to_hit: 3, strength: 4, damage: 1 }\n\
         defenders:\n  - { toughness: 4, wounds: 2, save: 3 }\n",
    )
    .expect("fixture should be written");
    let bad = run(&["validate", path.to_string_lossy().as_ref()]);
    assert_eq!(bad.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad.stderr).contains("missing required field 'models'"));

    let _ = fs::remove_file(path);
}

#[test]
fn keywords_command_reports_effects_and_unknown_tags() {
    let output = run(&["keywords", "LETHAL HITS", "Sustained Hits D3", "Feel No Pain 5+", "waaagh"]);
    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("keywords should emit json");
    assert_eq!(payload["weapon"]["lethal_hits"], true);
    assert_eq!(payload["weapon"]["sustained_hits"], "D3");
    assert_eq!(payload["defender"]["feel_no_pain"], 5);
    assert_eq!(payload["unrecognized"][0], "waaagh");
}

#[test]
fn unknown_command_prints_usage() {
    let output = run(&["serve"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: mathhammer"));
}
