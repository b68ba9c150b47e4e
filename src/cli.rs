use serde::Serialize;

use crate::combat::{serialize_events_json, unrecognized_keywords, DefenderEffects, WeaponEffects};
use crate::config::{load_from_env, SimulationSettings};
use crate::data::{
    load_scenario, validate_scenario, ResolvedScenario, ValidationSeverity, DEFAULT_SCENARIO_PATH,
};
use crate::orchestrator::{rank_weapons, run_scenario, trace_scenario};

const USAGE: &str = "usage: mathhammer <simulate|trace|validate|keywords>\n  \
    simulate [scenario] [trials] [seed] [--table|--csv]\n  \
    trace [scenario] [seed] [--events]\n  \
    validate [scenario]\n  \
    keywords <tag>...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simulate,
    Trace,
    Validate,
    Keywords,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("simulate") => Some(Command::Simulate),
        Some("trace") => Some(Command::Trace),
        Some("validate") => Some(Command::Validate),
        Some("keywords") => Some(Command::Keywords),
        _ => None,
    }
}

/// Exit code: 0 success, 1 failure, 2 usage error.
pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Trace) => handle_trace(args),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Keywords) => handle_keywords(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn load_settings_or_report() -> Option<SimulationSettings> {
    match load_from_env() {
        Ok(settings) => Some(settings),
        Err(err) => {
            eprintln!("configuration error: {err}");
            None
        }
    }
}

fn handle_simulate(args: &[String]) -> i32 {
    let Some(settings) = load_settings_or_report() else {
        return 1;
    };
    let positional = positional_args(args);
    let path = positional.first().copied().unwrap_or(DEFAULT_SCENARIO_PATH);
    let trials = parse_usize_arg(positional.get(1).copied(), "trials", settings.trials);
    let seed = resolve_seed(positional.get(2).copied(), settings.seed);
    let as_table = args.iter().any(|arg| arg == "--table");
    let as_csv = args.iter().any(|arg| arg == "--csv");

    let Some(scenario) = resolve_scenario(path) else {
        return 1;
    };
    let settings = settings.with_trials(trials);
    eprintln!("seed: {seed}");
    let report = run_scenario(&scenario, &settings, seed);

    if as_csv {
        return print_or_fail(report.to_csv(), "CSV report");
    }
    if as_table {
        print!("{}", report.to_table());
        if let Some(best) = rank_weapons(&report).first() {
            println!(
                "best: {} / {} -> {} (kill chance {:.3}, mean damage {:.2})",
                best.attacker, best.defender, best.weapon, best.kill_chance, best.mean_damage
            );
        }
        return 0;
    }
    print_or_fail(report.to_json_pretty(), "report")
}

fn handle_trace(args: &[String]) -> i32 {
    let Some(settings) = load_settings_or_report() else {
        return 1;
    };
    let positional = positional_args(args);
    let path = positional.first().copied().unwrap_or(DEFAULT_SCENARIO_PATH);
    let seed = resolve_seed(positional.get(1).copied(), settings.seed);

    let Some(scenario) = resolve_scenario(path) else {
        return 1;
    };
    eprintln!("seed: {seed}");
    let traces = trace_scenario(&scenario, &settings, seed);
    if args.iter().any(|arg| arg == "--events") {
        let events: Vec<_> = traces.into_iter().flat_map(|trace| trace.events).collect();
        return print_or_fail(serialize_events_json(&events), "trace events");
    }
    print_or_fail(serde_json::to_string_pretty(&traces), "trace")
}

fn handle_validate(args: &[String]) -> i32 {
    let positional = positional_args(args);
    let path = positional.first().copied().unwrap_or(DEFAULT_SCENARIO_PATH);

    let scenario = match load_scenario(path) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("validation failed: {err}");
            return 1;
        }
    };
    let report = validate_scenario(&scenario);
    for diagnostic in report.sorted() {
        eprintln!("- {diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} error(s), {} warning(s)",
            report.count(ValidationSeverity::Error),
            report.count(ValidationSeverity::Warning)
        );
        return 1;
    }
    println!("validation passed: {path}");
    0
}

#[derive(Debug, Serialize)]
struct KeywordSummary {
    weapon: WeaponEffects,
    defender: DefenderEffects,
    unrecognized: Vec<String>,
}

fn handle_keywords(args: &[String]) -> i32 {
    let tags: Vec<&str> = args.iter().skip(2).map(String::as_str).collect();
    if tags.is_empty() {
        eprintln!("usage: mathhammer keywords <tag>...");
        return 2;
    }
    let summary = KeywordSummary {
        weapon: WeaponEffects::from_keywords(&tags),
        defender: DefenderEffects::from_keywords(&tags),
        unrecognized: unrecognized_keywords(&tags),
    };
    print_or_fail(serde_json::to_string_pretty(&summary), "keyword summary")
}

fn resolve_scenario(path: &str) -> Option<ResolvedScenario> {
    let resolved = load_scenario(path).and_then(|scenario| scenario.resolve());
    match resolved {
        Ok(scenario) => Some(scenario),
        Err(err) => {
            eprintln!("scenario error: {err}");
            None
        }
    }
}

fn print_or_fail<E: std::fmt::Display>(payload: Result<String, E>, what: &str) -> i32 {
    match payload {
        Ok(payload) => {
            println!("{}", payload.trim_end());
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

fn positional_args(args: &[String]) -> Vec<&str> {
    args.iter()
        .skip(2)
        .map(String::as_str)
        .filter(|arg| !arg.starts_with("--"))
        .collect()
}

/// Explicit argument, then configured seed, then a fresh one from the OS.
fn resolve_seed(raw: Option<&str>, configured: Option<u64>) -> u64 {
    if let Some(value) = raw {
        match value.parse::<u64>() {
            Ok(seed) => return seed,
            Err(_) => eprintln!("invalid seed '{value}', ignoring"),
        }
    }
    configured.unwrap_or_else(random_seed)
}

fn random_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(err) => {
            tracing::warn!(%err, "OS randomness unavailable; seeding from the clock");
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
        }
    }
}

fn parse_usize_arg(raw: Option<&str>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
