//! Trial throughput benchmark, optionally appending one line to a log file for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row to benchmark_log.csv (date, trials_per_sec, trials_per_min, dice_per_sec, attacks_per_trial).

use std::fs::OpenOptions;
use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use mathhammer::combat::{
    simulate_trial, DefenderProfile, DiceExpr, Engagement, Rng, SimulationConfig, WeaponProfile,
};

const LOG_PATH: &str = "benchmark_log.csv";

fn main() -> ExitCode {
    let log = std::env::args().any(|a| a == "--log");

    let weapon = WeaponProfile::new("heavy bolter", DiceExpr::constant(3), 3, 5, 1, DiceExpr::constant(2))
        .with_amount(10)
        .with_keywords(&["sustained hits 1", "twin-linked", "+1 to hit"]);
    let defender = DefenderProfile::new("marines", 4, 2, 10, 3)
        .with_invulnerable(Some(5))
        .with_keywords(&["feel no pain 5+"]);
    let config = SimulationConfig {
        engagement: Engagement {
            half_range: true,
            stationary: true,
        },
        ..SimulationConfig::default()
    };
    let attacks_per_trial = 30u32;

    // Run for at least this long or this many trials
    const MIN_DURATION_MS: u128 = 2000;
    const MIN_TRIALS: u64 = 50_000;

    let mut rng = Rng::new(7);
    let start = Instant::now();
    let mut trials: u64 = 0;
    let mut damage: u64 = 0;
    while start.elapsed().as_millis() < MIN_DURATION_MS || trials < MIN_TRIALS {
        damage += u64::from(simulate_trial(&weapon, &defender, &config, &mut rng).damage);
        trials += 1;
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    let trials_per_sec = trials as f64 / elapsed_secs;
    let trials_per_min = trials_per_sec * 60.0;
    // hit, wound and save roll per attack as a lower bound
    let dice_per_sec = trials_per_sec * f64::from(attacks_per_trial) * 3.0;

    println!("Simulator benchmark ({attacks_per_trial} attacks/trial):");
    println!("  Trials:      {trials}");
    println!("  Duration:    {elapsed_secs:.2} s");
    println!("  Trials/s:    {trials_per_sec:.2}");
    println!("  Trials/min:  {trials_per_min:.2}");
    println!("  Dice/s:      {dice_per_sec:.2}");
    println!("  Mean damage: {:.3}", damage as f64 / trials as f64);

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!(
            "{date},{trials_per_sec:.4},{trials_per_min:.4},{dice_per_sec:.4},{attacks_per_trial}\n"
        );
        if let Err(err) = append_log(&line) {
            eprintln!("failed to append {LOG_PATH}: {err}");
            return ExitCode::FAILURE;
        }
        println!("Appended to {LOG_PATH}");
    }
    ExitCode::SUCCESS
}

fn append_log(line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(LOG_PATH)?;
    if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
        file.write_all(b"date,trials_per_sec,trials_per_min,dice_per_sec,attacks_per_trial\n")?;
    }
    file.write_all(line.as_bytes())?;
    file.flush()
}
