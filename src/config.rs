//! Run settings: trial count, seed, worker threads, progress granularity and
//! the Feel No Pain counting mode.
//!
//! Settings come from an optional JSON or YAML file (`MATHHAMMER_CONFIG`,
//! default `mathhammer.yaml`) and are then overridden by `MATHHAMMER_TRIALS`,
//! `MATHHAMMER_SEED` and `MATHHAMMER_WORKERS`. A missing file means defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::FeelNoPainMode;
use crate::error::ConfigError;

pub const DEFAULT_SETTINGS_PATH: &str = "mathhammer.yaml";
pub const DEFAULT_TRIALS: usize = 1_000;
pub const MAX_TRIALS: usize = 100_000;
pub const DEFAULT_PROGRESS_REPORTS: usize = 100;

pub const ENV_CONFIG: &str = "MATHHAMMER_CONFIG";
pub const ENV_TRIALS: &str = "MATHHAMMER_TRIALS";
pub const ENV_SEED: &str = "MATHHAMMER_SEED";
pub const ENV_WORKERS: &str = "MATHHAMMER_WORKERS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub trials: usize,
    pub seed: Option<u64>,
    /// 0 uses every core.
    pub workers: usize,
    /// Roughly how many progress updates a chunked batch emits.
    pub progress_reports: usize,
    pub feel_no_pain: FeelNoPainMode,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            workers: 0,
            progress_reports: DEFAULT_PROGRESS_REPORTS,
            feel_no_pain: FeelNoPainMode::default(),
        }
    }
}

impl SimulationSettings {
    /// Trial count forced into `1..=MAX_TRIALS`.
    pub fn clamped_trials(&self) -> usize {
        let clamped = self.trials.clamp(1, MAX_TRIALS);
        if clamped != self.trials {
            tracing::warn!(requested = self.trials, used = clamped, "trial count out of range");
        }
        clamped
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Reads settings from `path`. A missing file yields defaults; an unreadable or
/// malformed one is an error.
pub fn load_settings(path: &str) -> Result<SimulationSettings, ConfigError> {
    let file = Path::new(path);
    if !file.exists() {
        tracing::debug!(path, "settings file not found; using defaults");
        return Ok(SimulationSettings::default());
    }
    let raw = fs::read_to_string(file).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    parse_settings(&raw, is_json_path(path))
}

pub fn parse_settings(raw: &str, json: bool) -> Result<SimulationSettings, ConfigError> {
    if json {
        Ok(serde_json::from_str(raw)?)
    } else if raw.trim().is_empty() {
        Ok(SimulationSettings::default())
    } else {
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Applies environment overrides through `lookup` (normally `std::env::var`).
pub fn apply_env_overrides(
    mut settings: SimulationSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SimulationSettings, ConfigError> {
    if let Some(value) = lookup(ENV_TRIALS) {
        settings.trials = parse_env(ENV_TRIALS, &value)?;
    }
    if let Some(value) = lookup(ENV_SEED) {
        settings.seed = Some(parse_env(ENV_SEED, &value)?);
    }
    if let Some(value) = lookup(ENV_WORKERS) {
        settings.workers = parse_env(ENV_WORKERS, &value)?;
    }
    Ok(settings)
}

/// File from `MATHHAMMER_CONFIG` (or the default path) plus environment overrides.
pub fn load_from_env() -> Result<SimulationSettings, ConfigError> {
    let path = std::env::var(ENV_CONFIG).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = load_settings(&path)?;
    apply_env_overrides(settings, |name| std::env::var(name).ok())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}

pub(crate) fn is_json_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
