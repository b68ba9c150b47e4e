//! Scenario files: who shoots, with what, at whom, and in which situation.
//!
//! A scenario is JSON or YAML (chosen by file extension):
//!
//! ```yaml
//! engagement: { half_range: true, stationary: false }
//! attackers:
//!   - name: Intercessors
//!     weapons:
//!       - { name: bolt rifle, attacks: 2, to_hit: 3, strength: 4, ap: -1, damage: 1, amount: 5 }
//! defenders:
//!   - { name: Boyz, toughness: 5, wounds: 1, models: 10, save: 5, keywords: [infantry] }
//! ```

use std::fs;

use serde::{Deserialize, Serialize};

use crate::combat::{DefenderInput, DefenderProfile, Engagement, WeaponInput, WeaponProfile};
use crate::config::is_json_path;
use crate::error::ScenarioError;

pub const DEFAULT_SCENARIO_PATH: &str = "scenarios/sample.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackerInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weapons: Vec<WeaponInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub attackers: Vec<AttackerInput>,
    #[serde(default)]
    pub defenders: Vec<DefenderInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attacker {
    pub name: String,
    pub weapons: Vec<WeaponProfile>,
}

/// A scenario whose every profile parsed and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScenario {
    pub engagement: Engagement,
    pub attackers: Vec<Attacker>,
    pub defenders: Vec<DefenderProfile>,
}

pub fn attacker_name(input: &AttackerInput, index: usize) -> String {
    fallback_name(input.name.as_deref(), "attacker", index)
}

pub fn weapon_name(input: &WeaponInput, index: usize) -> String {
    fallback_name(input.name.as_deref(), "weapon", index)
}

pub fn defender_name(input: &DefenderInput, index: usize) -> String {
    fallback_name(input.name.as_deref(), "defender", index)
}

fn fallback_name(name: Option<&str>, kind: &str, index: usize) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{kind}[{index}]"),
    }
}

impl Scenario {
    /// Builds every profile before any trial runs; the first bad profile aborts.
    pub fn resolve(&self) -> Result<ResolvedScenario, ScenarioError> {
        if self.attackers.is_empty() {
            return Err(ScenarioError::Empty("attackers"));
        }
        if self.defenders.is_empty() {
            return Err(ScenarioError::Empty("defenders"));
        }
        if self.attackers.iter().all(|attacker| attacker.weapons.is_empty()) {
            return Err(ScenarioError::Empty("weapons"));
        }

        let attackers = self
            .attackers
            .iter()
            .enumerate()
            .map(|(index, input)| -> Result<Attacker, ScenarioError> {
                let weapons = input
                    .weapons
                    .iter()
                    .enumerate()
                    .map(|(w, weapon)| WeaponProfile::from_input(weapon, &weapon_name(weapon, w)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Attacker {
                    name: attacker_name(input, index),
                    weapons,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let defenders = self
            .defenders
            .iter()
            .enumerate()
            .map(|(index, input)| DefenderProfile::from_input(input, &defender_name(input, index)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            attackers = attackers.len(),
            defenders = defenders.len(),
            "scenario resolved"
        );
        Ok(ResolvedScenario {
            engagement: self.engagement,
            attackers,
            defenders,
        })
    }
}

pub fn load_scenario(path: &str) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_string(),
        source,
    })?;
    parse_scenario(&raw, is_json_path(path))
}

pub fn parse_scenario(raw: &str, json: bool) -> Result<Scenario, ScenarioError> {
    if json {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(serde_yaml::from_str(raw)?)
    }
}
