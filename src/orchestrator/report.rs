//! Batch report assembly and export (JSON, tab-separated table, CSV).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::combat::DefenderProfile;
use crate::error::ReportError;
use crate::orchestrator::aggregate::WeaponResult;

/// JSON key of the kills estimate, shared with the flattened weapon keys.
pub const KILLS_KEY: &str = "Kills";

/// Every weapon of one attacker against one defender.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefenderReport {
    #[serde(flatten)]
    pub weapons: BTreeMap<String, WeaponResult>,
    /// Aggregate-level approximation: the weapons' mean damage summed and
    /// divided into the defender's wound pool. Not trial-correlated; the
    /// per-weapon `Stats.killChance` comes from simulated model deaths.
    #[serde(rename = "Kills")]
    pub kills: u32,
}

/// attacker name → defender name → per-weapon results plus `Kills`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BatchReport {
    pub attackers: BTreeMap<String, BTreeMap<String, DefenderReport>>,
}

/// Whole models removed if the summed mean damage were allocated model by model.
pub fn approximate_kills(mean_damage: f64, defender: &DefenderProfile) -> u32 {
    if mean_damage <= 0.0 || defender.wounds == 0 {
        return 0;
    }
    let whole = (mean_damage / f64::from(defender.wounds)).floor();
    (whole as u32).min(defender.models)
}

/// Flat row per attacker × defender × weapon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub attacker: String,
    pub defender: String,
    pub weapon: String,
    pub hits: f64,
    pub wounds: f64,
    pub failed_saves: f64,
    pub damage: f64,
    pub median: f64,
    pub std: f64,
    pub p90: f64,
    pub kill_chance: f64,
    pub wipe_chance: f64,
    /// Defender-level approximation, repeated on each of its weapon rows.
    pub kills_estimate: u32,
}

impl BatchReport {
    pub fn insert(&mut self, attacker: &str, defender: &str, weapon: String, result: WeaponResult) {
        self.attackers
            .entry(attacker.to_string())
            .or_default()
            .entry(defender.to_string())
            .or_default()
            .weapons
            .insert(weapon, result);
    }

    pub fn defender_report(&self, attacker: &str, defender: &str) -> Option<&DefenderReport> {
        self.attackers.get(attacker)?.get(defender)
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        let mut rows = Vec::new();
        for (attacker, defenders) in &self.attackers {
            for (defender, report) in defenders {
                for (weapon, result) in &report.weapons {
                    rows.push(ReportRow {
                        attacker: attacker.clone(),
                        defender: defender.clone(),
                        weapon: weapon.clone(),
                        hits: result.hits,
                        wounds: result.wounds,
                        failed_saves: result.failed_saves,
                        damage: result.damage,
                        median: result.stats.median,
                        std: result.stats.std,
                        p90: result.stats.p90,
                        kill_chance: result.stats.kill_chance,
                        wipe_chance: result.stats.wipe_chance,
                        kills_estimate: report.kills,
                    });
                }
            }
        }
        rows
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_csv(&self) -> Result<String, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in self.rows() {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Tab-separated table for terminals.
    pub fn to_table(&self) -> String {
        let mut out = String::from(
            "attacker\tdefender\tweapon\thits\twounds\tfailed_saves\tdamage\tmedian\tp90\tkill_chance\tkills~\n",
        );
        for row in self.rows() {
            out.push_str(&format!(
                "{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}\t{:.3}\t{}\n",
                row.attacker,
                row.defender,
                row.weapon,
                row.hits,
                row.wounds,
                row.failed_saves,
                row.damage,
                row.median,
                row.p90,
                row.kill_chance,
                row.kills_estimate,
            ));
        }
        out
    }
}
