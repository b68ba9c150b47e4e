use serde::Serialize;

use crate::orchestrator::report::BatchReport;

#[derive(Debug, Clone, Serialize)]
pub struct RankedWeapon {
    pub attacker: String,
    pub defender: String,
    pub weapon: String,
    pub kill_chance: f64,
    pub mean_damage: f64,
}

/// Every weapon result of the report, best first: kill chance, then mean
/// damage, then names for a stable order.
pub fn rank_weapons(report: &BatchReport) -> Vec<RankedWeapon> {
    let mut ranked: Vec<RankedWeapon> = report
        .rows()
        .into_iter()
        .map(|row| RankedWeapon {
            attacker: row.attacker,
            defender: row.defender,
            weapon: row.weapon,
            kill_chance: row.kill_chance,
            mean_damage: row.damage,
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .kill_chance
            .total_cmp(&left.kill_chance)
            .then_with(|| right.mean_damage.total_cmp(&left.mean_damage))
            .then_with(|| left.attacker.cmp(&right.attacker))
            .then_with(|| left.weapon.cmp(&right.weapon))
    });

    ranked
}
