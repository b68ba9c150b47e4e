//! Hit → wound → save → damage resolution for one weapon against one unit.
//!
//! Each stage is a free function over the already-resolved profiles and a
//! [DiceSource], so stages can be exercised alone with scripted dice. Target
//! numbers are left unclamped: a 1+ to hit lets a natural 1 through and a 7+
//! never succeeds. The one exception is an Anti-X critical wound, which
//! wounds whatever the target.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::combat::profile::{DefenderProfile, WeaponProfile};
use crate::combat::rng::DiceSource;

/// Natural roll that is always critical.
pub const CRITICAL_ROLL: u32 = 6;

/// Units of this many models grant one extra Blast attack.
pub const BLAST_MODELS_PER_ATTACK: u32 = 5;

/// Cover only lowers AP while the save it produces stays at this value or better.
pub const COVER_SAVE_LIMIT: i32 = 3;

/// How Feel No Pain rolls are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeelNoPainMode {
    /// One roll per damage instance; a success negates the whole instance.
    #[default]
    PerInstance,
    /// One roll per point of damage; each success negates one point.
    PerPoint,
}

/// Battlefield situation the attack happens in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Target within half range: enables Rapid Fire and Melta.
    #[serde(default)]
    pub half_range: bool,
    /// Attacker did not move: enables Heavy.
    #[serde(default)]
    pub stationary: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub feel_no_pain: FeelNoPainMode,
}

/// Outcome of one full pass through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrialResult {
    pub attacks: u32,
    /// Hits that go on to roll to wound (Lethal Hits conversions excluded).
    pub hits: u32,
    /// Every successful wound, including Lethal Hits and mortal wounds.
    pub wounds: u32,
    pub mortal_wounds: u32,
    pub failed_saves: u32,
    pub damage: u32,
    pub models_destroyed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitOutcome {
    pub attacks: u32,
    pub target: i32,
    pub hits: u32,
    pub critical_hits: u32,
    /// Lethal Hits conversions that skip the wound roll.
    pub auto_wounds: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WoundOutcome {
    pub target: i32,
    pub critical_at: u32,
    /// Wounds that still face a saving throw.
    pub wounds: u32,
    pub critical_wounds: u32,
    /// Devastating Wounds conversions that bypass saves.
    pub mortal_wounds: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub target: i32,
    pub failed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DamageOutcome {
    pub damage: u32,
    pub negated: u32,
    pub models_destroyed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatEvent {
    pub event_type: String,
    pub phase: String,
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct TraceCollector {
    enabled: bool,
    events: Vec<CombatEvent>,
}

impl TraceCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, event: CombatEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CombatEvent> {
        self.events
    }
}

pub fn serialize_events_json(events: &[CombatEvent]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(events)
}

/// Rolls one die and rerolls it once when `should_reroll` says so.
pub fn roll_with_reroll(dice: &mut impl DiceSource, should_reroll: impl Fn(u32) -> bool) -> u32 {
    let first = dice.d6();
    if should_reroll(first) {
        dice.d6()
    } else {
        first
    }
}

/// Strength-vs-Toughness table.
pub fn to_wound_target(strength: i32, toughness: i32) -> i32 {
    let (strength, toughness) = (i64::from(strength), i64::from(toughness));
    if strength >= 2 * toughness {
        2
    } else if strength > toughness {
        3
    } else if strength == toughness {
        4
    } else if 2 * strength <= toughness {
        6
    } else {
        5
    }
}

/// `save - ap`, improved to `invulnerable` when that is lower.
pub fn to_save_target(save: i32, ap: i32, invulnerable: Option<i32>) -> i32 {
    let armour = save.saturating_sub(ap);
    match invulnerable {
        Some(invulnerable) if invulnerable < armour => invulnerable,
        _ => armour,
    }
}

/// Wounds left on a model after taking `damage`.
pub fn apply_damage(wounds: u32, damage: u32) -> u32 {
    wounds.saturating_sub(damage)
}

pub fn attack_count(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    engagement: Engagement,
    dice: &mut impl DiceSource,
) -> u32 {
    let mut per_weapon = weapon.attacks.roll(dice);
    if engagement.half_range {
        per_weapon = per_weapon.saturating_add(weapon.effects.rapid_fire.unwrap_or(0));
    }
    let mut attacks = per_weapon.saturating_mul(weapon.amount);
    if weapon.effects.blast {
        attacks = attacks.saturating_add(defender.models / BLAST_MODELS_PER_ATTACK);
    }
    attacks
}

pub fn hit_target(weapon: &WeaponProfile, defender: &DefenderProfile, engagement: Engagement) -> i32 {
    let mut modifier = weapon.effects.hit_modifier + defender.effects.hit_modifier;
    if !weapon.is_melee() {
        if weapon.effects.heavy && engagement.stationary {
            modifier += 1;
        }
        if defender.effects.stealth {
            modifier -= 1;
        }
    }
    weapon.to_hit.saturating_sub(modifier)
}

pub fn resolve_hits(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    engagement: Engagement,
    dice: &mut impl DiceSource,
) -> HitOutcome {
    let attacks = attack_count(weapon, defender, engagement, dice);
    let target = hit_target(weapon, defender, engagement);
    if weapon.effects.torrent {
        return HitOutcome {
            attacks,
            target,
            hits: attacks,
            ..HitOutcome::default()
        };
    }

    let effects = &weapon.effects;
    let mut outcome = HitOutcome {
        attacks,
        target,
        ..HitOutcome::default()
    };
    for _ in 0..attacks {
        let roll = roll_with_reroll(dice, |roll| {
            effects.hit_reroll.should_reroll(roll, target, CRITICAL_ROLL)
        });
        if (roll as i32) < target {
            continue;
        }
        outcome.hits += 1;
        if roll < CRITICAL_ROLL {
            continue;
        }
        outcome.critical_hits += 1;
        if let Some(extra) = effects.sustained_hits {
            outcome.hits = outcome.hits.saturating_add(extra.roll(dice));
        }
        if effects.lethal_hits {
            outcome.hits -= 1;
            outcome.auto_wounds += 1;
        }
    }
    outcome
}

pub fn wound_target(weapon: &WeaponProfile, defender: &DefenderProfile) -> i32 {
    let mut modifier = weapon.effects.wound_modifier + defender.effects.wound_modifier;
    if weapon.effects.lance && weapon.is_melee() {
        modifier += 1;
    }
    to_wound_target(weapon.strength, defender.toughness).saturating_sub(modifier)
}

/// Natural roll at which a wound roll becomes critical against this defender.
pub fn critical_wound_roll(weapon: &WeaponProfile, defender: &DefenderProfile) -> u32 {
    weapon
        .effects
        .anti_threshold_for(|category| defender.matches_category(category))
        .map_or(CRITICAL_ROLL, |threshold| threshold.min(CRITICAL_ROLL))
}

pub fn resolve_wounds(
    hits: u32,
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    dice: &mut impl DiceSource,
) -> WoundOutcome {
    let target = wound_target(weapon, defender);
    let critical_at = critical_wound_roll(weapon, defender);
    let effects = &weapon.effects;
    let mut outcome = WoundOutcome {
        target,
        critical_at,
        ..WoundOutcome::default()
    };
    for _ in 0..hits {
        let roll = roll_with_reroll(dice, |roll| {
            effects.wound_reroll.should_reroll(roll, target, critical_at)
        });
        // an Anti-X critical wounds even below the target; a plain 6 does not
        let anti_critical = critical_at < CRITICAL_ROLL && roll >= critical_at;
        if !anti_critical && (roll as i32) < target {
            continue;
        }
        if roll >= critical_at {
            outcome.critical_wounds += 1;
            if effects.devastating_wounds {
                outcome.mortal_wounds += 1;
                continue;
            }
        }
        outcome.wounds += 1;
    }
    outcome
}

pub fn save_target(weapon: &WeaponProfile, defender: &DefenderProfile) -> i32 {
    let modifier = weapon.effects.save_modifier + defender.effects.save_modifier;
    let armour = defender.save.saturating_sub(modifier);
    let mut ap = weapon.ap;
    if defender.effects.cover
        && !weapon.effects.ignores_cover
        && armour.saturating_sub(ap.saturating_add(1)) <= COVER_SAVE_LIMIT
    {
        ap = ap.saturating_add(1);
    }
    to_save_target(armour, ap, defender.invulnerable)
}

pub fn resolve_saves(
    wounds: u32,
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    dice: &mut impl DiceSource,
) -> SaveOutcome {
    let target = save_target(weapon, defender);
    let failed = (0..wounds)
        .filter(|_| (dice.d6() as i32) < target)
        .count() as u32;
    SaveOutcome { target, failed }
}

/// Damage of one unsaved wound or mortal wound before Feel No Pain.
///
/// Order: rolled damage, weapon bonus, defender halving (floor, min 1),
/// defender flat reduction (min 1).
pub fn damage_instance(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    engagement: Engagement,
    dice: &mut impl DiceSource,
) -> u32 {
    let mut amount = i64::from(weapon.damage.roll(dice)) + i64::from(weapon.effects.damage_modifier);
    if engagement.half_range {
        amount += i64::from(weapon.effects.melta.unwrap_or(0));
    }
    let mut amount = amount.clamp(0, i64::from(u32::MAX)) as u32;
    if amount == 0 {
        return 0;
    }
    if defender.effects.halve_damage {
        amount = (amount / 2).max(1);
    }
    if defender.effects.damage_reduction > 0 {
        amount = amount.saturating_sub(defender.effects.damage_reduction).max(1);
    }
    amount
}

/// Rolls Feel No Pain against one damage instance and returns what gets through.
pub fn apply_feel_no_pain(
    amount: u32,
    threshold: Option<u32>,
    mode: FeelNoPainMode,
    dice: &mut impl DiceSource,
) -> u32 {
    let Some(threshold) = threshold else {
        return amount;
    };
    if amount == 0 {
        return 0;
    }
    match mode {
        FeelNoPainMode::PerInstance => {
            if dice.d6() >= threshold {
                0
            } else {
                amount
            }
        }
        FeelNoPainMode::PerPoint => (0..amount).filter(|_| dice.d6() < threshold).count() as u32,
    }
}

/// Allocates unsaved wounds, then mortal wounds, one model at a time.
/// Damage beyond a model's remaining wounds is lost.
pub fn resolve_damage(
    failed_saves: u32,
    mortal_wounds: u32,
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    config: &SimulationConfig,
    dice: &mut impl DiceSource,
) -> DamageOutcome {
    let mut outcome = DamageOutcome::default();
    let mut models_left = defender.models;
    let mut remaining = defender.wounds;

    for _ in 0..failed_saves.saturating_add(mortal_wounds) {
        if models_left == 0 {
            break;
        }
        let rolled = damage_instance(weapon, defender, config.engagement, dice);
        let dealt = apply_feel_no_pain(
            rolled,
            defender.effects.feel_no_pain,
            config.feel_no_pain,
            dice,
        );
        outcome.negated = outcome.negated.saturating_add(rolled - dealt);
        outcome.damage = outcome.damage.saturating_add(dealt);

        remaining = apply_damage(remaining, dealt);
        if remaining == 0 {
            outcome.models_destroyed += 1;
            models_left -= 1;
            remaining = defender.wounds;
        }
    }
    outcome
}

pub fn simulate_trial(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    config: &SimulationConfig,
    dice: &mut impl DiceSource,
) -> TrialResult {
    simulate_trial_traced(weapon, defender, config, dice, &mut TraceCollector::new(false))
}

pub fn simulate_trial_traced(
    weapon: &WeaponProfile,
    defender: &DefenderProfile,
    config: &SimulationConfig,
    dice: &mut impl DiceSource,
    trace: &mut TraceCollector,
) -> TrialResult {
    let hit = resolve_hits(weapon, defender, config.engagement, dice);
    record_phase(trace, "hit", &hit);

    let wound = resolve_wounds(hit.hits, weapon, defender, dice);
    record_phase(trace, "wound", &wound);

    let save = resolve_saves(wound.wounds + hit.auto_wounds, weapon, defender, dice);
    record_phase(trace, "save", &save);

    let damage = resolve_damage(save.failed, wound.mortal_wounds, weapon, defender, config, dice);
    record_phase(trace, "damage", &damage);

    TrialResult {
        attacks: hit.attacks,
        hits: hit.hits,
        wounds: wound.wounds + wound.mortal_wounds + hit.auto_wounds,
        mortal_wounds: wound.mortal_wounds,
        failed_saves: save.failed,
        damage: damage.damage,
        models_destroyed: damage.models_destroyed,
    }
}

fn record_phase(trace: &mut TraceCollector, phase: &str, outcome: &impl Serialize) {
    if !trace.is_enabled() {
        return;
    }
    let values = match serde_json::to_value(outcome) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    trace.record(CombatEvent {
        event_type: "phase_resolved".to_string(),
        phase: phase.to_string(),
        values,
    });
}
