pub mod dice;
pub mod engine;
pub mod keywords;
pub mod profile;
pub mod rng;

pub use dice::DiceExpr;
pub use engine::{
    apply_damage, apply_feel_no_pain, attack_count, critical_wound_roll, damage_instance,
    hit_target, resolve_damage, resolve_hits, resolve_saves, resolve_wounds, roll_with_reroll,
    save_target, serialize_events_json, simulate_trial, simulate_trial_traced, to_save_target,
    to_wound_target, wound_target, CombatEvent, DamageOutcome, Engagement, FeelNoPainMode,
    HitOutcome, SaveOutcome, SimulationConfig, TraceCollector, TrialResult, WoundOutcome,
    BLAST_MODELS_PER_ATTACK, COVER_SAVE_LIMIT, CRITICAL_ROLL,
};
pub use keywords::{
    normalize_tag, parse_keyword, unrecognized_keywords, DefenderEffects, Keyword, RerollPolicy,
    Stage, WeaponEffects,
};
pub use profile::{
    DefenderInput, DefenderProfile, StatValue, WeaponInput, WeaponKind, WeaponProfile,
};
pub use rng::{DiceSource, Rng, ScriptedDice};
