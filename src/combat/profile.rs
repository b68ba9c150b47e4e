//! Weapon and defender profiles.
//!
//! [WeaponInput] and [DefenderInput] are the loose records an army-list reader
//! hands over (numbers may arrive as `3`, `"3"` or `"3+"`). Converting them
//! into [WeaponProfile] / [DefenderProfile] validates every field and derives
//! the keyword effect sets, so nothing downstream re-reads strings.

use serde::{Deserialize, Serialize};

use crate::combat::dice::DiceExpr;
use crate::combat::keywords::{normalize_tag, DefenderEffects, WeaponEffects};
use crate::error::ProfileError;

/// Upper bound on to-hit, strength, toughness, save and |AP|.
pub const MAX_CHARACTERISTIC: i64 = 1000;

/// Upper bound on wounds, models, amount and fixed attack or damage values.
pub const MAX_COUNT: i64 = 10_000;

/// A number, or a string holding a number or dice expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for StatValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for StatValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    #[default]
    Ranged,
    Melee,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: WeaponKind,
    #[serde(default)]
    pub attacks: Option<StatValue>,
    #[serde(default, alias = "bs", alias = "ws", alias = "skill")]
    pub to_hit: Option<StatValue>,
    #[serde(default, alias = "s")]
    pub strength: Option<StatValue>,
    #[serde(default)]
    pub ap: Option<StatValue>,
    #[serde(default, alias = "d")]
    pub damage: Option<StatValue>,
    #[serde(default)]
    pub amount: Option<StatValue>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefenderInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "t")]
    pub toughness: Option<StatValue>,
    #[serde(default, alias = "w")]
    pub wounds: Option<StatValue>,
    #[serde(default)]
    pub models: Option<StatValue>,
    #[serde(default, alias = "sv")]
    pub save: Option<StatValue>,
    #[serde(default, alias = "invuln")]
    pub invulnerable: Option<StatValue>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeaponProfile {
    pub name: String,
    pub kind: WeaponKind,
    pub attacks: DiceExpr,
    pub to_hit: i32,
    pub strength: i32,
    /// Always `<= 0`; subtracted from the save characteristic.
    pub ap: i32,
    pub damage: DiceExpr,
    pub amount: u32,
    pub keywords: Vec<String>,
    pub effects: WeaponEffects,
}

impl WeaponProfile {
    pub fn new(
        name: impl Into<String>,
        attacks: DiceExpr,
        to_hit: i32,
        strength: i32,
        ap: i32,
        damage: DiceExpr,
    ) -> Self {
        Self {
            name: name.into(),
            kind: WeaponKind::Ranged,
            attacks,
            to_hit,
            strength,
            ap: -ap.saturating_abs(),
            damage,
            amount: 1,
            keywords: Vec::new(),
            effects: WeaponEffects::default(),
        }
    }

    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.keywords = keywords.iter().map(|k| AsRef::<str>::as_ref(k).to_string()).collect();
        self.effects = WeaponEffects::from_keywords(&self.keywords);
        self
    }

    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_kind(mut self, kind: WeaponKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn from_input(input: &WeaponInput, fallback_name: &str) -> Result<Self, ProfileError> {
        let name = input
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());
        let effects = WeaponEffects::from_keywords(&input.keywords);

        let attacks = required_dice(&name, "attacks", input.attacks.as_ref())?;
        // Torrent profiles commonly list their skill as "N/A".
        let to_hit = match required_int(&name, "to_hit", input.to_hit.as_ref()) {
            Ok(value) => in_range(&name, "to_hit", value, 1, MAX_CHARACTERISTIC)?,
            Err(_) if effects.torrent => 0,
            Err(err) => return Err(err),
        };
        let strength = in_range(
            &name,
            "strength",
            required_int(&name, "strength", input.strength.as_ref())?,
            1,
            MAX_CHARACTERISTIC,
        )?;
        let ap = match input.ap.as_ref() {
            Some(value) => in_range(
                &name,
                "ap",
                required_int(&name, "ap", Some(value))?,
                -MAX_CHARACTERISTIC,
                MAX_CHARACTERISTIC,
            )?,
            None => 0,
        };
        let damage = required_dice(&name, "damage", input.damage.as_ref())?;
        let amount = match input.amount.as_ref() {
            Some(value) => in_range(
                &name,
                "amount",
                required_int(&name, "amount", Some(value))?,
                0,
                MAX_COUNT,
            )?,
            None => 1,
        };

        Ok(Self {
            name,
            kind: input.kind,
            attacks,
            to_hit: clamp_i32(to_hit),
            strength: clamp_i32(strength),
            ap: -clamp_i32(ap).saturating_abs(),
            damage,
            amount: to_u32(amount),
            keywords: input.keywords.clone(),
            effects,
        })
    }

    pub fn is_melee(&self) -> bool {
        self.kind == WeaponKind::Melee
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefenderProfile {
    pub name: String,
    pub toughness: i32,
    pub wounds: u32,
    pub models: u32,
    pub save: i32,
    /// `None` when the unit has no invulnerable save.
    pub invulnerable: Option<i32>,
    pub unit_type: Option<String>,
    pub keywords: Vec<String>,
    pub effects: DefenderEffects,
}

impl DefenderProfile {
    pub fn new(name: impl Into<String>, toughness: i32, wounds: u32, models: u32, save: i32) -> Self {
        Self {
            name: name.into(),
            toughness,
            wounds,
            models,
            save,
            invulnerable: None,
            unit_type: None,
            keywords: Vec::new(),
            effects: DefenderEffects::default(),
        }
    }

    pub fn with_invulnerable(mut self, invulnerable: Option<i32>) -> Self {
        self.invulnerable = invulnerable;
        self
    }

    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.keywords = keywords.iter().map(|k| AsRef::<str>::as_ref(k).to_string()).collect();
        self.effects = DefenderEffects::from_keywords(&self.keywords);
        self
    }

    pub fn with_unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    pub fn from_input(input: &DefenderInput, fallback_name: &str) -> Result<Self, ProfileError> {
        let name = input
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let toughness = required_int(&name, "toughness", input.toughness.as_ref())?;
        let wounds = required_int(&name, "wounds", input.wounds.as_ref())?;
        let models = required_int(&name, "models", input.models.as_ref())?;
        let save = required_int(&name, "save", input.save.as_ref())?;

        Ok(Self {
            toughness: clamp_i32(in_range(&name, "toughness", toughness, 1, MAX_CHARACTERISTIC)?),
            wounds: to_u32(in_range(&name, "wounds", wounds, 1, MAX_COUNT)?),
            models: to_u32(in_range(&name, "models", models, 1, MAX_COUNT)?),
            save: clamp_i32(in_range(&name, "save", save, 1, MAX_CHARACTERISTIC)?),
            invulnerable: optional_invulnerable(&name, input.invulnerable.as_ref())?,
            unit_type: input.unit_type.clone(),
            keywords: input.keywords.clone(),
            effects: DefenderEffects::from_keywords(&input.keywords),
            name,
        })
    }

    /// Case-insensitive substring match against the declared type and every keyword.
    pub fn matches_category(&self, category: &str) -> bool {
        let category = normalize_tag(category);
        if category.is_empty() {
            return false;
        }
        self.unit_type
            .iter()
            .chain(self.keywords.iter())
            .any(|declared| normalize_tag(declared).contains(&category))
    }

    pub fn total_wounds(&self) -> u64 {
        u64::from(self.wounds) * u64::from(self.models)
    }
}

fn required_int(
    profile: &str,
    field: &'static str,
    value: Option<&StatValue>,
) -> Result<i64, ProfileError> {
    let invalid = |value: String| ProfileError::InvalidField {
        profile: profile.to_string(),
        field,
        value,
    };
    match value {
        None => Err(ProfileError::MissingField {
            profile: profile.to_string(),
            field,
        }),
        Some(StatValue::Int(value)) => Ok(*value),
        Some(StatValue::Float(value)) => {
            if value.fract() == 0.0 && value.is_finite() {
                Ok(*value as i64)
            } else {
                Err(invalid(value.to_string()))
            }
        }
        Some(StatValue::Text(text)) => parse_stat_text(text).ok_or_else(|| invalid(text.clone())),
    }
}

/// `"3"`, `"3+"`, `"-2"`, `"+1"` → number.
fn parse_stat_text(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('+').unwrap_or(trimmed).trim_end();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if unsigned.is_empty() {
        return None;
    }
    unsigned.parse().ok()
}

fn required_dice(
    profile: &str,
    field: &'static str,
    value: Option<&StatValue>,
) -> Result<DiceExpr, ProfileError> {
    match value {
        Some(StatValue::Text(text)) => DiceExpr::parse(text).map_err(|source| ProfileError::Dice {
            profile: profile.to_string(),
            field,
            source,
        }),
        other => {
            let value = required_int(profile, field, other)?;
            Ok(DiceExpr::constant(clamp_i32(in_range(profile, field, value, 0, MAX_COUNT)?)))
        }
    }
}

fn optional_invulnerable(
    profile: &str,
    value: Option<&StatValue>,
) -> Result<Option<i32>, ProfileError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if let StatValue::Text(text) = value {
        let trimmed = text.trim();
        if trimmed.is_empty()
            || trimmed == "-"
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("n/a")
        {
            return Ok(None);
        }
    }
    let value = required_int(profile, "invulnerable", Some(value))?;
    // 0 and anything past a d6 mean "no invulnerable save".
    Ok((1..=6).contains(&value).then_some(value as i32))
}

fn in_range(
    profile: &str,
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<i64, ProfileError> {
    if !(min..=max).contains(&value) {
        return Err(ProfileError::OutOfRange {
            profile: profile.to_string(),
            field,
            min,
            max,
            value,
        });
    }
    Ok(value)
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
