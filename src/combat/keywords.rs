//! Free-text rule tags resolved into typed effect sets.
//!
//! Tags arrive from army-list exports as loose strings ("Sustained Hits D3",
//! "anti-vehicle 4+", "+1 to hit"). [parse_keyword] turns one tag into a
//! [Keyword]; [WeaponEffects::from_keywords] and
//! [DefenderEffects::from_keywords] fold a whole list into the flags and
//! values the pipeline reads. Folding happens once, when a profile is built.
//!
//! Unrecognized tags are never an error. Repeating a tag does not stack it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::combat::dice::DiceExpr;

/// Pipeline stage a modifier or reroll applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Hit,
    Wound,
    Save,
    Damage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerollPolicy {
    #[default]
    None,
    /// Reroll every roll that neither meets the target nor is critical.
    RerollMisses,
    /// Reroll failed natural 1s.
    Reroll1s,
    /// Reroll everything short of a critical, hits included.
    RerollNonCritical,
}

impl RerollPolicy {
    const fn precedence(self) -> u8 {
        match self {
            Self::None => 0,
            Self::RerollNonCritical => 1,
            Self::Reroll1s => 2,
            Self::RerollMisses => 3,
        }
    }

    /// Keeps whichever policy wins: misses > natural 1s > non-critical.
    pub fn merge(self, other: Self) -> Self {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    pub fn should_reroll(self, roll: u32, target: i32, critical_at: u32) -> bool {
        let missed = (roll as i32) < target && roll < critical_at;
        match self {
            Self::None => false,
            Self::RerollMisses => missed,
            Self::Reroll1s => roll == 1 && missed,
            Self::RerollNonCritical => roll < critical_at,
        }
    }
}

/// One recognized rule tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    LethalHits,
    DevastatingWounds,
    TwinLinked,
    Blast,
    Hazardous,
    Precision,
    Torrent,
    IgnoresCover,
    Heavy,
    Lance,
    Cover,
    Stealth,
    HalfDamage,
    SustainedHits(DiceExpr),
    RapidFire(u32),
    Melta(u32),
    Anti { category: String, threshold: u32 },
    FeelNoPain(u32),
    Modifier { stage: Stage, delta: i32 },
    Reroll { stage: Stage, policy: RerollPolicy },
}

/// Lowercase, unify `re-roll`/`reroll` and dash variants, collapse whitespace.
pub fn normalize_tag(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace("re-roll", "reroll")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_keyword(raw: &str) -> Option<Keyword> {
    let tag = normalize_tag(raw);
    let keyword = match tag.as_str() {
        "lethal hits" => Keyword::LethalHits,
        "devastating wounds" => Keyword::DevastatingWounds,
        "twin-linked" | "twin linked" => Keyword::TwinLinked,
        "blast" => Keyword::Blast,
        "hazardous" => Keyword::Hazardous,
        "precision" => Keyword::Precision,
        "torrent" => Keyword::Torrent,
        "ignores cover" => Keyword::IgnoresCover,
        "heavy" => Keyword::Heavy,
        "lance" => Keyword::Lance,
        "cover" | "in cover" | "benefit of cover" => Keyword::Cover,
        "stealth" => Keyword::Stealth,
        "half damage" | "halve damage" | "halves damage" | "damage halved" => Keyword::HalfDamage,
        _ => return parse_parametrized(&tag),
    };
    Some(keyword)
}

fn parse_parametrized(tag: &str) -> Option<Keyword> {
    if let Some(rest) = tag.strip_prefix("sustained hits") {
        let value = rest.trim();
        let value = value.strip_suffix('+').unwrap_or(value);
        return DiceExpr::parse(value).ok().map(Keyword::SustainedHits);
    }
    if let Some(rest) = tag.strip_prefix("rapid fire") {
        return parse_threshold(rest).map(Keyword::RapidFire);
    }
    if let Some(rest) = tag.strip_prefix("melta") {
        return parse_threshold(rest).map(Keyword::Melta);
    }
    if let Some(rest) = tag
        .strip_prefix("feel no pain")
        .or_else(|| tag.strip_prefix("fnp"))
    {
        return parse_threshold(rest).map(Keyword::FeelNoPain);
    }
    if let Some(rest) = tag.strip_prefix("anti-").or_else(|| tag.strip_prefix("anti ")) {
        return parse_anti(rest);
    }
    if let Some(rest) = tag.strip_prefix("reroll ") {
        return parse_reroll(rest);
    }
    parse_modifier(tag)
}

/// `4`, `4+`, ` 4 +` → 4. Anything else is not a parameter.
fn parse_threshold(raw: &str) -> Option<u32> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    let digits = compact.strip_suffix('+').unwrap_or(&compact);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_anti(rest: &str) -> Option<Keyword> {
    let (category, threshold) = rest.split_once(' ')?;
    if category.is_empty()
        || !category
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_')
    {
        return None;
    }
    Some(Keyword::Anti {
        category: category.to_string(),
        threshold: parse_threshold(threshold)?,
    })
}

fn parse_reroll(rest: &str) -> Option<Keyword> {
    let stage = if rest.contains("hit") {
        Stage::Hit
    } else if rest.contains("wound") {
        Stage::Wound
    } else {
        return None;
    };
    let words: Vec<&str> = rest.split_whitespace().collect();
    let policy = if rest.contains("critical") {
        RerollPolicy::RerollNonCritical
    } else if words
        .iter()
        .any(|word| matches!(*word, "1" | "1s" | "ones"))
    {
        RerollPolicy::Reroll1s
    } else {
        RerollPolicy::RerollMisses
    };
    Some(Keyword::Reroll { stage, policy })
}

fn parse_modifier(tag: &str) -> Option<Keyword> {
    let mut words = tag.split_whitespace();
    let delta = match words.next()? {
        "+1" => 1,
        "-1" => -1,
        _ => return None,
    };
    let mut stage_word = words.next()?;
    if stage_word == "to" {
        stage_word = words.next()?;
    }
    if words.next().is_some() {
        return None;
    }
    let stage = match stage_word {
        "hit" | "hits" => Stage::Hit,
        "wound" | "wounds" => Stage::Wound,
        "save" | "saves" => Stage::Save,
        "damage" => Stage::Damage,
        _ => return None,
    };
    Some(Keyword::Modifier { stage, delta })
}

/// Net roll modifiers from a tag list. A `(stage, delta)` pair counts once.
#[derive(Debug, Default)]
struct ModifierTally {
    seen: BTreeSet<(Stage, i32)>,
}

impl ModifierTally {
    fn add(&mut self, stage: Stage, delta: i32) {
        self.seen.insert((stage, delta));
    }

    fn net(&self, stage: Stage) -> i32 {
        self.seen
            .iter()
            .filter(|(seen_stage, _)| *seen_stage == stage)
            .map(|(_, delta)| delta)
            .sum()
    }
}

/// Attacker-side effects of a weapon's keywords.
///
/// Modifiers are roll modifiers: `hit_modifier == 1` lowers the to-hit target
/// by one. `damage_modifier` is added to every damage instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeaponEffects {
    pub lethal_hits: bool,
    pub devastating_wounds: bool,
    pub twin_linked: bool,
    pub blast: bool,
    pub hazardous: bool,
    pub precision: bool,
    pub torrent: bool,
    pub ignores_cover: bool,
    pub heavy: bool,
    pub lance: bool,
    pub sustained_hits: Option<DiceExpr>,
    pub rapid_fire: Option<u32>,
    pub melta: Option<u32>,
    pub anti: BTreeMap<String, u32>,
    pub hit_modifier: i32,
    pub wound_modifier: i32,
    pub save_modifier: i32,
    pub damage_modifier: i32,
    pub hit_reroll: RerollPolicy,
    pub wound_reroll: RerollPolicy,
}

impl WeaponEffects {
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut effects = Self::default();
        let mut modifiers = ModifierTally::default();

        for raw in keywords {
            let raw: &str = raw.as_ref();
            let Some(keyword) = parse_keyword(raw) else {
                tracing::trace!(keyword = raw, "ignoring unrecognized weapon keyword");
                continue;
            };
            match keyword {
                Keyword::LethalHits => effects.lethal_hits = true,
                Keyword::DevastatingWounds => effects.devastating_wounds = true,
                Keyword::TwinLinked => {
                    effects.twin_linked = true;
                    effects.wound_reroll = effects.wound_reroll.merge(RerollPolicy::RerollMisses);
                }
                Keyword::Blast => effects.blast = true,
                Keyword::Hazardous => effects.hazardous = true,
                Keyword::Precision => effects.precision = true,
                Keyword::Torrent => effects.torrent = true,
                Keyword::IgnoresCover => effects.ignores_cover = true,
                Keyword::Heavy => effects.heavy = true,
                Keyword::Lance => effects.lance = true,
                Keyword::SustainedHits(value) => {
                    effects.sustained_hits.get_or_insert(value);
                }
                Keyword::RapidFire(value) => {
                    effects.rapid_fire.get_or_insert(value);
                }
                Keyword::Melta(value) => {
                    effects.melta.get_or_insert(value);
                }
                Keyword::Anti {
                    category,
                    threshold,
                } => {
                    effects.anti.entry(category).or_insert(threshold);
                }
                Keyword::Modifier { stage, delta } => modifiers.add(stage, delta),
                Keyword::Reroll {
                    stage: Stage::Hit,
                    policy,
                } => effects.hit_reroll = effects.hit_reroll.merge(policy),
                Keyword::Reroll {
                    stage: Stage::Wound,
                    policy,
                } => effects.wound_reroll = effects.wound_reroll.merge(policy),
                other => {
                    tracing::trace!(keyword = ?other, "defender keyword has no effect on a weapon");
                }
            }
        }

        effects.hit_modifier = modifiers.net(Stage::Hit);
        effects.wound_modifier = modifiers.net(Stage::Wound);
        effects.save_modifier = modifiers.net(Stage::Save);
        effects.damage_modifier = modifiers.net(Stage::Damage);
        effects
    }

    /// Lowest Anti-X threshold whose category the defender declares.
    pub fn anti_threshold_for(&self, matches: impl Fn(&str) -> bool) -> Option<u32> {
        self.anti
            .iter()
            .filter(|(category, _)| matches(category))
            .map(|(_, threshold)| *threshold)
            .min()
    }
}

/// Defender-side effects. Tags that are not rules are kept as `categories`
/// ("infantry", "vehicle") for Anti-X matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefenderEffects {
    pub feel_no_pain: Option<u32>,
    pub halve_damage: bool,
    pub damage_reduction: u32,
    pub hit_modifier: i32,
    pub wound_modifier: i32,
    pub save_modifier: i32,
    pub cover: bool,
    pub stealth: bool,
    pub categories: Vec<String>,
}

impl DefenderEffects {
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut effects = Self::default();
        let mut modifiers = ModifierTally::default();

        for raw in keywords {
            let raw: &str = raw.as_ref();
            let Some(keyword) = parse_keyword(raw) else {
                let category = normalize_tag(raw);
                if !category.is_empty() && !effects.categories.contains(&category) {
                    effects.categories.push(category);
                }
                continue;
            };
            match keyword {
                Keyword::FeelNoPain(value) => {
                    effects.feel_no_pain.get_or_insert(value);
                }
                Keyword::HalfDamage => effects.halve_damage = true,
                Keyword::Cover => effects.cover = true,
                Keyword::Stealth => effects.stealth = true,
                Keyword::Modifier {
                    stage: Stage::Damage,
                    delta,
                } => {
                    if delta < 0 {
                        effects.damage_reduction = 1;
                    }
                }
                Keyword::Modifier { stage, delta } => modifiers.add(stage, delta),
                other => {
                    tracing::trace!(keyword = ?other, "weapon keyword has no effect on a defender");
                }
            }
        }

        effects.hit_modifier = modifiers.net(Stage::Hit);
        effects.wound_modifier = modifiers.net(Stage::Wound);
        effects.save_modifier = modifiers.net(Stage::Save);
        effects
    }
}

/// Tags in `keywords` that resolve to nothing.
pub fn unrecognized_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|raw| -> &str { raw.as_ref() })
        .filter(|raw| parse_keyword(raw).is_none())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tags_are_case_insensitive() {
        for raw in ["LETHAL HITS", "Lethal Hits", "lethal hits", "  lethal   hits "] {
            assert_eq!(parse_keyword(raw), Some(Keyword::LethalHits), "{raw}");
        }
        assert_eq!(parse_keyword("Twin Linked"), Some(Keyword::TwinLinked));
        assert_eq!(parse_keyword("twin-linked"), Some(Keyword::TwinLinked));
    }

    #[test]
    fn sustained_hits_accepts_constants_and_dice() {
        assert_eq!(
            parse_keyword("Sustained Hits 2"),
            Some(Keyword::SustainedHits(DiceExpr::constant(2)))
        );
        assert_eq!(
            parse_keyword("sustained hits D3"),
            Some(Keyword::SustainedHits(DiceExpr::dice(1, 3, 0)))
        );
        assert_eq!(
            parse_keyword("sustained hits d3+1"),
            Some(Keyword::SustainedHits(DiceExpr::dice(1, 3, 1)))
        );
        assert_eq!(parse_keyword("sustained hits"), None);
    }

    #[test]
    fn thresholds_tolerate_trailing_plus_and_spacing() {
        assert_eq!(parse_keyword("Feel No Pain 5+"), Some(Keyword::FeelNoPain(5)));
        assert_eq!(parse_keyword("feel no pain 6"), Some(Keyword::FeelNoPain(6)));
        assert_eq!(parse_keyword("FNP 4 +"), Some(Keyword::FeelNoPain(4)));
        assert_eq!(parse_keyword("Rapid Fire 2"), Some(Keyword::RapidFire(2)));
        assert_eq!(parse_keyword("melta 4"), Some(Keyword::Melta(4)));
        assert_eq!(parse_keyword("melta x"), None);
    }

    #[test]
    fn anti_tags_capture_category_and_threshold() {
        assert_eq!(
            parse_keyword("Anti-Vehicle 4+"),
            Some(Keyword::Anti {
                category: "vehicle".to_string(),
                threshold: 4
            })
        );
        assert_eq!(
            parse_keyword("anti-infantry 2"),
            Some(Keyword::Anti {
                category: "infantry".to_string(),
                threshold: 2
            })
        );
        assert_eq!(parse_keyword("anti-vehicle"), None);
    }

    #[test]
    fn modifiers_tolerate_optional_to() {
        let plus_hit = Some(Keyword::Modifier {
            stage: Stage::Hit,
            delta: 1,
        });
        assert_eq!(parse_keyword("+1 to hit"), plus_hit);
        assert_eq!(parse_keyword("+1 Hit"), plus_hit);
        assert_eq!(
            parse_keyword("-1 to wound"),
            Some(Keyword::Modifier {
                stage: Stage::Wound,
                delta: -1
            })
        );
        assert_eq!(
            parse_keyword("+1 damage"),
            Some(Keyword::Modifier {
                stage: Stage::Damage,
                delta: 1
            })
        );
        assert_eq!(parse_keyword("+2 to hit"), None);
        assert_eq!(parse_keyword("+1 to hit rolls against monsters"), None);
    }

    #[test]
    fn reroll_tags_pick_stage_and_policy() {
        assert_eq!(
            parse_keyword("Re-roll Hits"),
            Some(Keyword::Reroll {
                stage: Stage::Hit,
                policy: RerollPolicy::RerollMisses
            })
        );
        assert_eq!(
            parse_keyword("reroll 1s to hit"),
            Some(Keyword::Reroll {
                stage: Stage::Hit,
                policy: RerollPolicy::Reroll1s
            })
        );
        assert_eq!(
            parse_keyword("reroll wound rolls of 1"),
            Some(Keyword::Reroll {
                stage: Stage::Wound,
                policy: RerollPolicy::Reroll1s
            })
        );
        assert_eq!(
            parse_keyword("reroll non-critical hits"),
            Some(Keyword::Reroll {
                stage: Stage::Hit,
                policy: RerollPolicy::RerollNonCritical
            })
        );
        assert_eq!(parse_keyword("reroll charges"), None);
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let effects = WeaponEffects::from_keywords(&["pistol", "assault", "lethal hits"]);
        assert!(effects.lethal_hits);
        assert_eq!(
            unrecognized_keywords(&["pistol", "assault", "lethal hits"]),
            vec!["pistol".to_string(), "assault".to_string()]
        );
    }

    #[test]
    fn duplicates_do_not_stack() {
        let effects = WeaponEffects::from_keywords(&["+1 damage", "+1 Damage", "+1 to hit", "+1 hit"]);
        assert_eq!(effects.damage_modifier, 1);
        assert_eq!(effects.hit_modifier, 1);

        let effects = WeaponEffects::from_keywords(&["sustained hits 1", "sustained hits 2"]);
        assert_eq!(effects.sustained_hits, Some(DiceExpr::constant(1)));
    }

    #[test]
    fn opposite_modifiers_cancel() {
        let effects = WeaponEffects::from_keywords(&["+1 to hit", "-1 to hit"]);
        assert_eq!(effects.hit_modifier, 0);
    }

    #[test]
    fn resolution_is_idempotent() {
        let tags = ["Lethal Hits", "anti-vehicle 4+", "twin-linked", "Sustained Hits D3"];
        assert_eq!(
            WeaponEffects::from_keywords(&tags),
            WeaponEffects::from_keywords(&tags)
        );
    }

    #[test]
    fn twin_linked_sets_wound_reroll() {
        let effects = WeaponEffects::from_keywords(&["twin-linked"]);
        assert!(effects.twin_linked);
        assert_eq!(effects.wound_reroll, RerollPolicy::RerollMisses);
        assert_eq!(effects.hit_reroll, RerollPolicy::None);
    }

    #[test]
    fn reroll_precedence_prefers_misses_then_ones() {
        let effects =
            WeaponEffects::from_keywords(&["reroll non-critical hits", "reroll 1s to hit"]);
        assert_eq!(effects.hit_reroll, RerollPolicy::Reroll1s);
        let effects = WeaponEffects::from_keywords(&["reroll 1s to hit", "reroll hits"]);
        assert_eq!(effects.hit_reroll, RerollPolicy::RerollMisses);
    }

    #[test]
    fn reroll_predicates() {
        assert!(RerollPolicy::RerollMisses.should_reroll(3, 4, 6));
        assert!(!RerollPolicy::RerollMisses.should_reroll(4, 4, 6));
        assert!(!RerollPolicy::RerollMisses.should_reroll(6, 7, 6));
        assert!(RerollPolicy::Reroll1s.should_reroll(1, 3, 6));
        assert!(!RerollPolicy::Reroll1s.should_reroll(2, 3, 6));
        assert!(RerollPolicy::RerollNonCritical.should_reroll(5, 3, 6));
        assert!(!RerollPolicy::RerollNonCritical.should_reroll(6, 3, 6));
        assert!(!RerollPolicy::None.should_reroll(1, 6, 6));
    }

    #[test]
    fn defender_keywords_split_rules_from_categories() {
        let effects = DefenderEffects::from_keywords(&[
            "Infantry",
            "Feel No Pain 5+",
            "-1 Damage",
            "Cover",
            "-1 to hit",
            "Imperium",
        ]);
        assert_eq!(effects.feel_no_pain, Some(5));
        assert_eq!(effects.damage_reduction, 1);
        assert!(effects.cover);
        assert_eq!(effects.hit_modifier, -1);
        assert_eq!(effects.categories, vec!["infantry".to_string(), "imperium".to_string()]);
    }

    #[test]
    fn anti_threshold_uses_best_matching_category() {
        let effects = WeaponEffects::from_keywords(&["anti-vehicle 4+", "anti-monster 3+"]);
        assert_eq!(effects.anti_threshold_for(|cat| cat == "vehicle"), Some(4));
        assert_eq!(effects.anti_threshold_for(|_| true), Some(3));
        assert_eq!(effects.anti_threshold_for(|_| false), None);
    }
}
