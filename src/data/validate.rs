use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::combat::{unrecognized_keywords, DefenderProfile, WeaponProfile};
use crate::data::scenario::{attacker_name, defender_name, weapon_name, Scenario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }

    /// Diagnostics ordered errors first, keeping file order within a severity.
    pub fn sorted(&self) -> Vec<&ValidationDiagnostic> {
        let mut sorted: Vec<_> = self.diagnostics.iter().collect();
        sorted.sort_by_key(|diag| diag.severity);
        sorted
    }
}

/// Checks a scenario without running it. Profile errors that would abort a
/// run are errors; suspicious but runnable values are warnings; keywords the
/// resolver ignores are info.
pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let mut report = ValidationReport::default();

    if scenario.attackers.is_empty() {
        report.push(ValidationSeverity::Error, "scenario", "no attackers");
    }
    if scenario.defenders.is_empty() {
        report.push(ValidationSeverity::Error, "scenario", "no defenders");
    }

    for (index, attacker) in scenario.attackers.iter().enumerate() {
        let attacker_label = attacker_name(attacker, index);
        if attacker.weapons.is_empty() {
            report.push(ValidationSeverity::Warning, &attacker_label, "attacker has no weapons");
        }

        let mut seen_names = HashSet::new();
        for (w, input) in attacker.weapons.iter().enumerate() {
            let name = weapon_name(input, w);
            let context = format!("{attacker_label} / {name}");
            if !seen_names.insert(name.to_lowercase()) {
                report.push(
                    ValidationSeverity::Warning,
                    &context,
                    "duplicate weapon name; results get a #n suffix",
                );
            }
            for tag in unrecognized_keywords(&input.keywords) {
                report.push(
                    ValidationSeverity::Info,
                    &context,
                    format!("keyword '{tag}' has no effect"),
                );
            }
            match WeaponProfile::from_input(input, &name) {
                Ok(weapon) => check_weapon(&mut report, &context, &weapon),
                Err(err) => report.push(ValidationSeverity::Error, &context, err.to_string()),
            }
        }
    }

    for (index, input) in scenario.defenders.iter().enumerate() {
        let name = defender_name(input, index);
        match DefenderProfile::from_input(input, &name) {
            Ok(defender) => check_defender(&mut report, &name, &defender),
            Err(err) => report.push(ValidationSeverity::Error, &name, err.to_string()),
        }
    }

    report
}

fn check_weapon(report: &mut ValidationReport, context: &str, weapon: &WeaponProfile) {
    if !weapon.effects.torrent && !(2..=6).contains(&weapon.to_hit) {
        report.push(
            ValidationSeverity::Warning,
            context,
            format!("to_hit {} is outside 2-6", weapon.to_hit),
        );
    }
    if weapon.amount == 0 {
        report.push(ValidationSeverity::Warning, context, "amount is 0; weapon never attacks");
    }
    if weapon.attacks.is_constant() && weapon.attacks.modifier == 0 {
        report.push(ValidationSeverity::Warning, context, "attacks is 0");
    }
}

fn check_defender(report: &mut ValidationReport, context: &str, defender: &DefenderProfile) {
    if !(2..=7).contains(&defender.save) {
        report.push(
            ValidationSeverity::Warning,
            context,
            format!("save {} is outside 2-7", defender.save),
        );
    }
    if let Some(invulnerable) = defender.invulnerable {
        if invulnerable >= defender.save {
            report.push(
                ValidationSeverity::Info,
                context,
                format!("invulnerable {invulnerable}+ never beats armour {}+", defender.save),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scenario::parse_scenario;

    fn report_for(raw: &str) -> ValidationReport {
        validate_scenario(&parse_scenario(raw, false).unwrap())
    }

    #[test]
    fn clean_scenario_has_no_errors_or_warnings() {
        let report = report_for(
            r#"
attackers:
  - name: A
    weapons:
      - { name: gun, attacks: 2, to_hit: 3, strength: 4, ap: 1, damage: 1, keywords: [lethal hits] }
defenders:
  - { name: D, toughness: 4, wounds: 2, models: 5, save: 3 }
"#,
        );
        assert!(!report.has_errors());
        assert_eq!(report.count(ValidationSeverity::Warning), 0);
        assert_eq!(report.count(ValidationSeverity::Info), 0);
    }

    #[test]
    fn flags_skill_range_duplicates_unknown_keywords_and_zero_models() {
        let report = report_for(
            r#"
attackers:
  - name: A
    weapons:
      - { name: gun, attacks: 2, to_hit: 7, strength: 4, damage: 1, keywords: [pistol] }
      - { name: Gun, attacks: 2, to_hit: 3, strength: 4, damage: 1 }
defenders:
  - { name: D, toughness: 4, wounds: 2, models: 0, save: 3 }
"#,
        );
        assert!(report.has_errors());
        let messages: Vec<String> = report.diagnostics.iter().map(|d| d.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("outside 2-6")));
        assert!(messages.iter().any(|m| m.contains("duplicate weapon name")));
        assert!(messages.iter().any(|m| m.contains("'pistol'")));
        assert!(messages.iter().any(|m| m.contains("models")));
        assert_eq!(report.sorted()[0].severity, ValidationSeverity::Error);
    }

    #[test]
    fn torrent_weapon_skips_skill_check() {
        let report = report_for(
            r#"
attackers:
  - weapons:
      - { name: flamer, attacks: D6, to_hit: "N/A", strength: 4, damage: 1, keywords: [torrent] }
defenders:
  - { toughness: 3, wounds: 1, models: 10, save: 5 }
"#,
        );
        assert!(!report.has_errors());
        assert_eq!(report.count(ValidationSeverity::Warning), 0);
    }

    #[test]
    fn empty_scenario_reports_both_sections() {
        let report = validate_scenario(&Scenario::default());
        assert_eq!(report.count(ValidationSeverity::Error), 2);
    }
}
