pub mod scenario;
pub mod validate;

pub use scenario::{
    load_scenario, parse_scenario, Attacker, AttackerInput, ResolvedScenario, Scenario,
    DEFAULT_SCENARIO_PATH,
};
pub use validate::{validate_scenario, ValidationDiagnostic, ValidationReport, ValidationSeverity};
