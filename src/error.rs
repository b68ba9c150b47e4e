//! Error types shared by the resolution core and its hosts.

use thiserror::Error;

/// A dice or number expression that could not be turned into a [crate::combat::DiceExpr].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("empty dice expression")]
    Empty,

    #[error("malformed dice expression '{0}'")]
    Malformed(String),

    /// Compound forms such as `D6+D3` parse as text but have no single-die meaning here.
    #[error("unsupported dice expression '{0}'")]
    Unsupported(String),
}

/// A weapon or defender record that cannot be simulated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("{profile}: missing required field '{field}'")]
    MissingField {
        profile: String,
        field: &'static str,
    },

    #[error("{profile}: field '{field}' has non-numeric value '{value}'")]
    InvalidField {
        profile: String,
        field: &'static str,
        value: String,
    },

    #[error("{profile}: field '{field}' must be within {min}..={max}, got {value}")]
    OutOfRange {
        profile: String,
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{profile}: field '{field}': {source}")]
    Dice {
        profile: String,
        field: &'static str,
        #[source]
        source: DiceError,
    },
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse scenario YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("scenario has no {0}")]
    Empty(&'static str),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {name} has invalid value '{value}'")]
    Env { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize report JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
