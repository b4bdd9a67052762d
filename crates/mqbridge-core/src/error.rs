//! Error types for mqbridge-core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for mqbridge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mqbridge-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Configuration file is not valid JSON/YAML for the config schema
    #[error("failed to parse configuration {path}: {message}")]
    ConfigParse {
        /// Path of the configuration file
        path: String,
        /// Parser message
        message: String,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A rule failed validation
    #[error("invalid rule '{rule_id}': {field}: {message}")]
    RuleValidation {
        /// Id of the rule (may be empty when the id itself is missing)
        rule_id: String,
        /// Field that failed
        field: RuleField,
        /// Description of the failure
        message: String,
    },

    /// A rule file could not be read or parsed, or held an invalid rule
    #[error("rule file {}: {source}", file.display())]
    RuleFile {
        /// Path of the rule file
        file: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A rule file is not valid JSON for the rule schema
    #[error("failed to parse rule: {0}")]
    RuleParse(#[from] serde_json::Error),

    /// Two rules share an id
    #[error("duplicate rule id '{rule_id}' in {} (first defined in {})", file.display(), first.display())]
    DuplicateRule {
        /// The repeated id
        rule_id: String,
        /// File that defined it first
        first: PathBuf,
        /// File that repeated it
        file: PathBuf,
    },

    /// The rules directory could not be listed
    #[error("failed to read rules directory {}: {source}", path.display())]
    RulesDirectory {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The rule field a validation failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    /// `id`
    Id,
    /// `api.method`
    Method,
    /// `api.path`
    Path,
    /// `transform.template`
    Template,
    /// `target.topic`
    Topic,
    /// `target.qos`
    Qos,
}

impl RuleField {
    /// Dotted field name as written in rule files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Method => "api.method",
            Self::Path => "api.path",
            Self::Template => "transform.template",
            Self::Topic => "target.topic",
            Self::Qos => "target.qos",
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// The validation failure behind this error, looking through file context
    pub fn rule_validation(&self) -> Option<(&str, RuleField, &str)> {
        match self {
            Self::RuleValidation {
                rule_id,
                field,
                message,
            } => Some((rule_id, *field, message)),
            Self::RuleFile { source, .. } => source.rule_validation(),
            _ => None,
        }
    }
}
