// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for semanticrd

use thiserror::Error;

/// Result type alias for semanticrd operations
pub type Result<T> = std::result::Result<T, SemanticError>;

/// Errors that can occur while loading rules or rewriting documents
#[derive(Error, Debug)]
pub enum SemanticError {
    /// Malformed rule file or input document
    #[error("Failed to parse {source_name}: {message}")]
    ParseError { source_name: String, message: String },

    /// A required field is absent or has the wrong type
    #[error("Missing field '{field}': {message}")]
    MissingField { field: String, message: String },

    /// A write would descend through a value that is not a map
    #[error("Cannot write '{path}': '{conflict}' exists and is not a map")]
    WriteConflict { path: String, conflict: String },

    /// A path with no segments was used for a write
    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    /// Rule tag the engine does not know about
    #[error("Unsupported rule type: {rule_type}")]
    UnsupportedRuleType { rule_type: String },

    /// Rule with a known tag but an unusable body
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// A rule failed while being applied to one schema version
    #[error("Failed to apply rule '{rule}' to version '{version}': {source}")]
    RuleFailed {
        rule: String,
        version: String,
        #[source]
        source: Box<SemanticError>,
    },

    /// Rule file not found
    #[error("Semantic rules file not found: {path}")]
    RulesNotFound { path: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML encoding error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SemanticError {
    /// Build a parse error for the named input
    pub fn parse(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ParseError {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}
