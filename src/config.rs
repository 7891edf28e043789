// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for semanticrd

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SemanticError};

/// Path value that stands for stdin or stdout
pub const STDIO_PATH: &str = "-";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input documents to rewrite
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Semantic rules to apply
    #[serde(default = "default_semantics")]
    pub semantics: PathBuf,

    /// Where rewritten documents are written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: default_input(),
            semantics: default_semantics(),
            output: default_output(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SemanticError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("input", &self.input),
            ("semantics", &self.semantics),
            ("output", &self.output),
        ] {
            if path.as_os_str().is_empty() {
                return Err(SemanticError::InvalidConfig {
                    message: format!("{} path cannot be empty", name),
                });
            }
        }

        if self.output != Path::new(STDIO_PATH) && self.output == self.input {
            return Err(SemanticError::InvalidConfig {
                message: format!(
                    "output would overwrite input {}",
                    self.input.display()
                ),
            });
        }

        if self.semantics == Path::new(STDIO_PATH) {
            return Err(SemanticError::InvalidConfig {
                message: "semantics cannot be read from stdin".to_string(),
            });
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(SemanticError::InvalidConfig {
                message: format!("unknown log level '{}'", self.logging.level),
            });
        }

        Ok(())
    }

    /// Override file locations; `None` keeps the configured value
    pub fn with_paths(
        mut self,
        input: Option<PathBuf>,
        semantics: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Self {
        if let Some(input) = input {
            self.input = input;
        }
        if let Some(semantics) = semantics {
            self.semantics = semantics;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }
}

// Default value functions

fn default_input() -> PathBuf {
    PathBuf::from("crds.yaml")
}

fn default_semantics() -> PathBuf {
    PathBuf::from("semantics.yaml")
}

fn default_output() -> PathBuf {
    PathBuf::from("crds-processes.yaml")
}

fn default_log_level() -> String {
    "warn".to_string()
}
