use std::fmt;

use athos_config::ConfigError;
use athos_recon::ReconError;

use crate::exit_codes::{
    EXIT_EXTRACTION, EXIT_FETCH_NOT_AUTH, EXIT_IO, EXIT_PARSE, EXIT_USAGE,
};

/// Every command returns this. `code` is the process exit code.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(EXIT_PARSE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Parse(_) => CliError::parse(err.to_string())
                .with_hint(format!("check {}", athos_config::Settings::config_path().display())),
            ConfigError::Validation(_) => CliError::args(err.to_string()),
            ConfigError::Io(_) => CliError::io(err.to_string()),
            ConfigError::MissingKey { ref hint, .. } => {
                let hint = hint.clone();
                CliError::new(EXIT_FETCH_NOT_AUTH, err.to_string()).with_hint(hint)
            }
            ConfigError::Missing(_) => CliError::args(err.to_string()),
        }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        CliError::new(EXIT_EXTRACTION, err.to_string())
    }
}
