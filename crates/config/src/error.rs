use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// A value is present but out of range or empty.
    Validation(String),
    /// Config file could not be read.
    Io(String),
    /// A service needs a key that no source provided.
    MissingKey { service: &'static str, hint: String },
    /// A service needs a setting that no source provided.
    Missing(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
            Self::MissingKey { service, .. } => write!(f, "missing {service} API key"),
            Self::Missing(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
