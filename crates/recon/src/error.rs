use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// Input JSON did not have the expected shape.
    Malformed(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed record: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
