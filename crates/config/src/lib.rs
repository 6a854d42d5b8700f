//! Athos configuration
//!
//! Settings come from a TOML file; API keys come from flags, the
//! environment, or (with the `keychain` feature) the system keychain.
//! [`ResolvedConfig`] combines both once at startup.

pub mod error;
pub mod resolved;
pub mod secrets;
pub mod settings;

pub use error::ConfigError;
pub use resolved::{
    CrawlConfig, ExtractorConfig, KeyOverrides, LookupConfig, ResolvedConfig, StoreConfig,
    UrlSource,
};
pub use secrets::{get_api_key, KeyLookup, KeySource, Service};
pub use settings::{Settings, OPENAI_BASE_URL, OPENROUTER_BASE_URL};
