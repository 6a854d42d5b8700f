// API key resolution
//
// Keys are resolved, in order, from:
// 1. An explicit value (CLI flag)
// 2. ATHOS_<SERVICE>_KEY
// 3. The service's conventional variable(s) (FIRECRAWL_API_KEY, ...)
// 4. System keychain (with the `keychain` feature)
//
// Keys are NEVER stored in config.toml

use std::env;

/// Service name for keychain entries
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "athos";

/// A collaborator that needs an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Crawl,
    Extractor,
    Lookup,
    Store,
}

impl Service {
    pub const ALL: [Service; 4] = [Self::Crawl, Self::Extractor, Self::Lookup, Self::Store];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Extractor => "extractor",
            Self::Lookup => "lookup",
            Self::Store => "store",
        }
    }

    /// Human label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Crawl => "Firecrawl",
            Self::Extractor => "extractor (OpenAI/OpenRouter)",
            Self::Lookup => "Hunter",
            Self::Store => "Supabase",
        }
    }

    /// Environment variables checked for this service, in priority order.
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Crawl => &["ATHOS_CRAWL_KEY", "FIRECRAWL_API_KEY"],
            Self::Extractor => &["ATHOS_EXTRACTOR_KEY", "OPENAI_API_KEY", "OPENROUTER_API_KEY"],
            Self::Lookup => &["ATHOS_LOOKUP_KEY", "HUNTER_API_KEY"],
            Self::Store => &["ATHOS_STORE_KEY", "SUPABASE_SERVICE_ROLE_KEY"],
        }
    }
}

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Environment(&'static str),
    Keychain,
    None,
}

impl KeySource {
    pub fn describe(&self) -> String {
        match self {
            KeySource::Flag => "flag".to_string(),
            KeySource::Environment(var) => format!("env:{var}"),
            KeySource::Keychain => "keychain".to_string(),
            KeySource::None => "none".to_string(),
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

impl KeyLookup {
    fn none() -> Self {
        Self {
            key: None,
            source: KeySource::None,
        }
    }
}

/// Get an API key for `service` from the process environment (and keychain).
pub fn get_api_key(service: Service, flag: Option<&str>) -> KeyLookup {
    let found = lookup_with(service, flag, |var| env::var(var).ok());
    if found.key.is_some() {
        return found;
    }
    keychain_lookup(service).unwrap_or_else(KeyLookup::none)
}

/// Flag and environment resolution against an arbitrary variable source.
pub fn lookup_with(
    service: Service,
    flag: Option<&str>,
    env_source: impl Fn(&str) -> Option<String>,
) -> KeyLookup {
    if let Some(value) = flag.map(str::trim).filter(|v| !v.is_empty()) {
        return KeyLookup {
            key: Some(value.to_string()),
            source: KeySource::Flag,
        };
    }

    for var in service.env_vars() {
        if let Some(value) = env_source(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return KeyLookup {
                    key: Some(trimmed.to_string()),
                    source: KeySource::Environment(var),
                };
            }
        }
    }

    KeyLookup::none()
}

#[cfg(feature = "keychain")]
fn keychain_lookup(service: Service) -> Option<KeyLookup> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, service.as_str()).ok()?;
    let key = entry.get_password().ok()?;
    Some(KeyLookup {
        key: Some(key),
        source: KeySource::Keychain,
    })
}

#[cfg(not(feature = "keychain"))]
fn keychain_lookup(_service: Service) -> Option<KeyLookup> {
    None
}
