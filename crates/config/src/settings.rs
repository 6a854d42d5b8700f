// Pipeline settings
// Loaded from ~/.config/athos/config.toml (or --config). API keys never live here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Crawl (Page Fetcher) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub base_url: String,
    pub only_main_content: bool,
    /// Subpages fetched after the homepage (About/Team, Partners).
    pub max_subpages: usize,
    /// Consolidated page text is cut to this many characters before extraction.
    pub max_content_chars: usize,
    /// Politeness delay between subpage fetches.
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.firecrawl.dev".to_string(),
            only_main_content: true,
            max_subpages: 2,
            max_content_chars: 40_000,
            page_delay_ms: 1_000,
            timeout_secs: 60,
        }
    }
}

/// Content Extractor settings (any OpenAI-compatible chat completions API).
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub base_url: String,
    pub model: String,
    /// Model used for subpage discovery. Empty = same as `model`.
    pub subpage_model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            subpage_model: String::new(),
            timeout_secs: 45,
        }
    }
}

impl ExtractorSettings {
    pub fn effective_subpage_model(&self) -> &str {
        if self.subpage_model.is_empty() {
            &self.model
        } else {
            &self.subpage_model
        }
    }
}

/// Contact Lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub enabled: bool,
    pub base_url: String,
    pub limit: u32,
    pub timeout_secs: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.hunter.io".to_string(),
            limit: 10,
            timeout_secs: 10,
        }
    }
}

/// Persistence Sink settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Project URL. Empty = take `SUPABASE_URL` from the environment.
    pub url: String,
    pub table: String,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            table: "agencies".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Profiles analyzed longer ago than this are re-analyzed.
    pub stale_days: u32,
    /// Delay between organizations in batch mode.
    pub org_delay_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            stale_days: 30,
            org_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crawl: CrawlSettings,
    pub extractor: ExtractorSettings,
    pub lookup: LookupSettings,
    pub store: StoreSettings,
    pub refresh: RefreshSettings,
    pub http: HttpSettings,
}

impl Settings {
    /// Default settings file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athos")
            .join("config.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path`, or from [`Settings::config_path`] when `None`.
    ///
    /// A missing default file yields defaults. A missing explicit file is an
    /// error, as is a file that fails to parse or validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::Io(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("crawl.base_url", &self.crawl.base_url),
            ("extractor.base_url", &self.extractor.base_url),
            ("extractor.model", &self.extractor.model),
            ("lookup.base_url", &self.lookup.base_url),
            ("store.table", &self.store.table),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{field} must not be empty")));
            }
        }

        if self.crawl.max_subpages > 10 {
            return Err(ConfigError::Validation(format!(
                "crawl.max_subpages must be at most 10, got {}",
                self.crawl.max_subpages
            )));
        }
        if self.crawl.max_content_chars == 0 {
            return Err(ConfigError::Validation(
                "crawl.max_content_chars must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.lookup.limit) {
            return Err(ConfigError::Validation(format!(
                "lookup.limit must be between 1 and 100, got {}",
                self.lookup.limit
            )));
        }
        if self.refresh.stale_days == 0 {
            return Err(ConfigError::Validation(
                "refresh.stale_days must be positive".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
