// ============================================================================
// Resolved configuration (single source of truth)
// ============================================================================
//
// Settings file + key sources are combined once at startup. Each adapter is
// constructed from its own config struct below and never reads the
// environment itself.

use std::env;

use crate::error::ConfigError;
use crate::secrets::{get_api_key, lookup_with, KeyLookup, KeySource, Service};
use crate::settings::{Settings, OPENAI_BASE_URL, OPENROUTER_BASE_URL};

/// Explicit keys from the command line. `None` = not given.
#[derive(Debug, Clone, Default)]
pub struct KeyOverrides {
    pub crawl: Option<String>,
    pub extractor: Option<String>,
    pub lookup: Option<String>,
    pub store: Option<String>,
}

impl KeyOverrides {
    fn get(&self, service: Service) -> Option<&str> {
        match service {
            Service::Crawl => self.crawl.as_deref(),
            Service::Extractor => self.extractor.as_deref(),
            Service::Lookup => self.lookup.as_deref(),
            Service::Store => self.store.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub base_url: String,
    pub api_key: String,
    pub only_main_content: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub subpage_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub base_url: String,
    pub api_key: String,
    pub limit: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Where the store URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    File,
    Environment,
    None,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub settings: Settings,
    crawl_key: KeyLookup,
    extractor_key: KeyLookup,
    lookup_key: KeyLookup,
    store_key: KeyLookup,
    store_url: Option<String>,
    store_url_source: UrlSource,
}

impl ResolvedConfig {
    /// Resolve against the process environment (and keychain, if enabled).
    pub fn resolve(settings: Settings, overrides: &KeyOverrides) -> Self {
        let key = |service| get_api_key(service, overrides.get(service));
        let crawl_key = key(Service::Crawl);
        let extractor_key = key(Service::Extractor);
        let lookup_key = key(Service::Lookup);
        let store_key = key(Service::Store);
        let env_url = env::var("SUPABASE_URL").ok();
        Self::assemble(settings, [crawl_key, extractor_key, lookup_key, store_key], env_url)
    }

    /// Resolve against an arbitrary variable source (no keychain).
    pub fn resolve_with(
        settings: Settings,
        overrides: &KeyOverrides,
        env_source: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let keys = Service::ALL.map(|s| lookup_with(s, overrides.get(s), &env_source));
        let env_url = env_source("SUPABASE_URL");
        Self::assemble(settings, keys, env_url)
    }

    fn assemble(settings: Settings, keys: [KeyLookup; 4], env_url: Option<String>) -> Self {
        let [crawl_key, extractor_key, lookup_key, store_key] = keys;

        let file_url = settings.store.url.trim().to_string();
        let env_url = env_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        let (store_url, store_url_source) = if !file_url.is_empty() {
            (Some(file_url), UrlSource::File)
        } else if let Some(url) = env_url {
            (Some(url), UrlSource::Environment)
        } else {
            (None, UrlSource::None)
        };

        Self {
            settings,
            crawl_key,
            extractor_key,
            lookup_key,
            store_key,
            store_url,
            store_url_source,
        }
    }

    pub fn key_lookup(&self, service: Service) -> &KeyLookup {
        match service {
            Service::Crawl => &self.crawl_key,
            Service::Extractor => &self.extractor_key,
            Service::Lookup => &self.lookup_key,
            Service::Store => &self.store_key,
        }
    }

    pub fn key_source(&self, service: Service) -> KeySource {
        self.key_lookup(service).source
    }

    pub fn store_url_source(&self) -> UrlSource {
        self.store_url_source
    }

    fn require_key(&self, service: Service) -> Result<String, ConfigError> {
        self.key_lookup(service)
            .key
            .clone()
            .ok_or_else(|| ConfigError::MissingKey {
                service: service.label(),
                hint: format!("export {}=<key>", service.env_vars()[0]),
            })
    }

    pub fn crawl(&self) -> Result<CrawlConfig, ConfigError> {
        let s = &self.settings.crawl;
        Ok(CrawlConfig {
            base_url: trim_base(&s.base_url),
            api_key: self.require_key(Service::Crawl)?,
            only_main_content: s.only_main_content,
            timeout_secs: s.timeout_secs,
            max_retries: self.settings.http.max_retries,
        })
    }

    /// Configured extractor endpoint. A key taken from `OPENROUTER_API_KEY`
    /// moves the untouched OpenAI default over to OpenRouter.
    pub fn extractor_base_url(&self) -> String {
        let configured = trim_base(&self.settings.extractor.base_url);
        let openrouter_key =
            self.extractor_key.source == KeySource::Environment("OPENROUTER_API_KEY");
        if openrouter_key && configured == OPENAI_BASE_URL {
            OPENROUTER_BASE_URL.to_string()
        } else {
            configured
        }
    }

    pub fn extractor(&self) -> Result<ExtractorConfig, ConfigError> {
        let s = &self.settings.extractor;
        Ok(ExtractorConfig {
            base_url: self.extractor_base_url(),
            api_key: self.require_key(Service::Extractor)?,
            model: s.model.clone(),
            subpage_model: s.effective_subpage_model().to_string(),
            timeout_secs: s.timeout_secs,
            max_retries: self.settings.http.max_retries,
        })
    }

    /// `Ok(None)` when lookup is disabled in settings.
    pub fn lookup(&self) -> Result<Option<LookupConfig>, ConfigError> {
        let s = &self.settings.lookup;
        if !s.enabled {
            return Ok(None);
        }
        Ok(Some(LookupConfig {
            base_url: trim_base(&s.base_url),
            api_key: self.require_key(Service::Lookup)?,
            limit: s.limit,
            timeout_secs: s.timeout_secs,
            max_retries: self.settings.http.max_retries,
        }))
    }

    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        let s = &self.settings.store;
        let url = self.store_url.clone().ok_or_else(|| {
            ConfigError::Missing(
                "missing store URL (set store.url in config.toml or SUPABASE_URL)".into(),
            )
        })?;
        Ok(StoreConfig {
            url: trim_base(&url),
            api_key: self.require_key(Service::Store)?,
            table: s.table.clone(),
            timeout_secs: s.timeout_secs,
            max_retries: self.settings.http.max_retries,
        })
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
