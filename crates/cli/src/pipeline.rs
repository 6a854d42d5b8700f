//! Scrape → extract → enrich → store, for one organization.
//!
//! The collaborators are traits so the orchestration can run against the
//! HTTP adapters in `fetch` or against in-memory fakes.
//!
//! # Failure policy
//!
//! | Stage              | On failure                                          |
//! |--------------------|-----------------------------------------------------|
//! | homepage fetch     | abort with the fetch error                          |
//! | subpage discovery  | warn, continue with the homepage only               |
//! | subpage fetch      | warn, record in `failed_pages`, leave content out   |
//! | extraction         | abort                                               |
//! | contact lookup     | warn, keep the extractor's roster, `failed`         |
//! | store              | abort with the sink error                           |

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use athos_config::Settings;
use athos_recon::{reconcile_with_summary, AgencyProfile, Contact, ReconcileSummary};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn};
use url::Url;

use crate::fetch::truncate_chars;
use crate::CliError;

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Text content of one crawled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub markdown: String,
}

pub trait PageFetcher {
    /// Never returns empty content in place of an error.
    fn fetch_page(&self, url: &str) -> Result<Page, CliError>;
}

pub trait ContentExtractor {
    /// About/Team and Partners URLs linked from the homepage, absolute, in
    /// order, without duplicates.
    fn find_subpages(&self, home_markdown: &str, base_url: &str) -> Result<Vec<String>, CliError>;

    /// Organization profile plus the primary contact roster (`directors`).
    fn extract(&self, content: &str, website: &str) -> Result<AgencyProfile, CliError>;
}

pub trait ContactLookup {
    fn lookup(&self, domain: &str) -> Result<Vec<Contact>, CliError>;
}

pub trait PersistenceSink {
    fn upsert(&self, profile: &AgencyProfile) -> Result<(), CliError>;

    /// Stored websites; only those analyzed before `stale_before` if given.
    fn list_websites(&self, stale_before: Option<DateTime<Utc>>) -> Result<Vec<String>, CliError>;
}

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_subpages: usize,
    pub max_content_chars: usize,
    /// Pause between consecutive subpage fetches. There is no pause after
    /// the homepage or after the last subpage, so a single subpage costs no
    /// delay at all and extraction starts right after the final fetch.
    pub page_delay: Duration,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_subpages: settings.crawl.max_subpages,
            max_content_chars: settings.crawl.max_content_chars,
            page_delay: Duration::from_millis(settings.crawl.page_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Homepage first, then the subpages whose content was included.
    pub crawled_pages: Vec<String>,
    pub failed_pages: Vec<FailedPage>,
    /// Characters sent to the extractor.
    pub content_chars: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Applied,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    pub status: EnrichmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReconcileSummary>,
}

impl EnrichmentReport {
    fn skipped(domain: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            status: EnrichmentStatus::Skipped,
            domain,
            reason: Some(reason.into()),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub url: String,
    pub stored: bool,
    pub crawl: CrawlReport,
    pub enrichment: EnrichmentReport,
    pub profile: AgencyProfile,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a> {
    fetcher: &'a dyn PageFetcher,
    extractor: &'a dyn ContentExtractor,
    lookup: Option<&'a dyn ContactLookup>,
    lookup_skip_reason: String,
    sink: Option<&'a dyn PersistenceSink>,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    /// Without a lookup or sink: enrichment is skipped and nothing is stored.
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        extractor: &'a dyn ContentExtractor,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            lookup: None,
            lookup_skip_reason: "contact lookup not configured".to_string(),
            sink: None,
            options,
        }
    }

    pub fn with_lookup(mut self, lookup: &'a dyn ContactLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Record why enrichment will not run (reported per organization).
    pub fn without_lookup(mut self, reason: impl Into<String>) -> Self {
        self.lookup = None;
        self.lookup_skip_reason = reason.into();
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn PersistenceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn run(&self, start_url: &str) -> Result<AnalysisReport, CliError> {
        let span = info_span!("analyze", url = %start_url);
        let _guard = span.enter();

        info!(stage = "crawl", "fetching homepage");
        let home = self.fetcher.fetch_page(start_url)?;

        let mut content = format!("--- SOURCE: HOMEPAGE ({start_url}) ---\n{}\n", home.markdown);
        let mut crawled_pages = vec![start_url.to_string()];
        let mut failed_pages = Vec::new();

        for (i, url) in self.discover_subpages(&home, start_url).iter().enumerate() {
            if i > 0 && !self.options.page_delay.is_zero() {
                thread::sleep(self.options.page_delay);
            }
            info!(stage = "crawl", subpage = %url, "fetching subpage");
            match self.fetcher.fetch_page(url) {
                Ok(page) => {
                    content.push_str(&format!(
                        "\n\n--- SOURCE: SUBPAGE ({url}) ---\n{}\n",
                        page.markdown
                    ));
                    crawled_pages.push(url.clone());
                }
                Err(e) => {
                    warn!(stage = "crawl", subpage = %url, error = %e, "subpage fetch failed");
                    failed_pages.push(FailedPage {
                        url: url.clone(),
                        error: e.message,
                    });
                }
            }
        }

        let total_chars = content.chars().count();
        let content = truncate_chars(&content, self.options.max_content_chars);
        let crawl = CrawlReport {
            crawled_pages,
            failed_pages,
            content_chars: total_chars.min(self.options.max_content_chars),
            truncated: total_chars > self.options.max_content_chars,
        };

        info!(
            stage = "extract",
            pages = crawl.crawled_pages.len(),
            chars = crawl.content_chars,
            truncated = crawl.truncated,
            "extracting profile",
        );
        let mut profile = self.extractor.extract(content, start_url)?;
        profile.website = start_url.to_string();
        profile.last_analyzed = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        let enrichment = self.enrich(&mut profile, start_url);

        let stored = match self.sink {
            Some(sink) => {
                sink.upsert(&profile)?;
                info!(stage = "store", directors = profile.directors.len(), "profile stored");
                true
            }
            None => {
                info!(stage = "store", "dry run, not stored");
                false
            }
        };

        Ok(AnalysisReport {
            url: start_url.to_string(),
            stored,
            crawl,
            enrichment,
            profile,
        })
    }

    fn discover_subpages(&self, home: &Page, start_url: &str) -> Vec<String> {
        if self.options.max_subpages == 0 {
            return Vec::new();
        }

        let candidates = match self.extractor.find_subpages(&home.markdown, start_url) {
            Ok(urls) => urls,
            Err(e) => {
                warn!(stage = "discover", error = %e, "subpage discovery failed, homepage only");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        seen.insert(page_key(start_url));
        candidates
            .into_iter()
            .filter(|url| seen.insert(page_key(url)))
            .take(self.options.max_subpages)
            .collect()
    }

    /// Reconcile the extractor's roster with the lookup's candidates.
    /// The reconciler only runs when the lookup actually answered.
    fn enrich(&self, profile: &mut AgencyProfile, start_url: &str) -> EnrichmentReport {
        let domain = domain_for_lookup(start_url);

        let Some(lookup) = self.lookup else {
            info!(stage = "enrich", reason = %self.lookup_skip_reason, "enrichment skipped");
            return EnrichmentReport::skipped(domain, self.lookup_skip_reason.clone());
        };
        let Some(domain) = domain else {
            warn!(stage = "enrich", "no domain in url, enrichment skipped");
            return EnrichmentReport::skipped(None, "no domain in url");
        };

        match lookup.lookup(&domain) {
            Ok(candidates) => {
                let reconciled = reconcile_with_summary(&profile.directors, &candidates);
                let summary = reconciled.summary;
                info!(
                    stage = "enrich",
                    domain = %domain,
                    candidates = summary.secondary_in,
                    matched = summary.matched,
                    fields_filled = summary.fields_filled,
                    appended = summary.appended,
                    "roster reconciled",
                );
                profile.directors = reconciled.contacts;
                EnrichmentReport {
                    status: EnrichmentStatus::Applied,
                    domain: Some(domain),
                    reason: None,
                    summary: Some(summary),
                }
            }
            Err(e) => {
                warn!(stage = "enrich", domain = %domain, error = %e, "contact lookup failed");
                EnrichmentReport {
                    status: EnrichmentStatus::Failed,
                    domain: Some(domain),
                    reason: Some(e.message),
                    summary: None,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Accept `velstar.co.uk` as well as full URLs; scheme defaults to https.
pub fn normalize_start_url(input: &str) -> Result<String, CliError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CliError::args("empty URL"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(candidate),
        Ok(_) => Err(CliError::args(format!("URL has no host: {input:?}"))),
        Err(e) => Err(CliError::args(format!("invalid URL {input:?}: {e}"))),
    }
}

/// Domain handed to the contact lookup: host, without `www.`, lowercased.
/// Inputs without a scheme are treated as a bare host (plus optional path).
pub fn domain_for_lookup(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let host = match Url::parse(trimmed) {
        Ok(url) if url.host_str().is_some() => url.host_str().map(str::to_string),
        _ => trimmed
            .split(['/', '?', '#'])
            .next()
            .and_then(|h| h.split(':').next())
            .map(str::to_string),
    }?;

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Pages compare equal ignoring a trailing slash and ASCII case.
fn page_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
