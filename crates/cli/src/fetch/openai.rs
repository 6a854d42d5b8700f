//! Content Extractor backed by an OpenAI-compatible chat completions API.
//!
//! Works against OpenAI or OpenRouter; only `base_url` and the model name
//! differ. Both calls request `response_format: json_object`.

use std::collections::HashSet;
use std::time::Duration;

use athos_config::ExtractorConfig;
use athos_recon::{profile_from_json, AgencyProfile};
use serde_json::Value;
use url::Url;

use crate::exit_codes;
use crate::pipeline::ContentExtractor;
use crate::CliError;

use super::common::{status_only, truncate_chars, FetchClient};

/// Homepage text sent to subpage discovery.
const SUBPAGE_SNIPPET_CHARS: usize = 10_000;

const SUBPAGE_SYSTEM_PROMPT: &str = "You are a URL extractor. Return JSON only.";

const EXTRACT_SYSTEM_PROMPT: &str = r#"You extract structured data about a digital agency from its website content (homepage plus About/Team and Partners pages).

Return ONLY a JSON object with these keys:
{
  "name": "Agency name",
  "description": "Short summary, at most 200 characters",
  "website": "Agency URL",
  "partner_page_url": "URL of the partners page, or null",
  "services": ["Services offered"],
  "platforms": ["Commerce platforms supported"],
  "partners": ["Technology partners, e.g. Yotpo, Klaviyo"],
  "clients": [{"name": "Client", "industry": "Industry", "platform": "Platform", "project_summary": "Work done"}],
  "case_studies": [{"title": "Title", "url": "Full URL or null", "results": ["Quantified outcomes"]}],
  "revenue_estimate": "$XM-$YM",
  "awards": [{"name": "Award name", "year": "Year"}],
  "directors": [{"name": "Full name", "role": "Job title", "linkedin_url": "LinkedIn URL or null"}]
}

Rules:
- revenue_estimate: estimate from headcount (about $150k per head) and client tier, as a range.
- directors: people titled Founder, CEO, Director or Head of.
- awards: only specifically named awards.
- platforms: look for Adobe Commerce, BigCommerce, Centra, Custom, Magento, NetSuite, Salesforce Commerce Cloud, SAP Hybris, Shopify, Shopware, WooCommerce and similar."#;

pub struct ChatExtractor {
    client: FetchClient,
    api_key: String,
    base_url: String,
    model: String,
    subpage_model: String,
}

impl ChatExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new(
                "extractor",
                config.timeout_secs,
                config.max_retries,
                extract_openai_error,
            )?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            subpage_model: config.subpage_model.clone(),
        })
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_initial_backoff(backoff);
        self
    }

    /// One chat completion; returns the assistant message parsed as JSON.
    fn complete_json(&self, model: &str, system: &str, user: &str) -> Result<Value, CliError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let payload = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {"type": "json_object"},
        });

        let body = self.client.request_with_retry(|http| {
            http.post(&endpoint).bearer_auth(&self.api_key).json(&payload)
        })?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                extraction_error(format!(
                    "{} response has no message content",
                    self.client.source_name()
                ))
            })?;

        serde_json::from_str(content).map_err(|e| {
            extraction_error(format!(
                "model returned invalid JSON: {} (content: {})",
                e,
                truncate_chars(content, 200),
            ))
        })
    }
}

impl ContentExtractor for ChatExtractor {
    fn find_subpages(&self, home_markdown: &str, base_url: &str) -> Result<Vec<String>, CliError> {
        let prompt = format!(
            "Analyze the markdown links from this homepage and identify the URLs for:\n\
             1. The \"About Us\" or \"Company\" page.\n\
             2. The \"Team\" or \"People\" page (for directors).\n\
             3. The \"Partners\" or \"Technology\" page.\n\n\
             Return a JSON object with keys \"about_url\" and \"partners_url\". \
             Use null when not found. Convert relative paths to absolute URLs using base: {base_url}.\n\n\
             Markdown snippet:\n{}",
            truncate_chars(home_markdown, SUBPAGE_SNIPPET_CHARS),
        );

        let links = self.complete_json(&self.subpage_model, SUBPAGE_SYSTEM_PROMPT, &prompt)?;
        Ok(subpage_urls(&links))
    }

    fn extract(&self, content: &str, website: &str) -> Result<AgencyProfile, CliError> {
        let prompt = format!(
            "Website URL: {website}\n\nExtract data from this consolidated website content:\n\n{content}"
        );
        let raw = self.complete_json(&self.model, EXTRACT_SYSTEM_PROMPT, &prompt)?;

        if let Some(err) = raw.get("error") {
            let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            return Err(extraction_error(format!("extractor reported an error: {msg}")));
        }

        let mut profile = profile_from_json(&raw)?;
        profile.website = website.to_string();
        Ok(profile)
    }
}

/// `about_url` then `partners_url`: absolute http(s) only, no duplicates.
fn subpage_urls(links: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    ["about_url", "partners_url"]
        .iter()
        .filter_map(|key| links.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|candidate| {
            Url::parse(candidate)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
                .unwrap_or(false)
        })
        .filter(|candidate| seen.insert(candidate.to_string()))
        .map(str::to_string)
        .collect()
}

fn extraction_error(msg: String) -> CliError {
    CliError::new(exit_codes::EXIT_EXTRACTION, msg)
}

fn extract_openai_error(body: &Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| status_only(status))
}
