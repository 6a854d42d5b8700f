//! Page Fetcher backed by the Firecrawl v0 scrape endpoint.

use std::time::Duration;

use athos_config::CrawlConfig;

use crate::exit_codes;
use crate::pipeline::{Page, PageFetcher};
use crate::CliError;

use super::common::{status_only, FetchClient};

pub struct FirecrawlClient {
    client: FetchClient,
    api_key: String,
    base_url: String,
    only_main_content: bool,
}

impl FirecrawlClient {
    pub fn new(config: &CrawlConfig) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new(
                "Firecrawl",
                config.timeout_secs,
                config.max_retries,
                extract_firecrawl_error,
            )?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            only_main_content: config.only_main_content,
        })
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_initial_backoff(backoff);
        self
    }
}

impl PageFetcher for FirecrawlClient {
    fn fetch_page(&self, url: &str) -> Result<Page, CliError> {
        let endpoint = format!("{}/v0/scrape", self.base_url);
        let payload = serde_json::json!({
            "url": url,
            "pageOptions": { "onlyMainContent": self.only_main_content },
        });

        let body = self.client.request_with_retry(|http| {
            http.post(&endpoint).bearer_auth(&self.api_key).json(&payload)
        })?;

        if !body["success"].as_bool().unwrap_or(false) {
            let reason = body["error"].as_str().unwrap_or("success=false");
            return Err(CliError::new(
                exit_codes::EXIT_PAGE_FETCH,
                format!("Firecrawl could not scrape {url}: {reason}"),
            ));
        }

        let markdown = body["data"]["markdown"].as_str().ok_or_else(|| {
            CliError::new(
                exit_codes::EXIT_PAGE_FETCH,
                format!("Firecrawl response for {url} has no markdown"),
            )
        })?;

        tracing::debug!(url, chars = markdown.len(), "page fetched");
        Ok(Page {
            url: url.to_string(),
            markdown: markdown.to_string(),
        })
    }
}

fn extract_firecrawl_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status_only(status))
}
