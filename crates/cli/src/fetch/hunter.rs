//! Contact Lookup backed by Hunter's domain search.

use std::time::Duration;

use athos_config::LookupConfig;
use athos_recon::Contact;
use serde_json::Value;

use crate::exit_codes;
use crate::pipeline::ContactLookup;
use crate::CliError;

use super::common::{status_only, FetchClient};

/// Role given to contacts whose position Hunter does not know.
const DEFAULT_ROLE: &str = "Employee";

pub struct HunterClient {
    client: FetchClient,
    api_key: String,
    base_url: String,
    limit: u32,
}

impl HunterClient {
    pub fn new(config: &LookupConfig) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new(
                "Hunter",
                config.timeout_secs,
                config.max_retries,
                extract_hunter_error,
            )?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            limit: config.limit,
        })
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_initial_backoff(backoff);
        self
    }
}

impl ContactLookup for HunterClient {
    fn lookup(&self, domain: &str) -> Result<Vec<Contact>, CliError> {
        let url = format!("{}/v2/domain-search", self.base_url);
        let limit = self.limit.to_string();
        let params = [
            ("domain", domain),
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
        ];

        let body = self
            .client
            .request_with_retry(|http| http.get(&url).query(&params))?;

        let emails = body["data"]["emails"].as_array().ok_or_else(|| {
            CliError::new(
                exit_codes::EXIT_FETCH_UPSTREAM,
                "Hunter response missing 'data.emails' array",
            )
        })?;

        let contacts: Vec<Contact> = emails.iter().filter_map(contact_from_email).collect();
        tracing::debug!(domain, returned = emails.len(), named = contacts.len(), "lookup done");
        Ok(contacts)
    }
}

/// Only entries with both a first and last name become contacts.
fn contact_from_email(entry: &Value) -> Option<Contact> {
    let first = non_blank(&entry["first_name"])?;
    let last = non_blank(&entry["last_name"])?;
    let role = non_blank(&entry["position"]).unwrap_or(DEFAULT_ROLE);

    Some(Contact {
        name: format!("{first} {last}"),
        role: Some(role.to_string()),
        email: non_blank(&entry["value"]).map(str::to_string),
        linkedin_url: non_blank(&entry["linkedin"]).map(str::to_string),
    })
}

fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn extract_hunter_error(body: &Value, status: u16) -> String {
    body["errors"][0]["details"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status_only(status))
}
