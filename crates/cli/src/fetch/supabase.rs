//! Persistence Sink backed by Supabase's PostgREST interface.

use std::time::Duration;

use athos_config::StoreConfig;
use athos_recon::AgencyProfile;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::exit_codes;
use crate::pipeline::PersistenceSink;
use crate::CliError;

use super::common::{status_only, FetchClient};

pub struct SupabaseStore {
    client: FetchClient,
    api_key: String,
    table_url: String,
}

impl SupabaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new(
                "Supabase",
                config.timeout_secs,
                config.max_retries,
                extract_postgrest_error,
            )?,
            api_key: config.api_key.clone(),
            table_url: format!("{}/rest/v1/{}", config.url, config.table),
        })
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_initial_backoff(backoff);
        self
    }
}

impl PersistenceSink for SupabaseStore {
    /// Upsert keyed on `website`: a re-analysis replaces the previous row.
    fn upsert(&self, profile: &AgencyProfile) -> Result<(), CliError> {
        if profile.website.trim().is_empty() {
            return Err(CliError::new(
                exit_codes::EXIT_STORE,
                "refusing to store a profile without a website",
            ));
        }

        self.client.request_with_retry_text(|http| {
            http.post(&self.table_url)
                .query(&[("on_conflict", "website")])
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(profile)
        })?;

        tracing::debug!(website = %profile.website, "profile stored");
        Ok(())
    }

    fn list_websites(&self, stale_before: Option<DateTime<Utc>>) -> Result<Vec<String>, CliError> {
        let mut params = vec![("select".to_string(), "website".to_string())];
        if let Some(cutoff) = stale_before {
            params.push((
                "last_analyzed".to_string(),
                format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ));
        }

        let body = self.client.request_with_retry(|http| {
            http.get(&self.table_url)
                .query(&params)
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        })?;

        let rows = body.as_array().ok_or_else(|| {
            CliError::new(exit_codes::EXIT_STORE, "Supabase listing is not a JSON array")
        })?;

        Ok(rows
            .iter()
            .filter_map(|row| row["website"].as_str())
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn extract_postgrest_error(body: &Value, status: u16) -> String {
    body["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status_only(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use athos_recon::Contact;
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use serde_json::json;

    fn store(url: String) -> SupabaseStore {
        SupabaseStore::new(&StoreConfig {
            url,
            api_key: "sb-test".into(),
            table: "agencies".into(),
            timeout_secs: 5,
            max_retries: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_upsert_posts_profile() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/agencies")
                .query_param("on_conflict", "website")
                .header("apikey", "sb-test")
                .header("authorization", "Bearer sb-test")
                .header("prefer", "resolution=merge-duplicates,return=minimal")
                .body_includes(r#""website":"https://velstar.co.uk""#)
                .body_includes(r#""directors":[{"name":"Amy Lee","email":"amy@velstar.co.uk"}]"#);
            then.status(201);
        });

        let profile = AgencyProfile {
            name: "Velstar".into(),
            website: "https://velstar.co.uk".into(),
            directors: vec![Contact::named("Amy Lee").with_email("amy@velstar.co.uk")],
            ..AgencyProfile::default()
        };
        store(server.base_url()).upsert(&profile).unwrap();
        mock.assert();
    }

    #[test]
    fn test_upsert_without_website_is_refused() {
        let err = store("http://127.0.0.1:9".into())
            .upsert(&AgencyProfile::default())
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_STORE);
    }

    #[test]
    fn test_upsert_conflict_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/agencies");
            then.status(409).json_body(json!({
                "code": "42P10",
                "message": "there is no unique or exclusion constraint matching the ON CONFLICT specification"
            }));
        });

        let profile = AgencyProfile {
            website: "https://velstar.co.uk".into(),
            ..AgencyProfile::default()
        };
        let err = store(server.base_url()).upsert(&profile).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("ON CONFLICT"), "{}", err.message);
    }

    #[test]
    fn test_list_stale_websites() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/agencies")
                .query_param("select", "website")
                .query_param("last_analyzed", "lt.2026-09-19T00:00:00Z");
            then.status(200).json_body(json!([
                {"website": "https://velstar.co.uk"},
                {"website": null},
                {"website": "  "},
                {"website": "https://hugeinc.com"}
            ]));
        });

        let cutoff = Utc.with_ymd_and_hms(2026, 9, 19, 0, 0, 0).unwrap();
        let sites = store(server.base_url()).list_websites(Some(cutoff)).unwrap();
        mock.assert();
        assert_eq!(sites, vec!["https://velstar.co.uk", "https://hugeinc.com"]);
    }

    #[test]
    fn test_list_all() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/agencies")
                .query_param("select", "website");
            then.status(200).json_body(json!([]));
        });

        let sites = store(server.base_url()).list_websites(None).unwrap();
        mock.assert();
        assert!(sites.is_empty());
    }
}
