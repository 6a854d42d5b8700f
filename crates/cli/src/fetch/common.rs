//! Shared HTTP infrastructure for the collaborator adapters.
//!
//! Each adapter (firecrawl, openai, hunter, supabase) reuses:
//! - `FetchClient` - HTTP client with retry / backoff / error classification
//! - `truncate_chars` - cut text on a char boundary before sending it upstream
//!
//! # Status classification
//!
//! | Status           | Retried | Exit code                     |
//! |------------------|---------|-------------------------------|
//! | 401, 403         | no      | `EXIT_FETCH_AUTH` (51)        |
//! | 400              | no      | `EXIT_FETCH_VALIDATION` (52)  |
//! | other 4xx        | no      | `EXIT_FETCH_UPSTREAM` (54)    |
//! | 429              | yes     | `EXIT_FETCH_RATE_LIMIT` (53)  |
//! | 5xx, network     | yes     | `EXIT_FETCH_UPSTREAM` (54)    |

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::exit_codes;
use crate::CliError;

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const USER_AGENT: &str = concat!("athos/", env!("CARGO_PKG_VERSION"));
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Adapters own their API key, base URL, and auth method. They pass a
/// request-building closure to [`FetchClient::request_with_retry`] which
/// handles the retry loop and maps HTTP status codes to the standard exit
/// codes.
pub(crate) struct FetchClient {
    http: Client,
    source_name: String,
    max_retries: u32,
    initial_backoff: Duration,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &str,
        timeout_secs: u64,
        max_retries: u32,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, CliError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError::new(
                exit_codes::EXIT_ERROR,
                format!("failed to build HTTP client for {source_name}: {e}"),
            ))?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            max_retries,
            initial_backoff: INITIAL_BACKOFF,
            error_extractor,
        })
    }

    /// First retry waits this long; each further retry doubles it.
    pub(crate) fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Send with retry and parse the success body as JSON.
    ///
    /// `build_request` is called once per attempt. It receives the
    /// underlying `reqwest::blocking::Client` and must return a fully
    /// configured `RequestBuilder` (URL, auth, headers, body).
    pub(crate) fn request_with_retry(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<serde_json::Value, CliError> {
        let text = self.request_with_retry_text(build_request)?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| {
            CliError::new(
                exit_codes::EXIT_FETCH_UPSTREAM,
                format!(
                    "failed to parse {} JSON response: {} (body: {})",
                    self.source_name,
                    e,
                    truncate_chars(trimmed, 200),
                ),
            )
        })
    }

    /// Like `request_with_retry`, but returns the raw success body. Used
    /// where the upstream may answer 2xx with an empty body.
    pub(crate) fn request_with_retry_text(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<String, CliError> {
        let resp = self.send_with_retry(build_request)?;
        resp.text().map_err(|e| {
            CliError::new(
                exit_codes::EXIT_FETCH_UPSTREAM,
                format!("failed to read {} response body: {}", self.source_name, e),
            )
        })
    }

    fn send_with_retry(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Response, CliError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            let outcome = build_request(&self.http).send();

            let (wait, reason) = match outcome {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return Ok(resp);
                    }
                    if status != 429 && status < 500 {
                        return Err(self.rejected(resp, status));
                    }
                    if attempt == self.max_retries {
                        let (code, what) = if status == 429 {
                            (exit_codes::EXIT_FETCH_RATE_LIMIT, "rate limited")
                        } else {
                            (exit_codes::EXIT_FETCH_UPSTREAM, "upstream error")
                        };
                        return Err(CliError::new(
                            code,
                            format!(
                                "{} {} after {} attempts ({})",
                                self.source_name,
                                what,
                                attempt + 1,
                                status,
                            ),
                        ));
                    }
                    // Respect Retry-After for 429
                    let wait = if status == 429 {
                        retry_after(&resp).unwrap_or(backoff)
                    } else {
                        backoff
                    };
                    (wait, format!("HTTP {status}"))
                }
                Err(e) => {
                    if attempt == self.max_retries {
                        return Err(CliError::new(
                            exit_codes::EXIT_FETCH_UPSTREAM,
                            format!(
                                "{} upstream error after {} attempts: {}",
                                self.source_name,
                                attempt + 1,
                                e,
                            ),
                        ));
                    }
                    (backoff, e.to_string())
                }
            };

            attempt += 1;
            tracing::warn!(
                source = %self.source_name,
                attempt,
                max_retries = self.max_retries,
                wait_ms = wait.as_millis() as u64,
                reason = %reason,
                "retrying request",
            );
            thread::sleep(wait);
            backoff *= 2;
        }
    }

    /// Non-retryable 4xx: classify and pull the upstream's message.
    fn rejected(&self, resp: Response, status: u16) -> CliError {
        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
        let msg = (self.error_extractor)(&body, status);
        let name = &self.source_name;
        match status {
            401 | 403 => CliError::new(
                exit_codes::EXIT_FETCH_AUTH,
                format!("{name} auth failed ({status}): {msg}"),
            ),
            400 => CliError::new(
                exit_codes::EXIT_FETCH_VALIDATION,
                format!("{name} request rejected ({status}): {msg}"),
            ),
            _ => CliError::new(
                exit_codes::EXIT_FETCH_UPSTREAM,
                format!("{name} error ({status}): {msg}"),
            ),
        }
    }
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ── Shared helpers ──────────────────────────────────────────────────

/// First `max` chars of `s`, never splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Fallback for upstreams whose error body has no recognizable message.
pub(crate) fn status_only(status: u16) -> String {
    format!("HTTP {status}")
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn extract_message(body: &serde_json::Value, status: u16) -> String {
        body["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| status_only(status))
    }

    fn client(max_retries: u32) -> FetchClient {
        FetchClient::new("Test", 5, max_retries, extract_message)
            .unwrap()
            .with_initial_backoff(Duration::ZERO)
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_success_parses_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).json_body(serde_json::json!({"a": 1}));
        });

        let body = client(0)
            .request_with_retry(|http| http.get(server.url("/ok")))
            .unwrap();
        assert_eq!(body["a"], 1);
    }

    #[test]
    fn test_bom_prefixed_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bom");
            then.status(200).body("\u{feff}{\"a\": 2}");
        });

        let body = client(0)
            .request_with_retry(|http| http.get(server.url("/bom")))
            .unwrap();
        assert_eq!(body["a"], 2);
    }

    #[test]
    fn test_auth_failure_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/secret");
            then.status(401).json_body(serde_json::json!({"message": "bad key"}));
        });

        let err = client(3)
            .request_with_retry(|http| http.get(server.url("/secret")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Test auth failed (401): bad key"), "{}", err.message);
        mock.assert_calls(1);
    }

    #[test]
    fn test_bad_request_exit_52() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bad");
            then.status(400).body("not json");
        });

        let err = client(3)
            .request_with_retry(|http| http.get(server.url("/bad")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_VALIDATION);
        assert!(err.message.contains("HTTP 400"), "{}", err.message);
    }

    #[test]
    fn test_not_found_is_upstream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = client(3)
            .request_with_retry(|http| http.get(server.url("/missing")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
    }

    #[test]
    fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("retry-after", "0");
        });

        let err = client(2)
            .request_with_retry(|http| http.get(server.url("/busy")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_RATE_LIMIT);
        assert!(err.message.contains("rate limited after 3 attempts"), "{}", err.message);
        // 1 initial + 2 retries
        mock.assert_calls(3);
    }

    #[test]
    fn test_server_error_exhausts_retries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/flaky");
            then.status(503);
        });

        let err = client(1)
            .request_with_retry_text(|http| http.post(server.url("/flaky")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        mock.assert_calls(2);
    }

    #[test]
    fn test_malformed_json_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>oops</html>");
        });

        let err = client(0)
            .request_with_retry(|http| http.get(server.url("/html")))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("failed to parse Test JSON"), "{}", err.message);
    }

    #[test]
    fn test_empty_body_allowed_for_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upsert");
            then.status(201);
        });

        let text = client(0)
            .request_with_retry_text(|http| http.post(server.url("/upsert")))
            .unwrap();
        assert!(text.is_empty());
    }
}
