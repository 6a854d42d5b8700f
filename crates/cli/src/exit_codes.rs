//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `athos` exit codes.
//! Exit codes are part of the shell contract: schedulers and scripts that
//! run `athos refresh` branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | CLI usage error (bad args, bad config value) |
//! | 3-4     | Universal  | Local I/O and parse errors                   |
//! | 50-59   | adapters   | Collaborator HTTP failures                   |
//! | 60-69   | pipeline   | Stage failures and batch outcome             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above

// =============================================================================
// Universal (0-4)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid configuration values.
pub const EXIT_USAGE: u8 = 2;

/// Local file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Local file (config, contacts JSON, CSV) could not be parsed.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Adapters (50-59) - Firecrawl, extractor, Hunter, Supabase
// =============================================================================

/// No API key provided (no flag, env var or keychain entry).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Bad request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Rate limited after retries (429).
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// Upstream error (other 4xx, 5xx) or network failure after retries.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

// =============================================================================
// Pipeline (60-69)
// =============================================================================

/// Crawler answered but produced no page content.
pub const EXIT_PAGE_FETCH: u8 = 60;

/// Extractor answered with something that is not a usable profile.
pub const EXIT_EXTRACTION: u8 = 61;

/// Store answered with something other than success.
pub const EXIT_STORE: u8 = 62;

/// Batch run finished, but at least one organization failed.
pub const EXIT_BATCH_FAILURES: u8 = 63;

/// Stable machine name for an exit code, used in JSON reports.
pub fn code_name(code: u8) -> &'static str {
    match code {
        EXIT_SUCCESS => "success",
        EXIT_USAGE => "usage",
        EXIT_IO => "io",
        EXIT_PARSE => "parse",
        EXIT_FETCH_NOT_AUTH => "missing_key",
        EXIT_FETCH_AUTH => "auth_rejected",
        EXIT_FETCH_VALIDATION => "request_rejected",
        EXIT_FETCH_RATE_LIMIT => "rate_limited",
        EXIT_FETCH_UPSTREAM => "upstream",
        EXIT_PAGE_FETCH => "page_fetch",
        EXIT_EXTRACTION => "extraction",
        EXIT_STORE => "store",
        EXIT_BATCH_FAILURES => "batch_failures",
        _ => "error",
    }
}
