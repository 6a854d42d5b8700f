//! Sequential multi-organization runs: `analyze` with several URLs, and
//! `refresh` over the websites already in the store.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::exit_codes;
use crate::pipeline::{normalize_start_url, AnalysisReport, PersistenceSink, Pipeline};
use crate::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub url: String,
    pub code: u8,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    /// `Err(63)` when any organization failed.
    pub fn into_result(self) -> Result<(), CliError> {
        if self.failed.is_empty() {
            return Ok(());
        }
        let first = &self.failed[0];
        Err(CliError::new(
            exit_codes::EXIT_BATCH_FAILURES,
            format!(
                "{} of {} organizations failed (first: {}: {})",
                self.failed.len(),
                self.total,
                first.url,
                first.error,
            ),
        ))
    }
}

/// Run the pipeline for each URL in order, `delay` apart, continuing past
/// failures. `on_report` sees every successful report as it completes.
pub fn run_batch(
    pipeline: &Pipeline<'_>,
    urls: &[String],
    delay: Duration,
    mut on_report: impl FnMut(&AnalysisReport) -> Result<(), CliError>,
) -> Result<BatchSummary, CliError> {
    let mut summary = BatchSummary {
        total: urls.len(),
        ..BatchSummary::default()
    };

    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        info!(index = i + 1, total = urls.len(), url = %url, "processing organization");

        match pipeline.run(url) {
            Ok(report) => {
                summary.succeeded += 1;
                // Output failures (stdout closed, disk full) stop the batch
                on_report(&report)?;
            }
            Err(e) => {
                error!(url = %url, code = e.code, error = %e, "organization failed");
                summary.failed.push(BatchFailure {
                    url: url.clone(),
                    code: e.code,
                    kind: exit_codes::code_name(e.code),
                    error: e.message,
                });
            }
        }
    }

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        "batch complete",
    );
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Re-analyze profiles older than this many days.
    pub stale_days: u32,
    /// Re-analyze everything regardless of age.
    pub all: bool,
    pub org_delay: Duration,
}

/// Cutoff for staleness, or `None` when every profile is due.
pub fn stale_cutoff(opts: &RefreshOptions, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if opts.all {
        None
    } else {
        Some(now - chrono::Duration::days(i64::from(opts.stale_days)))
    }
}

/// List due websites from `store` and re-run the pipeline on each.
///
/// Stored websites go through the same normalization as `analyze --url`;
/// entries that cannot be turned into a start URL are counted as failures
/// without being fetched.
///
/// `store` is used for listing only; whether results are written back is
/// decided by the pipeline's own sink (absent on dry runs).
pub fn refresh(
    pipeline: &Pipeline<'_>,
    store: &dyn PersistenceSink,
    opts: &RefreshOptions,
    now: DateTime<Utc>,
    on_report: impl FnMut(&AnalysisReport) -> Result<(), CliError>,
) -> Result<BatchSummary, CliError> {
    let cutoff = stale_cutoff(opts, now);
    let websites = store.list_websites(cutoff)?;
    match cutoff {
        Some(c) => info!(due = websites.len(), cutoff = %c.to_rfc3339(), "stale profiles found"),
        None => info!(due = websites.len(), "refreshing all profiles"),
    }

    let mut targets = Vec::with_capacity(websites.len());
    let mut rejected = Vec::new();
    for website in websites {
        match normalize_start_url(&website) {
            Ok(url) => targets.push(url),
            Err(e) => {
                warn!(website = %website, error = %e, "skipping stored website");
                rejected.push(BatchFailure {
                    url: website,
                    code: e.code,
                    kind: exit_codes::code_name(e.code),
                    error: e.message,
                });
            }
        }
    }

    let mut summary = run_batch(pipeline, &targets, opts.org_delay, on_report)?;
    if !rejected.is_empty() {
        summary.total += rejected.len();
        rejected.append(&mut summary.failed);
        summary.failed = rejected;
    }
    Ok(summary)
}
