//! Organization lists from CSV (`athos analyze --csv`).

use std::collections::HashSet;
use std::io::Read;

use crate::CliError;

/// Header names accepted for the URL column, compared case-insensitively.
const URL_COLUMNS: &[&str] = &["website", "url", "domain", "homepage"];

/// Read website URLs from a CSV with a header row.
///
/// The first header matching [`URL_COLUMNS`] is used. Blank cells are
/// skipped; repeated URLs are kept once, in first-seen order.
pub fn websites_from_csv(reader: impl Read, label: &str) -> Result<Vec<String>, CliError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| CliError::parse(format!("{label}: cannot read CSV header: {e}")))?
        .clone();

    let column = headers
        .iter()
        .position(|h| {
            let h = h.trim_start_matches('\u{feff}');
            URL_COLUMNS.iter().any(|c| h.eq_ignore_ascii_case(c))
        })
        .ok_or_else(|| {
            CliError::parse(format!("{label}: no website column"))
                .with_hint(format!("add a header named one of: {}", URL_COLUMNS.join(", ")))
        })?;

    let mut seen = HashSet::new();
    let mut websites = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record
            .map_err(|e| CliError::parse(format!("{label}: row {}: {e}", i + 2)))?;
        let Some(value) = record.get(column).filter(|v| !v.is_empty()) else {
            continue;
        };
        if seen.insert(value.to_ascii_lowercase()) {
            websites.push(value.to_string());
        }
    }

    Ok(websites)
}
