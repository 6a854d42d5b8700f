//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the filter directives.
/// Format: `ATHOS_LOG=athos_cli::pipeline=debug,athos_cli::fetch=warn`
pub const LOG_ENV: &str = "ATHOS_LOG";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Default to `warn` instead of `info` when `ATHOS_LOG` is unset.
    pub quiet: bool,
    /// One JSON object per event instead of human-readable lines.
    pub json: bool,
}

fn default_directive(opts: LogOptions) -> &'static str {
    if opts.quiet {
        "athos=warn"
    } else {
        "athos=info"
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries reports.
///
/// Idempotent: only the first call has any effect.
pub fn init(opts: LogOptions) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(opts)));

        let registry = tracing_subscriber::registry().with(filter);
        if opts.json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    });
}
