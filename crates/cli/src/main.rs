// Athos CLI - agency intelligence pipeline
// crawl → extract → enrich → store, plus offline roster reconciliation

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use athos_cli::batch::{self, RefreshOptions};
use athos_cli::exit_codes::{EXIT_FETCH_NOT_AUTH, EXIT_SUCCESS};
use athos_cli::fetch::{ChatExtractor, FirecrawlClient, HunterClient, SupabaseStore};
use athos_cli::import::websites_from_csv;
use athos_cli::logging::{self, LogOptions};
use athos_cli::pipeline::{
    domain_for_lookup, normalize_start_url, AnalysisReport, ContactLookup, Pipeline,
    PipelineOptions,
};
use athos_cli::roster::{self, RosterFormat};
use athos_cli::CliError;
use athos_config::{KeyOverrides, KeySource, ResolvedConfig, Service, Settings, UrlSource};
use athos_recon::reconcile_with_summary;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "athos")]
#[command(about = "Agency intelligence pipeline: crawl, extract, enrich, store")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/athos/config.toml)
    #[arg(long, global = true, value_name = "PATH", env = "ATHOS_CONFIG")]
    config: Option<PathBuf>,

    /// Only log warnings and errors (ATHOS_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Log JSON lines on stderr instead of text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Explicit API keys. Each falls back to ATHOS_<SERVICE>_KEY, then the
/// service's usual variable (FIRECRAWL_API_KEY, OPENAI_API_KEY, ...).
#[derive(Args, Default)]
struct KeyArgs {
    /// Firecrawl API key
    #[arg(long, value_name = "KEY")]
    crawl_key: Option<String>,

    /// OpenAI / OpenRouter API key
    #[arg(long, value_name = "KEY")]
    extractor_key: Option<String>,

    /// Hunter API key
    #[arg(long, value_name = "KEY")]
    lookup_key: Option<String>,

    /// Supabase service role key
    #[arg(long, value_name = "KEY")]
    store_key: Option<String>,
}

impl From<KeyArgs> for KeyOverrides {
    fn from(keys: KeyArgs) -> Self {
        KeyOverrides {
            crawl: keys.crawl_key,
            extractor: keys.extractor_key,
            lookup: keys.lookup_key,
            store: keys.store_key,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl, extract, enrich and store one or more agencies
    #[command(after_help = "\
Examples:
  athos analyze --url https://velstar.co.uk
  athos analyze --url velstar.co.uk --url hugeinc.com --out reports.json
  athos analyze --csv agencies.csv
  athos analyze --url https://velstar.co.uk --dry-run --no-enrich")]
    Analyze {
        /// Agency website (repeatable; scheme defaults to https)
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// CSV with a website (or url) column
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Run everything except the store write
        #[arg(long)]
        dry_run: bool,

        /// Skip the contact lookup
        #[arg(long)]
        no_enrich: bool,

        /// Write reports to a file (default: stdout)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Re-analyze stored agencies whose profile has gone stale
    #[command(after_help = "\
Examples:
  athos refresh
  athos refresh --stale-days 7
  athos refresh --all --dry-run --out refreshed.json

Exit code 63 means the run finished but at least one agency failed.")]
    Refresh {
        /// Profiles analyzed longer ago than this are due (default: refresh.stale_days)
        #[arg(long, value_name = "DAYS")]
        stale_days: Option<u32>,

        /// Re-analyze every stored agency
        #[arg(long, conflicts_with = "stale_days")]
        all: bool,

        /// Run everything except the store write
        #[arg(long)]
        dry_run: bool,

        /// Write reports to a file (default: stdout)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Merge two contact files offline (primary wins, secondary fills gaps)
    #[command(after_help = "\
Examples:
  athos reconcile extracted.json lookup.json
  athos reconcile profile.json hunter.json --format csv --out roster.csv

Input files hold a JSON array of contacts, or an object with a
\"directors\" or \"contacts\" array.")]
    Reconcile {
        /// Primary contacts (identity records)
        primary: PathBuf,

        /// Secondary contacts (gap fillers, appended when new)
        secondary: PathBuf,

        /// Output file (default: stdout)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: RosterFormat,
    },

    /// Look up contacts for a domain without crawling
    #[command(after_help = "\
Examples:
  athos enrich velstar.co.uk
  athos enrich https://www.velstar.co.uk/about --lookup-key ...")]
    Enrich {
        /// Domain or URL
        target: String,

        /// Hunter API key
        #[arg(long, value_name = "KEY")]
        lookup_key: Option<String>,
    },

    /// Show resolved configuration and where each key comes from
    Doctor {
        /// Output JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        keys: KeyArgs,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nrecon:   athos-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nrecon:   athos-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(LogOptions {
        quiet: cli.quiet,
        json: cli.json_logs,
    });
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Analyze { urls, csv, dry_run, no_enrich, out, keys } => {
            cmd_analyze(config, urls, csv, dry_run, no_enrich, out, keys)
        }
        Commands::Refresh { stale_days, all, dry_run, out, keys } => {
            cmd_refresh(config, stale_days, all, dry_run, out, keys)
        }
        Commands::Reconcile { primary, secondary, out, format } => {
            cmd_reconcile(primary, secondary, out, format)
        }
        Commands::Enrich { target, lookup_key } => cmd_enrich(config, target, lookup_key),
        Commands::Doctor { json, keys } => cmd_doctor(config, json, keys),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn resolve(config: Option<&Path>, keys: KeyOverrides) -> Result<ResolvedConfig, CliError> {
    let settings = Settings::load(config)?;
    Ok(ResolvedConfig::resolve(settings, &keys))
}

fn open_output(out: &Option<PathBuf>) -> Result<Box<dyn Write>, CliError> {
    match out {
        Some(path) => {
            let f = File::create(path).map_err(|e| {
                CliError::io(format!("cannot create {}: {}", path.display(), e))
            })?;
            Ok(Box::new(BufWriter::new(f)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn write_report(out: &mut dyn Write, report: &AnalysisReport) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, report)
        .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
    writeln!(out).map_err(|e| CliError::io(e.to_string()))?;
    out.flush().map_err(|e| CliError::io(e.to_string()))
}

/// Lookup adapter, or the reason enrichment is skipped. A missing Hunter
/// key is not fatal for the pipeline.
fn build_lookup(resolved: &ResolvedConfig, disabled_by_flag: bool) -> Result<HunterClient, String> {
    if disabled_by_flag {
        return Err("disabled by --no-enrich".to_string());
    }
    match resolved.lookup() {
        Ok(Some(cfg)) => HunterClient::new(&cfg).map_err(|e| e.message),
        Ok(None) => Err("lookup disabled in config".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "contact lookup unavailable");
            Err(e.to_string())
        }
    }
}

fn with_lookup<'a>(
    pipeline: Pipeline<'a>,
    lookup: &'a Result<HunterClient, String>,
) -> Pipeline<'a> {
    match lookup {
        Ok(client) => pipeline.with_lookup(client as &dyn ContactLookup),
        Err(reason) => pipeline.without_lookup(reason.clone()),
    }
}

// ============================================================================
// analyze
// ============================================================================

fn cmd_analyze(
    config: Option<&Path>,
    urls: Vec<String>,
    csv: Option<PathBuf>,
    dry_run: bool,
    no_enrich: bool,
    out: Option<PathBuf>,
    keys: KeyArgs,
) -> Result<(), CliError> {
    let mut targets = urls;
    if let Some(path) = &csv {
        let file = File::open(path)
            .map_err(|e| CliError::io(format!("cannot open {}: {}", path.display(), e)))?;
        targets.extend(websites_from_csv(file, &path.display().to_string())?);
    }
    if targets.is_empty() {
        return Err(CliError::args("no agencies to analyze")
            .with_hint("pass --url <URL> (repeatable) or --csv <FILE>"));
    }
    let targets = targets
        .iter()
        .map(|u| normalize_start_url(u))
        .collect::<Result<Vec<_>, _>>()?;

    let resolved = resolve(config, keys.into())?;
    let fetcher = FirecrawlClient::new(&resolved.crawl()?)?;
    let extractor = ChatExtractor::new(&resolved.extractor()?)?;
    let lookup = build_lookup(&resolved, no_enrich);
    let store = if dry_run {
        None
    } else {
        Some(SupabaseStore::new(&resolved.store()?)?)
    };

    let mut pipeline = with_lookup(
        Pipeline::new(&fetcher, &extractor, PipelineOptions::from_settings(&resolved.settings)),
        &lookup,
    );
    if let Some(store) = &store {
        pipeline = pipeline.with_sink(store);
    }

    let mut writer = open_output(&out)?;

    if let [single] = targets.as_slice() {
        let report = pipeline.run(single)?;
        return write_report(&mut *writer, &report);
    }

    let delay = Duration::from_millis(resolved.settings.refresh.org_delay_ms);
    batch::run_batch(&pipeline, &targets, delay, |report| {
        write_report(&mut *writer, report)
    })?
    .into_result()
}

// ============================================================================
// refresh
// ============================================================================

fn cmd_refresh(
    config: Option<&Path>,
    stale_days: Option<u32>,
    all: bool,
    dry_run: bool,
    out: Option<PathBuf>,
    keys: KeyArgs,
) -> Result<(), CliError> {
    let resolved = resolve(config, keys.into())?;

    let stale_days = stale_days.unwrap_or(resolved.settings.refresh.stale_days);
    if stale_days == 0 {
        return Err(CliError::args("--stale-days must be positive"));
    }

    // The store is needed for listing even on a dry run
    let store = SupabaseStore::new(&resolved.store()?)?;
    let fetcher = FirecrawlClient::new(&resolved.crawl()?)?;
    let extractor = ChatExtractor::new(&resolved.extractor()?)?;
    let lookup = build_lookup(&resolved, false);

    let mut pipeline = with_lookup(
        Pipeline::new(&fetcher, &extractor, PipelineOptions::from_settings(&resolved.settings)),
        &lookup,
    );
    if !dry_run {
        pipeline = pipeline.with_sink(&store);
    }

    let opts = RefreshOptions {
        stale_days,
        all,
        org_delay: Duration::from_millis(resolved.settings.refresh.org_delay_ms),
    };

    let mut writer = open_output(&out)?;
    batch::refresh(&pipeline, &store, &opts, Utc::now(), |report| {
        write_report(&mut *writer, report)
    })?
    .into_result()
}

// ============================================================================
// reconcile
// ============================================================================

fn cmd_reconcile(
    primary: PathBuf,
    secondary: PathBuf,
    out: Option<PathBuf>,
    format: RosterFormat,
) -> Result<(), CliError> {
    let primary_contacts = roster::load_contacts(&primary)?;
    let secondary_contacts = roster::load_contacts(&secondary)?;

    let reconciled = reconcile_with_summary(&primary_contacts, &secondary_contacts);
    let s = &reconciled.summary;
    tracing::info!(
        primary = s.primary_in,
        secondary = s.secondary_in,
        matched = s.matched,
        fields_filled = s.fields_filled,
        appended = s.appended,
        discarded_unnamed = s.discarded_unnamed,
        duplicates_collapsed = s.primary_duplicates_collapsed,
        "roster reconciled",
    );

    let mut writer = open_output(&out)?;
    roster::write_roster(&reconciled, format, &mut writer)?;
    writer.flush().map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// enrich
// ============================================================================

fn cmd_enrich(
    config: Option<&Path>,
    target: String,
    lookup_key: Option<String>,
) -> Result<(), CliError> {
    let keys = KeyOverrides {
        lookup: lookup_key,
        ..KeyOverrides::default()
    };
    let resolved = resolve(config, keys)?;
    let cfg = resolved.lookup()?.ok_or_else(|| {
        CliError::args("contact lookup is disabled").with_hint("set lookup.enabled = true in config.toml")
    })?;

    let domain = domain_for_lookup(&target)
        .ok_or_else(|| CliError::args(format!("no domain in {target:?}")))?;

    let contacts = HunterClient::new(&cfg)?.lookup(&domain)?;
    tracing::info!(domain = %domain, contacts = contacts.len(), "lookup complete");

    let output = serde_json::json!({
        "domain": domain,
        "contacts": contacts,
    });
    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// doctor
// ============================================================================

fn cmd_doctor(config: Option<&Path>, json: bool, keys: KeyArgs) -> Result<(), CliError> {
    let config_path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::config_path);
    let resolved = resolve(config, keys.into())?;
    let settings = &resolved.settings;

    let key_status = |service: Service| {
        let source = resolved.key_source(service);
        let present = source != KeySource::None;
        (present, source.describe())
    };

    let store_url = match resolved.store_url_source() {
        UrlSource::File => "config",
        UrlSource::Environment => "env:SUPABASE_URL",
        UrlSource::None => "missing",
    };

    // Lookup is optional; everything else is needed for `analyze`
    let mut blocking: Vec<String> = [Service::Crawl, Service::Extractor, Service::Store]
        .into_iter()
        .filter(|s| !key_status(*s).0)
        .map(|s| format!("missing {} key", s.as_str()))
        .collect();
    if resolved.store_url_source() == UrlSource::None {
        blocking.push("missing store URL".to_string());
    }
    let status = if blocking.is_empty() { "ready" } else { "misconfigured" };

    if json {
        let services: serde_json::Map<String, serde_json::Value> = Service::ALL
            .iter()
            .map(|s| {
                let (present, source) = key_status(*s);
                (
                    s.as_str().to_string(),
                    serde_json::json!({
                        "key": if present { "present" } else { "missing" },
                        "key_source": source,
                    }),
                )
            })
            .collect();
        let output = serde_json::json!({
            "schema_version": 1,
            "status": status,
            "blocking": blocking,
            "config_path": config_path.display().to_string(),
            "config_exists": config_path.exists(),
            "services": services,
            "crawl_base_url": settings.crawl.base_url,
            "extractor_base_url": resolved.extractor_base_url(),
            "model": settings.extractor.model,
            "subpage_model": settings.extractor.effective_subpage_model(),
            "lookup_enabled": settings.lookup.enabled,
            "store_url": store_url,
            "store_table": settings.store.table,
            "stale_days": settings.refresh.stale_days,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
        println!("{text}");
    } else {
        println!("Athos Doctor");
        println!("------------");
        println!("status:        {}", status);
        println!(
            "config:        {}{}",
            config_path.display(),
            if config_path.exists() { "" } else { " (not found, using defaults)" }
        );
        for service in Service::ALL {
            let (present, source) = key_status(service);
            println!(
                "{:<14} {} ({})",
                format!("{}_key:", service.as_str()),
                if present { "present" } else { "missing" },
                source,
            );
        }
        println!("extractor_url: {}", resolved.extractor_base_url());
        println!("model:         {}", settings.extractor.model);
        println!("subpage_model: {}", settings.extractor.effective_subpage_model());
        println!("lookup:        {}", if settings.lookup.enabled { "enabled" } else { "disabled" });
        println!("store_url:     {}", store_url);
        println!("store_table:   {}", settings.store.table);
        println!("stale_days:    {}", settings.refresh.stale_days);

        if !blocking.is_empty() {
            println!();
            for service in [Service::Crawl, Service::Extractor, Service::Store] {
                if !key_status(service).0 {
                    println!("Fix: export {}=<key>", service.env_vars()[0]);
                }
            }
            if resolved.store_url_source() == UrlSource::None {
                println!("Fix: export SUPABASE_URL=https://<project>.supabase.co");
            }
        }
    }

    if blocking.is_empty() {
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_FETCH_NOT_AUTH,
            format!("configuration incomplete: {}", blocking.join(", ")),
        ))
    }
}
