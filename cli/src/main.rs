//! CLI for tracker-migrate.
//!
//! Migrates stories, comments and attachments from a Jira CSV export into a
//! Taiga project.

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracker_migrate::{
    load_config, ItemOutcome, JiraCredentials, RecordOutcome, RunSummary, Runner, RunnerConfig,
    RunnerError, TaigaSettings, TemplateRenderer,
};

/// tracker-migrate - Move a Jira CSV export into a Taiga project.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the Jira CSV export.
    #[arg(long, env = "JIRA_CSV_FILENAME")]
    csv: PathBuf,

    /// Taiga base URL.
    #[arg(long, env = "TAIGA_HOST")]
    taiga_host: String,

    /// Taiga login.
    #[arg(long, env = "TAIGA_USERNAME")]
    taiga_username: String,

    /// Taiga password.
    #[arg(long, env = "TAIGA_PASSWORD", hide_env_values = true)]
    taiga_password: String,

    /// Slug of the destination Taiga project.
    #[arg(long, env = "TAIGA_PROJECT_SLUG")]
    project_slug: String,

    /// Jira account used to download attachments.
    #[arg(long, env = "JIRA_USERNAME")]
    jira_username: Option<String>,

    /// Jira API token used to download attachments.
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    jira_api_token: Option<String>,

    /// Preview the migration without creating anything.
    #[arg(long, env = "DRY_RUN", value_parser = BoolishValueParser::new())]
    dry_run: bool,

    /// Create statuses missing from the destination project.
    #[arg(
        long,
        env = "RESET_STATUSES",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    reset_statuses: Option<bool>,

    /// Download attachments from Jira and upload them to Taiga.
    #[arg(
        long,
        env = "DOWNLOAD_ATTACHMENTS",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    download_attachments: Option<bool>,

    /// Path to a TOML file with migration options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the ledger file (defaults to `<csv>.ledger.json`).
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Write the run summary as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse arguments
    let args = Args::parse();

    // Initialize tracing
    if let Err(e) = init_tracing(args.log_file.as_deref()) {
        eprintln!("Failed to open log file: {e}");
        return ExitCode::from(2);
    }

    // reqwest and rustls may both enable a crypto backend; pick one up front.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let stop = Arc::new(AtomicBool::new(false));
    watch_for_interrupt(Arc::clone(&stop));

    let report = args.report.clone();

    // Run the main logic
    match run(args, stop).await {
        Ok(summary) => {
            print_summary(&summary);
            if let Some(path) = report {
                write_report(&summary, &path);
            }

            if summary.all_success() {
                ExitCode::from(0)
            } else if summary.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - An optional plain-text copy of the logs in `log_file`
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    Ok(())
}

/// Raises `stop` on Ctrl-C. The record in flight is finished first.
fn watch_for_interrupt(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current record");
            stop.store(true, Ordering::SeqCst);
        }
    });
}

/// Main execution logic.
async fn run(args: Args, stop: Arc<AtomicBool>) -> Result<RunSummary, RunnerError> {
    let mut migration = load_config(args.config.as_deref())?;
    if args.dry_run {
        migration.dry_run = true;
    }
    if let Some(reset) = args.reset_statuses {
        migration.reset_statuses = reset;
    }
    if let Some(download) = args.download_attachments {
        migration.download_attachments = download;
    }

    let taiga = TaigaSettings {
        host: args.taiga_host,
        username: args.taiga_username,
        password: args.taiga_password,
        project_slug: args.project_slug,
    };
    let mut config = RunnerConfig::new(args.csv, taiga, migration);
    if let Some(path) = args.ledger {
        config = config.with_ledger_path(path);
    }
    if let (Some(username), Some(api_token)) = (args.jira_username, args.jira_api_token) {
        config = config.with_jira_credentials(JiraCredentials {
            username,
            api_token,
        });
    }

    Runner::new(config).with_stop_flag(stop).run().await
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        let renderer = TemplateRenderer::new();
        println!();
        for result in &summary.results {
            match renderer.render_preview(result) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(row = result.row, error = %e, "Failed to render preview"),
            }
        }
    }

    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Records: {}", summary.results.len());
    println!("  Malformed rows: {}", summary.malformed.len());
    println!("  Unassigned: {}", summary.unassigned());

    if summary.dry_run {
        println!("  Records planned: {}", summary.records_planned());
    } else {
        println!("  Records created: {}", summary.records_created());
        println!(
            "  Records already migrated: {}",
            summary.records_already_migrated()
        );
        println!("  Comments created: {}", summary.comments_created());
        println!("  Comments failed: {}", summary.comments_failed());
        println!("  Attachments uploaded: {}", summary.attachments_uploaded());
        println!("  Attachments failed: {}", summary.attachments_failed());
    }
    println!("  Records skipped: {}", summary.records_skipped());
    println!("  Records failed: {}", summary.records_failed());

    for malformed in &summary.malformed {
        println!("  [malformed] {malformed}");
    }
    for result in &summary.results {
        match &result.outcome {
            RecordOutcome::Failed { error } => {
                println!("  [failed] row {} '{}': {error}", result.row, result.title);
            }
            RecordOutcome::Skipped { reason } => {
                println!("  [skipped] row {} '{}': {reason}", result.row, result.title);
            }
            _ => {}
        }
        for comment in &result.comments {
            if let ItemOutcome::Failed { error } = &comment.outcome {
                println!(
                    "  [comment failed] row {} #{}: {error}",
                    result.row, comment.index
                );
            }
        }
        for attachment in &result.attachments {
            if let ItemOutcome::Failed { error } = &attachment.outcome {
                println!(
                    "  [attachment failed] row {} {}: {error}",
                    result.row, attachment.filename
                );
            }
        }
    }
}

/// Writes the summary as JSON. Failures are logged, not fatal.
fn write_report(summary: &RunSummary, path: &Path) {
    let written = File::create(path)
        .map_err(|e| e.to_string())
        .and_then(|file| serde_json::to_writer_pretty(file, summary).map_err(|e| e.to_string()));
    match written {
        Ok(()) => info!(path = %path.display(), "Wrote report"),
        Err(e) => error!(path = %path.display(), error = %e, "Failed to write report"),
    }
}
