//! azcir - Azure storage Cost Intelligence Reports
//!
//! A CLI tool that inventories Azure storage accounts, blob containers
//! and file shares across subscriptions and writes a Markdown or JSON
//! cost intelligence report.
//!
//! Exit codes:
//!   0 - Success (at least one subscription analyzed)
//!   1 - Fatal error (selection, authentication, configuration, I/O)
//!   2 - No subscription could be analyzed

mod analysis;
mod azure;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod selection;

use anyhow::{Context, Result};
use azure::{AccountProvider, AzureAccounts, StorageAnalyzer};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, SelectionSpec, Subscription};
use selection::SelectionPrompt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("azcir v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .azcir.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize workers, selection, account filters, and cost lookback.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration, merged with CLI arguments and validated.
///
/// Returns the file it came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, source) = match args.config {
        Some(ref path) => (Config::load(path)?, Some(path.clone())),
        None => match Config::load_default()? {
            Some(config) => (config, Some(PathBuf::from(CONFIG_FILE_NAME))),
            None => (Config::default(), None),
        },
    };

    config.merge_with_args(args);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    Ok((config, source))
}

/// Run the complete analysis workflow. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Authenticate
    println!("🔐 Authenticating with Azure CLI...");
    let (arm, cli) = azure::authenticate(&config.azure).await?;

    // Step 2: Enumerate subscriptions
    let accounts = AzureAccounts::new(arm.clone(), cli);
    let available = accounts
        .list_subscriptions()
        .await
        .context("Failed to list subscriptions")?;
    let current = accounts.current_subscription_id().await;
    println!("📋 Found {} subscription(s)", available.len());

    // Step 3: Resolve the selection
    let spec = choose_selection(&args, &config, &available, current.as_deref())?;
    let selected = selection::resolve(&spec, &available, current.as_deref())?;
    info!("Selection '{}' resolved to {} subscription(s)", spec, selected.len());

    if args.dry_run {
        return Ok(handle_dry_run(&available, &selected, &spec));
    }

    // Step 4: Analyze each subscription
    println!(
        "\n🔬 Analyzing {} subscription(s) with up to {} worker(s)...",
        selected.len(),
        config.general.max_workers
    );

    let analyzer = StorageAnalyzer::new(arm, config.scanner.clone(), config.costs.clone());
    let progress = (!args.quiet).then(|| create_progress_bar(selected.len() as u64));

    let outcomes = analysis::analyze_all(
        &analyzer,
        selected,
        config.general.max_workers,
        progress.as_ref(),
    )
    .await;

    if let Some(ref bar) = progress {
        bar.finish_and_clear();
    }

    // Step 5: Aggregate
    let metadata = ReportMetadata {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        analysis_date: Utc::now(),
        selection: spec.to_string(),
        max_workers: config.general.max_workers,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = analysis::aggregate(outcomes, metadata);

    // Step 6: Generate and save the report
    println!("\n📝 Generating report...");
    let content = report::render(&report, args.format, &config.report)?;
    let path = args.output.clone().unwrap_or_else(|| {
        report::default_output_path(
            Path::new(&config.general.output_dir),
            args.format,
            report.is_multi_subscription(),
            report.metadata.analysis_date,
        )
    });
    report::write_report(&path, &content)?;

    println!("\n{}", report::console_summary(&report));

    if !report.has_successes() {
        eprintln!(
            "\n⛔ No subscription could be analyzed. Report saved to: {} (exit code 2).",
            path.display()
        );
        return Ok(2);
    }

    if !report.failures.is_empty() {
        warn!(
            "{} subscription(s) failed; see the report for details",
            report.failures.len()
        );
    }

    println!("\n✅ Analysis complete! Report saved to: {}", path.display());
    Ok(0)
}

/// Pick the selection from flags, then config, then the interactive prompt.
fn choose_selection(
    args: &Args,
    config: &Config,
    available: &[Subscription],
    current: Option<&str>,
) -> Result<SelectionSpec, error::SelectionError> {
    if let Some(spec) = args.selection_spec() {
        return Ok(spec);
    }

    if let Some(spec) = selection::configured_spec(&config.selection) {
        info!("Using selection from config: {}", spec);
        return Ok(spec);
    }

    if std::io::stdin().is_terminal() {
        let stdin = std::io::stdin();
        let mut prompt = SelectionPrompt::new(
            stdin.lock(),
            std::io::stdout(),
            config.selection.max_prompt_attempts,
        );
        return prompt.run(available, current);
    }

    info!("No selection given and stdin is not a terminal; using the current subscription");
    Ok(SelectionSpec::Current)
}

/// Handle --dry-run: print the subscriptions that would be analyzed.
fn handle_dry_run(available: &[Subscription], selected: &[Subscription], spec: &SelectionSpec) -> i32 {
    println!("\n🔍 Dry run: no storage APIs will be called.\n");

    println!("   Visible subscriptions:");
    for (i, sub) in available.iter().enumerate() {
        println!(
            "     {}. {} - ID: {}, State: {}",
            i + 1,
            sub.name,
            sub.id,
            sub.state
        );
    }

    println!("\n   Selection '{}' would analyze {} subscription(s):", spec, selected.len());
    for sub in selected {
        println!("     ☁️  {}", sub);
    }

    println!("\n✅ Dry run complete.");
    0
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
