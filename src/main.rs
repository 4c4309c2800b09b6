//! commentpulse - sentiment analysis for social media comments
//!
//! A CLI tool that scrapes the comments of a social media post, classifies
//! them in concurrent batches with an LLM, and writes a sentiment report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, model setup, report writing, etc.)
//!   2 - Invalid input (bad arguments, malformed URL, unsupported platform)
//!   3 - The post or its comments could not be fetched
//!   4 - Some batches failed and --fail-on-partial was set

mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod normalize;
mod observe;
mod pipeline;
mod platform;
mod progress;
mod report;
mod retry;
mod scraper;

use analysis::session_log::SessionLogger;
use analysis::SentimentAnalyzerFactory;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{Platform, SentimentCategory};
use observe::{Observer, TracingObserver};
use pipeline::Orchestrator;
use progress::ProgressObserver;
use report::ReportOptions;
use scraper::ApifyScraper;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    // Standalone commands need no logging
    if args.init_config {
        return handle_init_config();
    }

    // Loaded before logging starts, since the file can enable verbose output
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if args.list_platforms {
        list_platforms(&config);
        return Ok(());
    }

    // Initialize logging
    init_logging(&args, &config);

    info!("commentpulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run_analysis(args, config).await {
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

/// Handle --init-config: generate a default .commentpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, batch sizes, limits, and more.");
    Ok(())
}

/// Handle --list-platforms.
fn list_platforms(config: &Config) {
    println!("Supported platforms:\n");
    for platform in Platform::ALL {
        println!(
            "  {}",
            platform::describe_platform(platform, &config.scraper.max_comments)
        );
    }
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one analysis request and write the report. Returns the exit code.
async fn run_analysis(args: Args, mut config: Config) -> Result<i32> {
    config.merge_with_args(&args);

    let settings = config
        .processing
        .pipeline_settings()
        .context("Invalid processing configuration")?;

    let scraper = ApifyScraper::from_config(&config.scraper)
        .context("Failed to set up the scraper (set APIFY_API_TOKEN or scraper.api_token)")?;
    let model = llm::build_client(&config.model).context("Failed to set up the model client")?;

    let session_log = config
        .processing
        .session_log_dir
        .clone()
        .map(SessionLogger::new);
    if let Some(ref logger) = session_log {
        info!("Writing session logs to {}", logger.dir().display());
    }

    let analyzers = SentimentAnalyzerFactory::new(
        model.clone(),
        config.processing.language.clone(),
        config.processing.analysis_retry_policy(),
        session_log,
    );

    let url = args.post_url().trim().to_string();

    if !args.quiet {
        println!("💬 Analyzing comments for: {}", url);
        println!("   Model: {} ({:?})", model.model_name(), config.model.provider);
        println!(
            "   Batches: {} comments each, up to {} at a time",
            settings.batch_size, settings.max_concurrent_batches
        );
        println!("   Comment limit: {}\n", settings.global_max_comments);
    }

    // The progress bar sits in front of the tracing observer unless quiet
    let progress = (!args.quiet).then(|| Arc::new(ProgressObserver::new(TracingObserver)));
    let observer: Arc<dyn Observer> = match progress {
        Some(ref p) => p.clone(),
        None => Arc::new(TracingObserver),
    };

    let orchestrator = Orchestrator::new(Arc::new(scraper), Arc::new(analyzers), observer, settings);
    let outcome = orchestrator.run(&url).await;

    if let Some(ref p) = progress {
        p.finish();
    }

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            let code = if e.is_client_error() {
                2
            } else if e.is_upstream_error() {
                3
            } else {
                1
            };
            return Ok(code);
        }
    };

    // Generate and save the report
    let options = ReportOptions {
        model_used: model.model_name().to_string(),
        include_context: config.report.include_context,
        include_all_comments: config.report.include_all_comments,
    };
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &options),
    };

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let summary = &report.summary;
    println!("\n📊 Sentiment Summary:");
    println!("   Platform: {}", report.platform);
    println!("   Comments analyzed: {}", summary.total_comments);
    for category in SentimentCategory::ALL {
        println!(
            "   - {} {}: {} ({:.1}%)",
            category.emoji(),
            category.label(),
            summary.count(category),
            summary.percentage(category)
        );
    }
    println!(
        "   Batches: {} processed, {} failed",
        report.batches_processed, report.batches_failed
    );
    println!("   Duration: {:.1}s", report.processing_time);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    if report.is_partial() {
        warn!(
            "{} of {} batches failed; the summary covers only the analyzed comments",
            report.batches_failed, report.batches_processed
        );
        if args.fail_on_partial {
            eprintln!("\n⛔ Some batches failed to analyze. Failing (exit code 4).");
            return Ok(4);
        }
    }

    Ok(0)
}

/// Where the configuration came from, reported once logging is up.
enum ConfigSource {
    File(PathBuf),
    Builtin,
    DefaultUnreadable(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::DefaultUnreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            let source = ConfigSource::File(PathBuf::from(DEFAULT_CONFIG_FILE));
            Ok((config, source))
        }
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((
            Config::default(),
            ConfigSource::DefaultUnreadable(format!("{:#}", e)),
        )),
    }
}
