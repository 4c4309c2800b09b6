//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ModelProvider;
use clap::Parser;
use std::path::PathBuf;

/// commentpulse - sentiment analysis for social media comments
///
/// Scrape the comments of a YouTube, Facebook, Twitter/X, or Instagram post,
/// classify each one with an LLM, and write a Markdown or JSON report.
///
/// Examples:
///   commentpulse --url https://www.youtube.com/watch?v=dQw4w9WgXcQ
///   commentpulse --url https://x.com/user/status/123 --provider gemini
///   commentpulse --url https://instagram.com/p/abc --format json -o report.json
///   commentpulse --list-platforms
///   commentpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// URL of the post whose comments should be analyzed
    #[arg(
        short,
        long,
        value_name = "URL",
        required_unless_present_any = ["init_config", "list_platforms"]
    )]
    pub url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .commentpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config file's general.output (commentpulse_report.md)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Model provider used for sentiment analysis
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<ModelProvider>,

    /// Model name (defaults depend on the provider)
    #[arg(short, long, env = "COMMENTPULSE_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Google Gemini API key
    #[arg(long, env = "GOOGLE_GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Apify API token used to scrape posts
    #[arg(long, env = "APIFY_API_TOKEN")]
    pub apify_token: Option<String>,

    /// Comments sent to the model per request
    #[arg(long, value_name = "NUM")]
    pub batch_size: Option<usize>,

    /// Maximum batches analyzed at the same time
    #[arg(long, value_name = "NUM")]
    pub max_concurrent: Option<usize>,

    /// Scraped comments beyond this count are dropped before analysis
    #[arg(long, value_name = "COUNT")]
    pub max_comments: Option<usize>,

    /// Language the model writes its justifications in
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Extra attempts for a failed model call (0 fails the batch at once)
    #[arg(long, value_name = "NUM")]
    pub analysis_retries: Option<u32>,

    /// Model request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Write a JSON session log per analyzed batch into this directory
    #[arg(long, value_name = "DIR")]
    pub session_log_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .commentpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// List supported platforms and exit
    #[arg(long)]
    pub list_platforms: bool,

    /// Exit with code 4 when any batch failed to analyze
    #[arg(long)]
    pub fail_on_partial: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The post URL, or an empty string when not given (validate first).
    pub fn post_url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config || self.list_platforms {
            return Ok(());
        }

        let url = self.post_url().trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("Post URL must start with 'http://' or 'https://'".to_string());
        }

        if let Some(ref ollama_url) = self.ollama_url {
            if !ollama_url.starts_with("http://") && !ollama_url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }

        if self.max_concurrent == Some(0) {
            return Err("Max concurrent batches must be at least 1".to_string());
        }

        if self.max_comments == Some(0) {
            return Err("Max comments must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
