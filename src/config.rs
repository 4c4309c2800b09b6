//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.commentpulse.toml` files.

use crate::models::Platform;
use crate::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".commentpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Scraping provider settings.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Batch processing settings.
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "commentpulse_report.md".to_string()
}

/// Which language-model service analyzes the batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Ollama,
    Gemini,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model provider.
    #[serde(default)]
    pub provider: ModelProvider,

    /// Model name. Defaults depend on the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Gemini API base URL.
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    /// Gemini API key. Usually supplied through `GOOGLE_GEMINI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            name: None,
            ollama_url: default_ollama_url(),
            gemini_url: default_gemini_url(),
            api_key: None,
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

impl ModelConfig {
    /// The configured model name, or the provider's default.
    pub fn effective_model(&self) -> String {
        match (&self.name, self.provider) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, ModelProvider::Ollama) => "llama3.2:latest".to_string(),
            (_, ModelProvider::Gemini) => "gemini-2.5-flash-lite".to_string(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_model_timeout() -> u64 {
    120
}

/// Per-platform comment limits requested from the scraping provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformLimits {
    #[serde(default = "default_platform_limit")]
    pub youtube: u32,
    #[serde(default = "default_platform_limit")]
    pub facebook: u32,
    #[serde(default = "default_platform_limit")]
    pub twitter: u32,
    #[serde(default = "default_platform_limit")]
    pub instagram: u32,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self {
            youtube: default_platform_limit(),
            facebook: default_platform_limit(),
            twitter: default_platform_limit(),
            instagram: default_platform_limit(),
        }
    }
}

impl PlatformLimits {
    pub fn for_platform(&self, platform: Platform) -> u32 {
        match platform {
            Platform::Youtube => self.youtube,
            Platform::Facebook => self.facebook,
            Platform::Twitter => self.twitter,
            Platform::Instagram => self.instagram,
        }
    }
}

fn default_platform_limit() -> u32 {
    100
}

/// Scraping provider (Apify) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Apify API base URL.
    #[serde(default = "default_apify_url")]
    pub base_url: String,

    /// Apify API token. Usually supplied through `APIFY_API_TOKEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_scraper_timeout")]
    pub timeout_seconds: u64,

    /// Total attempts per provider call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Maximum delay between retries, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Comments requested per platform.
    #[serde(default)]
    pub max_comments: PlatformLimits,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_apify_url(),
            api_token: None,
            timeout_seconds: default_scraper_timeout(),
            max_attempts: default_max_attempts(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_comments: PlatformLimits::default(),
        }
    }
}

impl ScraperConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.backoff_initial_ms),
            max_backoff: Duration::from_millis(self.backoff_max_ms),
        }
    }
}

fn default_apify_url() -> String {
    "https://api.apify.com/v2".to_string()
}

fn default_scraper_timeout() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_initial_ms() -> u64 {
    4_000
}

fn default_backoff_max_ms() -> u64 {
    10_000
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Comments per analysis batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum batches analyzed at the same time.
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Scraped comments beyond this count are dropped before analysis.
    #[serde(default = "default_global_max_comments")]
    pub global_max_comments: usize,

    /// Language the model writes its justifications in.
    #[serde(default = "default_language")]
    pub language: String,

    /// Extra attempts for a failed model call. 0 fails the batch immediately.
    #[serde(default)]
    pub analysis_retries: u32,

    /// Comments kept per category in the top listing.
    #[serde(default = "default_top_comments")]
    pub top_comments: usize,

    /// Directory for per-batch session logs. Disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_log_dir: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            global_max_comments: default_global_max_comments(),
            language: default_language(),
            analysis_retries: 0,
            top_comments: default_top_comments(),
            session_log_dir: None,
        }
    }
}

/// Validated numeric limits for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub batch_size: NonZeroUsize,
    pub max_concurrent_batches: NonZeroUsize,
    pub global_max_comments: usize,
    pub top_comments: usize,
}

impl ProcessingConfig {
    /// Check the limits and convert them for the orchestrator.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let Some(batch_size) = NonZeroUsize::new(self.batch_size) else {
            bail!("processing.batch_size must be at least 1");
        };
        let Some(max_concurrent_batches) = NonZeroUsize::new(self.max_concurrent_batches) else {
            bail!("processing.max_concurrent_batches must be at least 1");
        };
        if self.global_max_comments == 0 {
            bail!("processing.global_max_comments must be at least 1");
        }

        Ok(PipelineSettings {
            batch_size,
            max_concurrent_batches,
            global_max_comments: self.global_max_comments,
            top_comments: self.top_comments,
        })
    }

    /// Retry policy for model calls, with a short fixed back-off.
    pub fn analysis_retry_policy(&self) -> RetryPolicy {
        if self.analysis_retries == 0 {
            return RetryPolicy::no_retry();
        }
        RetryPolicy {
            max_attempts: self.analysis_retries.saturating_add(1),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(4),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_max_concurrent_batches() -> usize {
    5
}

fn default_global_max_comments() -> usize {
    100
}

fn default_language() -> String {
    "English".to_string()
}

fn default_top_comments() -> usize {
    10
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the post context section.
    #[serde(default = "default_true")]
    pub include_context: bool,

    /// Include the full per-category comment listing.
    #[serde(default = "default_true")]
    pub include_all_comments: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_context: true,
            include_all_comments: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = Some(model.clone());
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(ref key) = args.gemini_api_key {
            self.model.api_key = Some(key.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref token) = args.apify_token {
            self.scraper.api_token = Some(token.clone());
        }

        if let Some(batch_size) = args.batch_size {
            self.processing.batch_size = batch_size;
        }
        if let Some(max_concurrent) = args.max_concurrent {
            self.processing.max_concurrent_batches = max_concurrent;
        }
        if let Some(max_comments) = args.max_comments {
            self.processing.global_max_comments = max_comments;
        }
        if let Some(ref language) = args.language {
            self.processing.language = language.clone();
        }
        if let Some(retries) = args.analysis_retries {
            self.processing.analysis_retries = retries;
        }
        if let Some(ref dir) = args.session_log_dir {
            self.processing.session_log_dir = Some(dir.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
