//! Error types for each pipeline seam.
//!
//! Request-terminal failures surface as [`PipelineError`]. Per-batch
//! failures are [`AnalysisError`]s and never leave the dispatcher.

use thiserror::Error;

/// Errors from the scraping provider.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Scraper API token is not configured")]
    MissingToken,
}

/// Errors from the language-model provider.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to model provider at {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Network(String),

    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    Parse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model API key is not configured")]
    MissingApiKey,
}

/// Why a single batch could not be analyzed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("No JSON found in response")]
    NoJson,

    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),

    #[error("Unknown sentiment category: {0:?}")]
    UnknownSentiment(String),
}

/// Terminal failure of a whole analysis request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Scraping failed: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether the caller supplied bad input, as opposed to an upstream or internal fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidUrl(_) | PipelineError::UnsupportedPlatform(_)
        )
    }

    /// Whether the upstream data source was unavailable.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, PipelineError::Scrape(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_classification() {
        assert!(PipelineError::UnsupportedPlatform("tiktok.com".into()).is_client_error());
        assert!(PipelineError::InvalidUrl("nope".into()).is_client_error());

        let scrape = PipelineError::from(ScrapeError::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(scrape.is_upstream_error());
        assert!(!scrape.is_client_error());

        let internal = PipelineError::Internal("oops".into());
        assert!(!internal.is_client_error());
        assert!(!internal.is_upstream_error());
    }

    #[test]
    fn test_model_error_is_transparent_in_analysis_error() {
        let err = AnalysisError::from(ModelError::EmptyResponse);
        assert_eq!(err.to_string(), "Model returned an empty response");
    }
}
