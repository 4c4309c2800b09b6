//! Batch analysis.
//!
//! The dispatcher fans batches out to a [`BatchAnalyzer`] with bounded
//! concurrency, and the merger folds the results into report listings.
//! [`analyzer::SentimentAnalyzer`] is the model-backed analyzer used in production.

pub mod analyzer;
pub mod dispatcher;
pub mod merger;
pub mod prompt;
pub mod session_log;

pub use analyzer::SentimentAnalyzerFactory;
pub use dispatcher::dispatch;

use crate::error::AnalysisError;
use crate::models::{Batch, BatchResult, PostContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Analyzes one batch of comments.
///
/// An `Err` marks only this batch as failed; the dispatcher turns it into an
/// errored [`BatchResult`] and keeps going.
#[async_trait]
pub trait BatchAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        context: &PostContext,
        batch: &Batch,
    ) -> Result<BatchResult, AnalysisError>;
}

/// Creates analyzers bound to a single post.
pub trait AnalyzerFactory: Send + Sync {
    fn bind(&self, post_url: &str) -> Arc<dyn BatchAnalyzer>;
}
