//! Model-backed batch analyzer.

use super::prompt::{build_batch_prompt, parse_response, SYSTEM_PROMPT};
use super::session_log::{Session, SessionLogger};
use super::{AnalyzerFactory, BatchAnalyzer};
use crate::error::{AnalysisError, ModelError};
use crate::llm::ModelClient;
use crate::models::{Batch, BatchResult, PostContext};
use crate::retry::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Classifies the comments of one post through a language model.
pub struct SentimentAnalyzer {
    client: Arc<dyn ModelClient>,
    post_url: String,
    language: String,
    retry: RetryPolicy,
    session_log: Option<SessionLogger>,
}

impl SentimentAnalyzer {
    pub fn new(
        client: Arc<dyn ModelClient>,
        post_url: impl Into<String>,
        language: impl Into<String>,
        retry: RetryPolicy,
        session_log: Option<SessionLogger>,
    ) -> Self {
        Self {
            client,
            post_url: post_url.into(),
            language: language.into(),
            retry,
            session_log,
        }
    }
}

#[async_trait]
impl BatchAnalyzer for SentimentAnalyzer {
    async fn analyze(
        &self,
        context: &PostContext,
        batch: &Batch,
    ) -> Result<BatchResult, AnalysisError> {
        let started = Instant::now();
        let prompt = build_batch_prompt(context, batch, &self.language);

        debug!(
            batch_index = batch.index,
            comments = batch.comments.len(),
            model = self.client.model_name(),
            "Analyzing batch"
        );

        let reply = retry_with_backoff(&self.retry, "sentiment analysis", is_retriable, || {
            self.client.complete(SYSTEM_PROMPT, &prompt)
        })
        .await?;

        let sentiments = parse_response(&reply)?;
        let elapsed = started.elapsed();

        if let Some(logger) = &self.session_log {
            logger
                .record(&Session {
                    url: &self.post_url,
                    context,
                    batch,
                    system_prompt: SYSTEM_PROMPT,
                    prompt: &prompt,
                    sentiments: &sentiments,
                    elapsed,
                })
                .await;
        }

        debug!(
            batch_index = batch.index,
            comments_analyzed = sentiments.len(),
            processing_time = elapsed.as_secs_f64(),
            "Batch analysis complete"
        );

        Ok(BatchResult::succeeded(batch.index, sentiments, elapsed))
    }
}

/// Transport trouble and overloaded providers are worth another call.
fn is_retriable(err: &ModelError) -> bool {
    match err {
        ModelError::Timeout(_)
        | ModelError::Connect(_)
        | ModelError::Network(_)
        | ModelError::EmptyResponse => true,
        ModelError::Api { status, .. } => *status == 429 || *status >= 500,
        ModelError::Parse(_) | ModelError::MissingApiKey => false,
    }
}

/// Shares one model client across analyzers bound to different posts.
pub struct SentimentAnalyzerFactory {
    client: Arc<dyn ModelClient>,
    language: String,
    retry: RetryPolicy,
    session_log: Option<SessionLogger>,
}

impl SentimentAnalyzerFactory {
    pub fn new(
        client: Arc<dyn ModelClient>,
        language: impl Into<String>,
        retry: RetryPolicy,
        session_log: Option<SessionLogger>,
    ) -> Self {
        Self {
            client,
            language: language.into(),
            retry,
            session_log,
        }
    }
}

impl AnalyzerFactory for SentimentAnalyzerFactory {
    fn bind(&self, post_url: &str) -> Arc<dyn BatchAnalyzer> {
        Arc::new(SentimentAnalyzer::new(
            self.client.clone(),
            post_url,
            self.language.clone(),
            self.retry,
            self.session_log.clone(),
        ))
    }
}
