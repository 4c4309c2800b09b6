//! Observability handle threaded through the pipeline.
//!
//! The orchestrator, dispatcher, and merger report what they do through an
//! [`Observer`] passed in by the caller. [`TracingObserver`] forwards every
//! event to `tracing`.

use crate::models::Platform;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pipeline state for one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Normalizing,
    Dispatching,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Normalizing => "normalizing",
            Stage::Dispatching => "dispatching",
            Stage::Merging => "merging",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Something worth reporting during an analysis request.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageEntered(Stage),
    ScrapeCompleted {
        platform: Platform,
        raw_comments: usize,
    },
    CommentsTruncated {
        original: usize,
        kept: usize,
    },
    CommentsNormalized {
        raw: usize,
        cleaned: usize,
        batches: usize,
    },
    BatchCompleted {
        batch_index: usize,
        sentiments: usize,
        elapsed: Duration,
    },
    BatchFailed {
        batch_index: usize,
        error: String,
    },
    DispatchCompleted {
        total_batches: usize,
        successful: usize,
    },
    ResultsMerged {
        total_batches: usize,
        successful: usize,
        failed: usize,
        sentiments: usize,
    },
    AnalysisCompleted {
        url: String,
        platform: Platform,
        total_comments: usize,
        elapsed: Duration,
    },
    AnalysisFailed {
        url: String,
        error: String,
    },
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl PipelineEvent {
    /// Short snake_case event name.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::StageEntered(_) => "stage_entered",
            PipelineEvent::ScrapeCompleted { .. } => "scraping_complete",
            PipelineEvent::CommentsTruncated { .. } => "truncated_comments",
            PipelineEvent::CommentsNormalized { .. } => "comments_normalized",
            PipelineEvent::BatchCompleted { .. } => "batch_analysis_complete",
            PipelineEvent::BatchFailed { .. } => "batch_processing_error",
            PipelineEvent::DispatchCompleted { .. } => "batch_processing_complete",
            PipelineEvent::ResultsMerged { .. } => "batch_results_merged",
            PipelineEvent::AnalysisCompleted { .. } => "analysis_complete",
            PipelineEvent::AnalysisFailed { .. } => "analysis_error",
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            PipelineEvent::CommentsTruncated { .. } => EventLevel::Warn,
            PipelineEvent::ResultsMerged { failed, .. } if *failed > 0 => EventLevel::Warn,
            PipelineEvent::BatchFailed { .. } | PipelineEvent::AnalysisFailed { .. } => {
                EventLevel::Error
            }
            _ => EventLevel::Info,
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::StageEntered(stage) => write!(f, "stage={stage}"),
            PipelineEvent::ScrapeCompleted {
                platform,
                raw_comments,
            } => write!(f, "platform={platform} comments_count={raw_comments}"),
            PipelineEvent::CommentsTruncated { original, kept } => {
                write!(f, "original_count={original} truncated_to={kept}")
            }
            PipelineEvent::CommentsNormalized {
                raw,
                cleaned,
                batches,
            } => write!(f, "raw={raw} cleaned={cleaned} batches={batches}"),
            PipelineEvent::BatchCompleted {
                batch_index,
                sentiments,
                elapsed,
            } => write!(
                f,
                "batch_number={batch_index} comments_analyzed={sentiments} processing_time={:.2}s",
                elapsed.as_secs_f64()
            ),
            PipelineEvent::BatchFailed { batch_index, error } => {
                write!(f, "batch_number={batch_index} error={error}")
            }
            PipelineEvent::DispatchCompleted {
                total_batches,
                successful,
            } => write!(
                f,
                "total_batches={total_batches} successful_batches={successful}"
            ),
            PipelineEvent::ResultsMerged {
                total_batches,
                successful,
                failed,
                sentiments,
            } => write!(
                f,
                "total_batches={total_batches} successful_batches={successful} failed_batches={failed} total_sentiments={sentiments}"
            ),
            PipelineEvent::AnalysisCompleted {
                url,
                platform,
                total_comments,
                elapsed,
            } => write!(
                f,
                "url={url} platform={platform} total_comments={total_comments} processing_time={:.2}s",
                elapsed.as_secs_f64()
            ),
            PipelineEvent::AnalysisFailed { url, error } => write!(f, "url={url} error={error}"),
        }
    }
}

/// Receives pipeline events.
pub trait Observer: Send + Sync {
    fn info(&self, event: &PipelineEvent);
    fn warn(&self, event: &PipelineEvent);
    fn error(&self, event: &PipelineEvent);

    /// Routes an event to the method matching its level.
    fn record(&self, event: PipelineEvent) {
        match event.level() {
            EventLevel::Info => self.info(&event),
            EventLevel::Warn => self.warn(&event),
            EventLevel::Error => self.error(&event),
        }
    }
}

/// Forwards events to the `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn info(&self, event: &PipelineEvent) {
        info!(event = event.name(), "{}", event);
    }

    fn warn(&self, event: &PipelineEvent) {
        warn!(event = event.name(), "{}", event);
    }

    fn error(&self, event: &PipelineEvent) {
        error!(event = event.name(), "{}", event);
    }
}

/// Observer that keeps every event, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<(EventLevel, PipelineEvent)>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn events(&self) -> Vec<(EventLevel, PipelineEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|(_, e)| match e {
                PipelineEvent::StageEntered(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    fn push(&self, level: EventLevel, event: &PipelineEvent) {
        self.events.lock().unwrap().push((level, event.clone()));
    }
}

#[cfg(test)]
impl Observer for RecordingObserver {
    fn info(&self, event: &PipelineEvent) {
        self.push(EventLevel::Info, event);
    }

    fn warn(&self, event: &PipelineEvent) {
        self.push(EventLevel::Warn, event);
    }

    fn error(&self, event: &PipelineEvent) {
        self.push(EventLevel::Error, event);
    }
}
