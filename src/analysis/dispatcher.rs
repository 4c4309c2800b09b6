//! Bounded-concurrency batch dispatch.

use super::BatchAnalyzer;
use crate::models::{Batch, BatchResult, PostContext};
use crate::observe::{Observer, PipelineEvent};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// Analyze every batch with at most `max_concurrent` calls in flight.
///
/// Results come back in completion order, one per batch. A batch whose
/// analysis fails or panics yields an errored result; the others keep
/// running.
pub async fn dispatch(
    batches: Vec<Batch>,
    analyzer: &dyn BatchAnalyzer,
    context: &PostContext,
    max_concurrent: NonZeroUsize,
    observer: &dyn Observer,
) -> Vec<BatchResult> {
    let total_batches = batches.len();

    let results: Vec<BatchResult> = stream::iter(batches)
        .map(|batch| async move {
            let result = analyze_contained(analyzer, context, &batch).await;
            match &result.error {
                None => observer.record(PipelineEvent::BatchCompleted {
                    batch_index: result.batch_index,
                    sentiments: result.sentiments.len(),
                    elapsed: result.processing_time,
                }),
                Some(error) => observer.record(PipelineEvent::BatchFailed {
                    batch_index: result.batch_index,
                    error: error.clone(),
                }),
            }
            result
        })
        .buffer_unordered(max_concurrent.get())
        .collect()
        .await;

    observer.record(PipelineEvent::DispatchCompleted {
        total_batches,
        successful: results.iter().filter(|r| r.is_success()).count(),
    });

    results
}

/// Run one analysis, turning errors and panics into an errored result.
async fn analyze_contained(
    analyzer: &dyn BatchAnalyzer,
    context: &PostContext,
    batch: &Batch,
) -> BatchResult {
    let started = Instant::now();

    match AssertUnwindSafe(analyzer.analyze(context, batch))
        .catch_unwind()
        .await
    {
        Ok(Ok(mut result)) => {
            // The analyzer owns the timing, but the ordinal always comes from the batch.
            result.batch_index = batch.index;
            result
        }
        Ok(Err(e)) => BatchResult::failed(batch.index, started.elapsed(), e.to_string()),
        Err(payload) => BatchResult::failed(
            batch.index,
            started.elapsed(),
            format!("analysis panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
