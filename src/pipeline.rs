//! Analysis orchestration.
//!
//! One [`Orchestrator::run`] call takes a post URL through detection,
//! scraping, normalization, dispatch, and merging, and returns the
//! assembled [`AnalysisReport`]. Only URL and scraping failures end a
//! request; batch failures are folded into the report.

use crate::analysis::dispatcher::panic_message;
use crate::analysis::merger::{group_for_display, merge, summarize};
use crate::analysis::{dispatch, AnalyzerFactory};
use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::models::AnalysisReport;
use crate::normalize;
use crate::observe::{Observer, PipelineEvent, Stage};
use crate::platform::detect_platform;
use crate::scraper::Scraper;
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Runs analysis requests end to end.
pub struct Orchestrator {
    scraper: Arc<dyn Scraper>,
    analyzers: Arc<dyn AnalyzerFactory>,
    observer: Arc<dyn Observer>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        analyzers: Arc<dyn AnalyzerFactory>,
        observer: Arc<dyn Observer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            scraper,
            analyzers,
            observer,
            settings,
        }
    }

    /// Analyze the comments of the post at `url`.
    pub async fn run(&self, url: &str) -> Result<AnalysisReport, PipelineError> {
        let result = self.execute(url).await;

        if let Err(e) = &result {
            self.observer.record(PipelineEvent::StageEntered(Stage::Failed));
            self.observer.record(PipelineEvent::AnalysisFailed {
                url: url.to_string(),
                error: e.to_string(),
            });
        }

        result
    }

    async fn execute(&self, url: &str) -> Result<AnalysisReport, PipelineError> {
        let observer = self.observer.as_ref();
        let platform = detect_platform(url)?;

        observer.record(PipelineEvent::StageEntered(Stage::Fetching));
        let started = Instant::now();
        let scraped = AssertUnwindSafe(self.scraper.scrape(url, platform))
            .catch_unwind()
            .await
            .map_err(|payload| {
                PipelineError::Internal(format!(
                    "scraper panicked: {}",
                    panic_message(payload.as_ref())
                ))
            })??;
        observer.record(PipelineEvent::ScrapeCompleted {
            platform,
            raw_comments: scraped.comments.len(),
        });

        observer.record(PipelineEvent::StageEntered(Stage::Normalizing));
        let mut raw = scraped.comments;
        if raw.len() > self.settings.global_max_comments {
            observer.record(PipelineEvent::CommentsTruncated {
                original: raw.len(),
                kept: self.settings.global_max_comments,
            });
            raw.truncate(self.settings.global_max_comments);
        }
        let cleaned = normalize::process(&raw, platform);
        let batches = normalize::chunk(&cleaned, self.settings.batch_size);
        observer.record(PipelineEvent::CommentsNormalized {
            raw: raw.len(),
            cleaned: cleaned.len(),
            batches: batches.len(),
        });

        observer.record(PipelineEvent::StageEntered(Stage::Dispatching));
        let batches_processed = batches.len();
        let analyzer = self.analyzers.bind(url);
        let mut results = dispatch(
            batches,
            analyzer.as_ref(),
            &scraped.context,
            self.settings.max_concurrent_batches,
            observer,
        )
        .await;

        observer.record(PipelineEvent::StageEntered(Stage::Merging));
        // Completion order is arbitrary; merge in batch order so listings follow the post.
        results.sort_by_key(|r| r.batch_index);
        let batches_failed = results.iter().filter(|r| !r.is_success()).count();
        let sentiments = merge(&results, observer);
        let summary = summarize(&sentiments);
        let (top_comments, all_comments) =
            group_for_display(&sentiments, self.settings.top_comments);

        let elapsed = started.elapsed();
        let report = AnalysisReport {
            status: "completed".to_string(),
            timestamp: Utc::now(),
            post_url: url.to_string(),
            platform,
            post_context: scraped.context,
            summary,
            top_comments,
            all_comments,
            processing_time: elapsed.as_secs_f64(),
            batches_processed,
            batches_failed,
        };

        observer.record(PipelineEvent::StageEntered(Stage::Done));
        observer.record(PipelineEvent::AnalysisCompleted {
            url: url.to_string(),
            platform,
            total_comments: report.summary.total_comments,
            elapsed,
        });

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{StubAnalyzer, StubFactory};
    use crate::error::ScrapeError;
    use crate::models::{Platform, PostContext, RawCommentRecord, SentimentCategory};
    use crate::observe::RecordingObserver;
    use crate::scraper::ScrapedPost;
    use async_trait::async_trait;
    use serde_json::json;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `count` YouTube-shaped comments, or a scripted error.
    struct FakeScraper {
        count: usize,
        fail: bool,
        panic: bool,
        calls: AtomicUsize,
    }

    impl FakeScraper {
        fn with_comments(count: usize) -> Self {
            Self {
                count,
                fail: false,
                panic: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                count: 0,
                fail: true,
                panic: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn panicking() -> Self {
            Self {
                panic: true,
                ..Self::with_comments(0)
            }
        }
    }

    #[async_trait]
    impl Scraper for FakeScraper {
        async fn scrape(&self, _url: &str, platform: Platform) -> Result<ScrapedPost, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("unexpected actor payload");
            }
            if self.fail {
                return Err(ScrapeError::Api {
                    status: 502,
                    message: "actor crashed".to_string(),
                });
            }

            let comments = (0..self.count)
                .map(|i| {
                    let value = json!({"comment": format!("comment number {i}"), "date": "1 day ago"});
                    match value {
                        serde_json::Value::Object(map) => map,
                        _ => RawCommentRecord::new(),
                    }
                })
                .collect();

            Ok(ScrapedPost {
                context: PostContext::new(platform),
                comments,
            })
        }
    }

    fn settings(batch_size: usize, max_concurrent: usize) -> PipelineSettings {
        PipelineSettings {
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            max_concurrent_batches: NonZeroUsize::new(max_concurrent).unwrap(),
            global_max_comments: 100,
            top_comments: 10,
        }
    }

    fn build(
        scraper: FakeScraper,
        analyzer: Arc<StubAnalyzer>,
        settings: PipelineSettings,
    ) -> (Orchestrator, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator = Orchestrator::new(
            Arc::new(scraper),
            Arc::new(StubFactory(analyzer)),
            observer.clone(),
            settings,
        );
        (orchestrator, observer)
    }

    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=abc123";

    #[tokio::test]
    async fn test_end_to_end_report() {
        let analyzer = Arc::new(StubAnalyzer::default());
        let (orchestrator, observer) =
            build(FakeScraper::with_comments(25), analyzer.clone(), settings(10, 2));

        let report = orchestrator.run(VIDEO_URL).await.unwrap();

        assert_eq!(report.status, "completed");
        assert_eq!(report.platform, Platform::Youtube);
        assert_eq!(report.post_url, VIDEO_URL);
        assert_eq!(report.batches_processed, 3);
        assert_eq!(report.batches_failed, 0);
        assert_eq!(report.summary.total_comments, 25);
        assert_eq!(report.summary.informative_neutral, 25);
        assert_eq!(
            report.all_comments[&SentimentCategory::InformativeNeutral].len(),
            25
        );
        assert_eq!(
            report.top_comments[&SentimentCategory::InformativeNeutral].len(),
            10
        );
        assert_eq!(
            report.all_comments[&SentimentCategory::InformativeNeutral][0],
            "comment number 0"
        );
        assert!(analyzer.peak_in_flight() <= 2);

        assert_eq!(
            observer.stages(),
            vec![
                Stage::Fetching,
                Stage::Normalizing,
                Stage::Dispatching,
                Stage::Merging,
                Stage::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_is_excluded() {
        let analyzer = Arc::new(StubAnalyzer::failing(&[1]));
        let (orchestrator, _) =
            build(FakeScraper::with_comments(25), analyzer, settings(10, 2));

        let report = orchestrator.run(VIDEO_URL).await.unwrap();

        assert_eq!(report.summary.total_comments, 15);
        assert_eq!(report.batches_processed, 3);
        assert_eq!(report.batches_failed, 1);
        assert!(report.is_partial());

        // Batch 0 then batch 2: comments 10..19 are missing.
        let all = &report.all_comments[&SentimentCategory::InformativeNeutral];
        assert_eq!(all[9], "comment number 9");
        assert_eq!(all[10], "comment number 20");
    }

    #[tokio::test]
    async fn test_all_batches_failing_still_completes() {
        let analyzer = Arc::new(StubAnalyzer::failing(&[0, 1]));
        let (orchestrator, _) =
            build(FakeScraper::with_comments(12), analyzer, settings(10, 5));

        let report = orchestrator.run(VIDEO_URL).await.unwrap();

        assert_eq!(report.summary.total_comments, 0);
        assert_eq!(report.batches_processed, 2);
        assert_eq!(report.batches_failed, 2);
        assert!(report.all_comments.is_empty());
    }

    #[tokio::test]
    async fn test_raw_comments_are_truncated() {
        let analyzer = Arc::new(StubAnalyzer::default());
        let (orchestrator, observer) =
            build(FakeScraper::with_comments(150), analyzer, settings(10, 5));

        let report = orchestrator.run(VIDEO_URL).await.unwrap();

        assert_eq!(report.summary.total_comments, 100);
        assert_eq!(report.batches_processed, 10);
        assert!(observer.events().iter().any(|(_, e)| matches!(
            e,
            PipelineEvent::CommentsTruncated {
                original: 150,
                kept: 100
            }
        )));
    }

    #[tokio::test]
    async fn test_no_comments_yields_empty_report() {
        let analyzer = Arc::new(StubAnalyzer::default());
        let (orchestrator, _) =
            build(FakeScraper::with_comments(0), analyzer.clone(), settings(10, 5));

        let report = orchestrator.run(VIDEO_URL).await.unwrap();

        assert_eq!(report.summary.total_comments, 0);
        assert_eq!(report.batches_processed, 0);
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_platform_never_scrapes() {
        let scraper = FakeScraper::with_comments(5);
        let analyzer = Arc::new(StubAnalyzer::default());
        let observer = Arc::new(RecordingObserver::default());
        let scraper = Arc::new(scraper);
        let orchestrator = Orchestrator::new(
            scraper.clone(),
            Arc::new(StubFactory(analyzer)),
            observer.clone(),
            settings(10, 5),
        );

        let err = orchestrator
            .run("https://www.tiktok.com/@user/video/1")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedPlatform(_)));
        assert!(err.is_client_error());
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 0);
        assert_eq!(observer.stages(), vec![Stage::Failed]);
    }

    #[tokio::test]
    async fn test_scrape_failure_is_terminal() {
        let analyzer = Arc::new(StubAnalyzer::default());
        let (orchestrator, observer) =
            build(FakeScraper::failing(), analyzer.clone(), settings(10, 5));

        let err = orchestrator.run(VIDEO_URL).await.unwrap_err();

        assert!(err.is_upstream_error());
        assert_eq!(analyzer.calls(), 0);
        assert_eq!(observer.stages(), vec![Stage::Fetching, Stage::Failed]);
        assert!(observer
            .events()
            .iter()
            .any(|(_, e)| matches!(e, PipelineEvent::AnalysisFailed { .. })));
    }

    #[tokio::test]
    async fn test_scraper_panic_is_internal_error() {
        let analyzer = Arc::new(StubAnalyzer::default());
        let (orchestrator, observer) =
            build(FakeScraper::panicking(), analyzer.clone(), settings(10, 5));

        let err = orchestrator.run(VIDEO_URL).await.unwrap_err();

        assert!(
            matches!(err, PipelineError::Internal(ref msg) if msg.contains("unexpected actor payload"))
        );
        assert!(!err.is_client_error());
        assert!(!err.is_upstream_error());
        assert_eq!(analyzer.calls(), 0);
        assert_eq!(observer.stages(), vec![Stage::Fetching, Stage::Failed]);
    }
}
