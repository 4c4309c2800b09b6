//! Result merging and summary statistics.
//!
//! This module folds per-batch results into one sentiment list and derives
//! the counts and category listings shown in the report.

use crate::models::{
    BatchResult, CategoryListing, CommentSentiment, SentimentCategory, SentimentSummary,
};
use crate::observe::{Observer, PipelineEvent};

/// Concatenate the sentiments of every successful batch, in input order.
///
/// Errored results contribute nothing. Emits a merge event, at warning
/// level when some batches failed.
pub fn merge(results: &[BatchResult], observer: &dyn Observer) -> Vec<CommentSentiment> {
    let sentiments: Vec<CommentSentiment> = results
        .iter()
        .filter(|r| r.is_success())
        .flat_map(|r| r.sentiments.iter().cloned())
        .collect();

    let successful = results.iter().filter(|r| r.is_success()).count();
    observer.record(PipelineEvent::ResultsMerged {
        total_batches: results.len(),
        successful,
        failed: results.len() - successful,
        sentiments: sentiments.len(),
    });

    sentiments
}

/// Count comments per category.
pub fn summarize(sentiments: &[CommentSentiment]) -> SentimentSummary {
    let mut summary = SentimentSummary::default();
    for s in sentiments {
        summary.record(s.sentiment);
    }
    summary
}

/// Group comment texts by category, returning `(top, all)`.
///
/// `top` keeps the first `top_n` comments of each category in merge order.
/// Categories without comments get no key in either listing.
pub fn group_for_display(
    sentiments: &[CommentSentiment],
    top_n: usize,
) -> (CategoryListing, CategoryListing) {
    let mut all = CategoryListing::new();
    for s in sentiments {
        all.entry(s.sentiment).or_default().push(s.comment.clone());
    }

    let top = all
        .iter()
        .map(|(category, comments)| {
            let kept: Vec<String> = comments.iter().take(top_n).cloned().collect();
            (*category, kept)
        })
        .collect();

    (top, all)
}

/// Categories with at least one comment, most frequent first.
pub fn ranked_categories(summary: &SentimentSummary) -> Vec<(SentimentCategory, usize)> {
    let mut ranked: Vec<_> = SentimentCategory::ALL
        .into_iter()
        .map(|c| (c, summary.count(c)))
        .filter(|(_, count)| *count > 0)
        .collect();

    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{EventLevel, RecordingObserver};
    use std::time::Duration;

    fn sentiment(comment: &str, category: SentimentCategory) -> CommentSentiment {
        CommentSentiment {
            comment: comment.to_string(),
            sentiment: category,
            justification: String::new(),
        }
    }

    fn ok_result(index: usize, comments: &[&str]) -> BatchResult {
        BatchResult::succeeded(
            index,
            comments
                .iter()
                .map(|c| sentiment(c, SentimentCategory::InformativeNeutral))
                .collect(),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_merge_skips_failed_batches() {
        let results = vec![
            ok_result(0, &["a", "b"]),
            BatchResult::failed(1, Duration::from_millis(3), "timeout".to_string()),
            ok_result(2, &["c"]),
        ];
        let observer = RecordingObserver::default();

        let merged = merge(&results, &observer);

        let texts: Vec<_> = merged.iter().map(|s| s.comment.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EventLevel::Warn);
        assert_eq!(
            events[0].1,
            PipelineEvent::ResultsMerged {
                total_batches: 3,
                successful: 2,
                failed: 1,
                sentiments: 3,
            }
        );
    }

    #[test]
    fn test_merge_keeps_input_order() {
        let results = vec![ok_result(2, &["late"]), ok_result(0, &["early"])];
        let merged = merge(&results, &RecordingObserver::default());
        assert_eq!(merged[0].comment, "late");
        assert_eq!(merged[1].comment, "early");
    }

    #[test]
    fn test_summary_counts_sum_to_total() {
        let sentiments = vec![
            sentiment("great", SentimentCategory::AppreciativePraising),
            sentiment("awful", SentimentCategory::AngryHostile),
            sentiment("sure, genius", SentimentCategory::SarcasticIronic),
            sentiment("thanks", SentimentCategory::AppreciativePraising),
            sentiment("it opens at 9", SentimentCategory::InformativeNeutral),
        ];

        let summary = summarize(&sentiments);

        assert_eq!(summary.total_comments, sentiments.len());
        let sum: usize = SentimentCategory::ALL
            .iter()
            .map(|c| summary.count(*c))
            .sum();
        assert_eq!(sum, summary.total_comments);
        assert_eq!(summary.appreciative_praising, 2);
    }

    #[test]
    fn test_top_listing_is_capped() {
        let sentiments: Vec<_> = (0..15)
            .map(|i| sentiment(&format!("angry {i}"), SentimentCategory::AngryHostile))
            .collect();

        let (top, all) = group_for_display(&sentiments, 10);

        assert_eq!(top[&SentimentCategory::AngryHostile].len(), 10);
        assert_eq!(all[&SentimentCategory::AngryHostile].len(), 15);
        assert_eq!(top[&SentimentCategory::AngryHostile][0], "angry 0");
        assert_eq!(top[&SentimentCategory::AngryHostile][9], "angry 9");
    }

    #[test]
    fn test_absent_categories_have_no_key() {
        let sentiments = vec![sentiment("hm", SentimentCategory::CriticalDisapproving)];

        let (top, all) = group_for_display(&sentiments, 10);

        assert_eq!(top.len(), 1);
        assert_eq!(all.len(), 1);
        assert!(!all.contains_key(&SentimentCategory::AngryHostile));
    }

    #[test]
    fn test_empty_input_yields_empty_listings() {
        let (top, all) = group_for_display(&[], 10);
        assert!(top.is_empty());
        assert!(all.is_empty());
        assert_eq!(summarize(&[]).total_comments, 0);
    }

    #[test]
    fn test_ranked_categories() {
        let sentiments = vec![
            sentiment("a", SentimentCategory::InformativeNeutral),
            sentiment("b", SentimentCategory::AngryHostile),
            sentiment("c", SentimentCategory::AngryHostile),
        ];

        let ranked = ranked_categories(&summarize(&sentiments));

        assert_eq!(
            ranked,
            vec![
                (SentimentCategory::AngryHostile, 2),
                (SentimentCategory::InformativeNeutral, 1),
            ]
        );
    }
}
