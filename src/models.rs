//! Data models for the comment sentiment pipeline.
//!
//! This module contains the core data structures passed between the
//! normalizer, dispatcher, merger, and report stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A raw comment record as returned by the scraping provider.
///
/// The shape is platform-specific and only the normalizer reads it.
pub type RawCommentRecord = serde_json::Map<String, serde_json::Value>;

/// Supported social media platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Facebook,
    Twitter,
    Instagram,
}

impl Platform {
    /// All supported platforms, in detection order.
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Facebook,
        Platform::Twitter,
        Platform::Instagram,
    ];

    /// Returns the lowercase tag used in records and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment category assigned to a comment.
///
/// Exactly six categories exist; their external string form is the
/// label used by the model prompt and by the report listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentCategory {
    #[serde(rename = "Supportive/Empathetic")]
    SupportiveEmpathetic,
    #[serde(rename = "Critical/Disapproving")]
    CriticalDisapproving,
    #[serde(rename = "Sarcastic/Ironic")]
    SarcasticIronic,
    #[serde(rename = "Informative/Neutral")]
    InformativeNeutral,
    #[serde(rename = "Appreciative/Praising")]
    AppreciativePraising,
    #[serde(rename = "Angry/Hostile")]
    AngryHostile,
}

impl SentimentCategory {
    pub const ALL: [SentimentCategory; 6] = [
        SentimentCategory::SupportiveEmpathetic,
        SentimentCategory::CriticalDisapproving,
        SentimentCategory::SarcasticIronic,
        SentimentCategory::InformativeNeutral,
        SentimentCategory::AppreciativePraising,
        SentimentCategory::AngryHostile,
    ];

    /// Returns the external label, e.g. `"Informative/Neutral"`.
    pub fn label(&self) -> &'static str {
        match self {
            SentimentCategory::SupportiveEmpathetic => "Supportive/Empathetic",
            SentimentCategory::CriticalDisapproving => "Critical/Disapproving",
            SentimentCategory::SarcasticIronic => "Sarcastic/Ironic",
            SentimentCategory::InformativeNeutral => "Informative/Neutral",
            SentimentCategory::AppreciativePraising => "Appreciative/Praising",
            SentimentCategory::AngryHostile => "Angry/Hostile",
        }
    }

    /// Parses an external label. Matching is exact after trimming.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Returns an emoji representation of the category.
    pub fn emoji(&self) -> &'static str {
        match self {
            SentimentCategory::SupportiveEmpathetic => "🤝",
            SentimentCategory::CriticalDisapproving => "👎",
            SentimentCategory::SarcasticIronic => "🙃",
            SentimentCategory::InformativeNeutral => "ℹ️",
            SentimentCategory::AppreciativePraising => "👏",
            SentimentCategory::AngryHostile => "😠",
        }
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated, normalized comment ready for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedComment {
    /// Cleaned comment text (URL-stripped, whitespace-collapsed, ≥ 3 chars).
    pub text: String,
    /// Platform the comment was scraped from.
    pub platform: Platform,
    /// Position of the record in the scraped sequence. May have gaps.
    pub original_index: usize,
    /// Timestamp string as reported by the provider, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// An order-preserving group of comments submitted to one analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Ordinal of the batch, starting at 0.
    pub index: usize,
    /// Comments in their original relative order.
    pub comments: Vec<CleanedComment>,
}

/// One analyzed comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSentiment {
    /// The comment text as echoed back by the model.
    #[serde(rename = "Comment")]
    pub comment: String,
    /// Assigned category.
    #[serde(rename = "Sentiment")]
    pub sentiment: SentimentCategory,
    /// The model's reasoning for the category.
    #[serde(rename = "Justification", default)]
    pub justification: String,
}

/// Outcome of processing one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Ordinal of the batch this result belongs to.
    pub batch_index: usize,
    /// Sentiments produced; empty on failure.
    pub sentiments: Vec<CommentSentiment>,
    /// Wall-clock time spent on the batch.
    pub processing_time: Duration,
    /// Failure description, set only when the batch failed.
    pub error: Option<String>,
}

impl BatchResult {
    /// Creates a successful result.
    pub fn succeeded(
        batch_index: usize,
        sentiments: Vec<CommentSentiment>,
        processing_time: Duration,
    ) -> Self {
        Self {
            batch_index,
            sentiments,
            processing_time,
            error: None,
        }
    }

    /// Creates a failed result with no sentiments.
    pub fn failed(batch_index: usize, processing_time: Duration, error: String) -> Self {
        Self {
            batch_index,
            sentiments: Vec::new(),
            processing_time,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Platform-specific description of the post being analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostContext {
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl PostContext {
    /// Creates an empty context for a platform.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            title: None,
            description: None,
            captions: None,
            text: None,
            media: None,
            images: None,
            alt: None,
            caption: None,
        }
    }
}

/// Sentiment counts across all successfully analyzed comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSummary {
    #[serde(rename = "totalComments")]
    pub total_comments: usize,
    pub supportive_empathetic: usize,
    pub critical_disapproving: usize,
    pub angry_hostile: usize,
    pub sarcastic_ironic: usize,
    pub informative_neutral: usize,
    pub appreciative_praising: usize,
}

impl SentimentSummary {
    /// Counts one comment of the given category.
    pub fn record(&mut self, category: SentimentCategory) {
        self.total_comments += 1;
        *self.slot_mut(category) += 1;
    }

    /// Returns the count for a category.
    pub fn count(&self, category: SentimentCategory) -> usize {
        match category {
            SentimentCategory::SupportiveEmpathetic => self.supportive_empathetic,
            SentimentCategory::CriticalDisapproving => self.critical_disapproving,
            SentimentCategory::SarcasticIronic => self.sarcastic_ironic,
            SentimentCategory::InformativeNeutral => self.informative_neutral,
            SentimentCategory::AppreciativePraising => self.appreciative_praising,
            SentimentCategory::AngryHostile => self.angry_hostile,
        }
    }

    /// Share of a category in percent; 0 when there are no comments.
    pub fn percentage(&self, category: SentimentCategory) -> f64 {
        if self.total_comments == 0 {
            return 0.0;
        }
        self.count(category) as f64 * 100.0 / self.total_comments as f64
    }

    fn slot_mut(&mut self, category: SentimentCategory) -> &mut usize {
        match category {
            SentimentCategory::SupportiveEmpathetic => &mut self.supportive_empathetic,
            SentimentCategory::CriticalDisapproving => &mut self.critical_disapproving,
            SentimentCategory::SarcasticIronic => &mut self.sarcastic_ironic,
            SentimentCategory::InformativeNeutral => &mut self.informative_neutral,
            SentimentCategory::AppreciativePraising => &mut self.appreciative_praising,
            SentimentCategory::AngryHostile => &mut self.angry_hostile,
        }
    }
}

/// Comment texts grouped by category. Categories with no comments have no key.
pub type CategoryListing = BTreeMap<SentimentCategory, Vec<String>>;

/// The final analysis result for one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Always `"completed"`; failed requests produce no report.
    pub status: String,
    /// When the report was assembled.
    pub timestamp: DateTime<Utc>,
    pub post_url: String,
    pub platform: Platform,
    pub post_context: PostContext,
    pub summary: SentimentSummary,
    /// At most N comments per category, in merge order.
    pub top_comments: CategoryListing,
    /// Every analyzed comment per category.
    pub all_comments: CategoryListing,
    /// Seconds elapsed from the start of scraping to assembly.
    pub processing_time: f64,
    /// Number of batches submitted, successful or not.
    pub batches_processed: usize,
    /// Number of batches whose analysis failed.
    pub batches_failed: usize,
}

impl AnalysisReport {
    /// Whether some batches failed and the summary covers only part of the comments.
    pub fn is_partial(&self) -> bool {
        self.batches_failed > 0
    }
}
