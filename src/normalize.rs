//! Comment normalization and batching.
//!
//! Raw provider records are reduced to [`CleanedComment`]s here and
//! nowhere else; nothing downstream sees the provider's record shape.

use crate::models::{Batch, CleanedComment, Platform, RawCommentRecord};
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Minimum number of characters a cleaned comment must have.
pub const MIN_COMMENT_LENGTH: usize = 3;

/// Fields tried in order when the platform field holds no text.
const FALLBACK_TEXT_FIELDS: [&str; 4] = ["comment", "text", "content", "message"];

/// Fields that may carry a timestamp, in priority order.
const TIMESTAMP_FIELDS: [&str; 3] = ["date", "publishedTimeText", "created_at"];

/// Field holding the comment text for each platform's provider records.
fn platform_text_field(platform: Platform) -> &'static str {
    match platform {
        Platform::Youtube => "comment",
        Platform::Facebook | Platform::Twitter | Platform::Instagram => "text",
    }
}

/// Extract the comment text from a raw record.
pub fn extract(record: &RawCommentRecord, platform: Platform) -> Option<&str> {
    std::iter::once(platform_text_field(platform))
        .chain(FALLBACK_TEXT_FIELDS)
        .find_map(|field| record.get(field).and_then(|v| v.as_str()))
}

/// Remove URLs, collapse whitespace runs to one space, and trim.
pub fn clean(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, "");
    WHITESPACE_RE
        .replace_all(&without_urls, " ")
        .trim()
        .to_string()
}

/// Whether cleaned text is long enough to analyze.
pub fn validate(text: &str) -> bool {
    text.trim().chars().count() >= MIN_COMMENT_LENGTH
}

fn extract_timestamp(record: &RawCommentRecord) -> Option<String> {
    TIMESTAMP_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn raw records into cleaned comments.
///
/// Records without text or too short after cleaning are skipped. Survivors
/// keep the index they had in `records`, so indices may have gaps.
pub fn process(records: &[RawCommentRecord], platform: Platform) -> Vec<CleanedComment> {
    records
        .iter()
        .enumerate()
        .filter_map(|(original_index, record)| {
            let text = clean(extract(record, platform)?);
            if !validate(&text) {
                return None;
            }
            Some(CleanedComment {
                text,
                platform,
                original_index,
                timestamp: extract_timestamp(record),
            })
        })
        .collect()
}

/// Split comments into contiguous batches of at most `size`.
///
/// Ordinals start at 0. Concatenating the batches gives back `comments`.
pub fn chunk(comments: &[CleanedComment], size: NonZeroUsize) -> Vec<Batch> {
    comments
        .chunks(size.get())
        .enumerate()
        .map(|(index, slice)| Batch {
            index,
            comments: slice.to_vec(),
        })
        .collect()
}
