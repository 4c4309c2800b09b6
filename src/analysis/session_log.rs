//! Per-batch session logs.
//!
//! When enabled, every successfully analyzed batch leaves a pretty-printed
//! JSON file with the exact model input and the parsed answer.

use crate::models::{Batch, CommentSentiment, Platform, PostContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Characters of the URL's last segment kept in file names.
const POST_ID_LEN: usize = 10;

#[derive(Debug, Serialize)]
struct SessionComment<'a> {
    original_comment: &'a str,
    original_index: usize,
    platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SessionRecord<'a> {
    timestamp: DateTime<Utc>,
    url: &'a str,
    platform: Platform,
    batch_index: usize,
    processing_time: f64,
    context: &'a PostContext,
    system_prompt: &'a str,
    prompt: &'a str,
    comments: Vec<SessionComment<'a>>,
    analysis_results: &'a [CommentSentiment],
}

/// One finished analysis call, as written to disk.
pub struct Session<'a> {
    pub url: &'a str,
    pub context: &'a PostContext,
    pub batch: &'a Batch,
    pub system_prompt: &'a str,
    pub prompt: &'a str,
    pub sentiments: &'a [CommentSentiment],
    pub elapsed: Duration,
}

/// Writes session files into one directory.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    dir: PathBuf,
}

impl SessionLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a session file, logging a warning instead of failing.
    pub async fn record(&self, session: &Session<'_>) {
        match self.write(session).await {
            Ok(path) => debug!(path = %path.display(), "Session log written"),
            Err(e) => warn!(
                batch_index = session.batch.index,
                error = %format!("{e:#}"),
                "Failed to write session log"
            ),
        }
    }

    async fn write(&self, session: &Session<'_>) -> Result<PathBuf> {
        let now = Utc::now();
        let platform = session.context.platform;
        let file_name = format!(
            "{}_{}_{}_b{}.log",
            platform,
            post_id(session.url),
            now.format("%Y%m%d_%H%M%S"),
            session.batch.index
        );
        let path = self.dir.join(file_name);

        let record = SessionRecord {
            timestamp: now,
            url: session.url,
            platform,
            batch_index: session.batch.index,
            processing_time: session.elapsed.as_secs_f64(),
            context: session.context,
            system_prompt: session.system_prompt,
            prompt: session.prompt,
            comments: session
                .batch
                .comments
                .iter()
                .map(|c| SessionComment {
                    original_comment: &c.text,
                    original_index: c.original_index,
                    platform: c.platform,
                    timestamp: c.timestamp.as_deref(),
                })
                .collect(),
            analysis_results: session.sentiments,
        };
        let json = serde_json::to_string_pretty(&record)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}

/// Short, file-name-safe id taken from the URL's last path segment.
fn post_id(url: &str) -> String {
    let segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let id: String = segment
        .chars()
        .take(POST_ID_LEN)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    if id.is_empty() {
        "post".to_string()
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedComment, SentimentCategory};

    #[test]
    fn test_post_id() {
        assert_eq!(post_id("https://youtube.com/watch?v=dQw4w9WgXcQ"), "watch_v_dQ");
        assert_eq!(post_id("https://x.com/user/status/12345/"), "12345");
        assert_eq!(post_id(""), "post");
    }

    #[tokio::test]
    async fn test_record_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("sessions"));

        let context = PostContext::new(Platform::Instagram);
        let batch = Batch {
            index: 2,
            comments: vec![CleanedComment {
                text: "so pretty".to_string(),
                platform: Platform::Instagram,
                original_index: 7,
                timestamp: Some("2024-05-01".to_string()),
            }],
        };
        let sentiments = vec![CommentSentiment {
            comment: "so pretty".to_string(),
            sentiment: SentimentCategory::AppreciativePraising,
            justification: "compliment".to_string(),
        }];

        logger
            .record(&Session {
                url: "https://instagram.com/p/Cabc123",
                context: &context,
                batch: &batch,
                system_prompt: "system text",
                prompt: "prompt text",
                sentiments: &sentiments,
                elapsed: Duration::from_millis(1500),
            })
            .await;

        let entries: Vec<_> = std::fs::read_dir(logger.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);

        let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("instagram_Cabc123_"));
        assert!(name.ends_with("_b2.log"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&entries[0]).unwrap()).unwrap();
        assert_eq!(json["batch_index"], 2);
        assert_eq!(json["system_prompt"], "system text");
        assert_eq!(json["prompt"], "prompt text");
        assert_eq!(json["comments"][0]["original_index"], 7);
        assert_eq!(json["analysis_results"][0]["Sentiment"], "Appreciative/Praising");
    }

    #[tokio::test]
    async fn test_unwritable_directory_only_warns() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot be used as the log directory.
        let logger = SessionLogger::new(file.path());
        let context = PostContext::new(Platform::Youtube);
        let batch = Batch {
            index: 0,
            comments: Vec::new(),
        };

        logger
            .record(&Session {
                url: "https://youtu.be/x",
                context: &context,
                batch: &batch,
                system_prompt: "",
                prompt: "",
                sentiments: &[],
                elapsed: Duration::ZERO,
            })
            .await;
    }
}
