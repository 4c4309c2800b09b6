//! Apify-backed scraper.
//!
//! Each platform uses one actor for the post itself and one for its
//! comments, called through the synchronous dataset endpoint.

use super::{ScrapedPost, Scraper};
use crate::config::{PlatformLimits, ScraperConfig};
use crate::error::ScrapeError;
use crate::models::{Platform, PostContext, RawCommentRecord};
use crate::retry::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const YOUTUBE_TRANSCRIPTS: &str = "karamelo~youtube-transcripts";
const YOUTUBE_COMMENTS: &str = "streamers~youtube-comments-scraper";
const FACEBOOK_POSTS: &str = "apify~facebook-posts-scraper";
const FACEBOOK_COMMENTS: &str = "apify~facebook-comments-scraper";
const TWITTER_POST: &str = "apidojo~twitter-scraper-lite";
const TWITTER_REPLIES: &str = "kaitoeasyapi~twitter-reply";
const INSTAGRAM_POST: &str = "apify~instagram-post-scraper";
const INSTAGRAM_COMMENTS: &str = "apify~instagram-scraper";

/// Posts requested when looking up a Facebook post's own content.
const FACEBOOK_POST_RESULTS: u32 = 20;

pub struct ApifyScraper {
    client: reqwest::Client,
    base_url: String,
    token: String,
    limits: PlatformLimits,
    retry: RetryPolicy,
}

impl ApifyScraper {
    pub fn new(
        base_url: &str,
        token: String,
        timeout_seconds: u64,
        limits: PlatformLimits,
        retry: RetryPolicy,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            limits,
            retry,
        })
    }

    /// Build a scraper from configuration. Fails when no token is set.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let token = config
            .api_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(ScrapeError::MissingToken)?;

        Self::new(
            &config.base_url,
            token,
            config.timeout_seconds,
            config.max_comments.clone(),
            config.retry_policy(),
        )
    }

    /// Run an actor synchronously and return its dataset items, retrying
    /// transient failures.
    async fn run_actor(&self, actor: &str, payload: Value) -> Result<Vec<Value>, ScrapeError> {
        retry_with_backoff(&self.retry, actor, is_retriable, || {
            self.run_actor_once(actor, &payload)
        })
        .await
    }

    async fn run_actor_once(&self, actor: &str, payload: &Value) -> Result<Vec<Value>, ScrapeError> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, actor
        );
        debug!(actor, "Running Apify actor");

        let resp = self
            .client
            .post(&url)
            .query(&[("token", self.token.as_str())])
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = resp.json().await?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(ScrapeError::Parse(format!(
                "expected a JSON array of dataset items from {actor}, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn scrape_youtube(&self, url: &str) -> Result<ScrapedPost, ScrapeError> {
        let (transcripts, comments) = tokio::try_join!(
            self.run_actor(
                YOUTUBE_TRANSCRIPTS,
                json!({
                    "urls": [url],
                    "descriptionBoolean": true,
                    "channelNameBoolean": true
                }),
            ),
            self.run_actor(
                YOUTUBE_COMMENTS,
                json!({
                    "commentsSortBy": "0",
                    "maxComments": self.limits.for_platform(Platform::Youtube),
                    "startUrls": [{"url": url, "method": "GET"}]
                }),
            )
        )?;

        let info = first_object(&transcripts);
        let mut context = PostContext::new(Platform::Youtube);
        context.title = string_field(info, "title");
        context.description = string_field(info, "description");
        context.captions = Some(transcript_text(info));

        Ok(ScrapedPost {
            context,
            comments: into_records(comments),
        })
    }

    async fn scrape_facebook(&self, url: &str) -> Result<ScrapedPost, ScrapeError> {
        let (posts, comments) = tokio::try_join!(
            self.run_actor(
                FACEBOOK_POSTS,
                json!({
                    "captionText": true,
                    "resultsLimit": FACEBOOK_POST_RESULTS,
                    "startUrls": [{"url": url}]
                }),
            ),
            self.run_actor(
                FACEBOOK_COMMENTS,
                json!({
                    "includeNestedComments": false,
                    "resultsLimit": self.limits.for_platform(Platform::Facebook),
                    "startUrls": [{"url": url}]
                }),
            )
        )?;

        let info = first_object(&posts);
        let mut context = PostContext::new(Platform::Facebook);
        context.text = string_field(info, "text");
        context.media = Some(array_field(info, "media"));

        Ok(ScrapedPost {
            context,
            comments: into_records(comments),
        })
    }

    async fn scrape_twitter(&self, url: &str) -> Result<ScrapedPost, ScrapeError> {
        let posts = self
            .run_actor(TWITTER_POST, json!({"maxItems": 1, "startUrls": [url]}))
            .await?;
        let post = first_object(&posts);

        // Replies are looked up by conversation id; without one there is nothing to fetch.
        let Some(post_id) = id_field(post) else {
            let mut context = PostContext::new(Platform::Twitter);
            context.text = string_field(post, "fullText");
            return Ok(ScrapedPost {
                context,
                comments: Vec::new(),
            });
        };

        let replies = self
            .run_actor(
                TWITTER_REPLIES,
                json!({
                    "conversation_ids": [post_id],
                    "max_items_per_conversation": self.limits.for_platform(Platform::Twitter)
                }),
            )
            .await?;

        // The first reply item is the main tweet in full detail.
        let main = replies
            .first()
            .and_then(Value::as_object)
            .or(post);
        let mut context = PostContext::new(Platform::Twitter);
        context.text = string_field(main, "fullText").or_else(|| string_field(main, "text"));
        context.media = Some(array_field(main, "media"));

        Ok(ScrapedPost {
            context,
            comments: into_records(replies.into_iter().skip(1).collect()),
        })
    }

    async fn scrape_instagram(&self, url: &str) -> Result<ScrapedPost, ScrapeError> {
        let (posts, comments) = tokio::try_join!(
            self.run_actor(
                INSTAGRAM_POST,
                json!({
                    "username": [url],
                    "skipPinnedPosts": false
                }),
            ),
            self.run_actor(
                INSTAGRAM_COMMENTS,
                json!({
                    "directUrls": [url],
                    "resultsType": "comments",
                    "resultsLimit": self.limits.for_platform(Platform::Instagram)
                }),
            )
        )?;

        let info = first_object(&posts);
        let mut context = PostContext::new(Platform::Instagram);
        context.images = Some(
            array_field(info, "images")
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        );
        context.alt = string_field(info, "alt");
        context.caption = string_field(info, "caption");

        Ok(ScrapedPost {
            context,
            comments: into_records(comments),
        })
    }
}

#[async_trait]
impl Scraper for ApifyScraper {
    async fn scrape(&self, url: &str, platform: Platform) -> Result<ScrapedPost, ScrapeError> {
        info!(platform = %platform, url, "Starting scrape");

        let scraped = match platform {
            Platform::Youtube => self.scrape_youtube(url).await?,
            Platform::Facebook => self.scrape_facebook(url).await?,
            Platform::Twitter => self.scrape_twitter(url).await?,
            Platform::Instagram => self.scrape_instagram(url).await?,
        };

        info!(
            platform = %platform,
            url,
            comments_count = scraped.comments.len(),
            "Scraping complete"
        );
        Ok(scraped)
    }
}

/// Network failures, rate limiting, and 5xx responses are worth another try.
fn is_retriable(err: &ScrapeError) -> bool {
    match err {
        ScrapeError::Network(e) => !e.is_decode() && !e.is_builder(),
        ScrapeError::Api { status, .. } => *status == 429 || *status >= 500,
        ScrapeError::Parse(_) | ScrapeError::MissingToken => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn first_object(items: &[Value]) -> Option<&RawCommentRecord> {
    items.first().and_then(Value::as_object)
}

fn string_field(record: Option<&RawCommentRecord>, field: &str) -> Option<String> {
    record?
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn array_field(record: Option<&RawCommentRecord>, field: &str) -> Vec<Value> {
    record
        .and_then(|r| r.get(field))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Tweet ids arrive as strings or numbers depending on the actor version.
fn id_field(record: Option<&RawCommentRecord>) -> Option<String> {
    match record?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Transcript as plain text. Some actor versions return a list of segments.
fn transcript_text(record: Option<&RawCommentRecord>) -> String {
    match record.and_then(|r| r.get("transcript")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(segments)) => segments
            .iter()
            .filter_map(|s| s.as_str().or_else(|| s.get("text").and_then(Value::as_str)))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Keep only object items; anything else cannot hold a comment.
fn into_records(items: Vec<Value>) -> Vec<RawCommentRecord> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}
