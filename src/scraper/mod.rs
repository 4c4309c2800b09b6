//! Scraping provider seam.
//!
//! The orchestrator only knows the [`Scraper`] trait; [`ApifyScraper`] is
//! the implementation backed by Apify actors.

pub mod apify;

pub use apify::ApifyScraper;

use crate::error::ScrapeError;
use crate::models::{Platform, PostContext, RawCommentRecord};
use async_trait::async_trait;

/// Post context and raw comments for one post.
#[derive(Debug, Clone)]
pub struct ScrapedPost {
    pub context: PostContext,
    pub comments: Vec<RawCommentRecord>,
}

/// Fetches a post and its comments from an external provider.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str, platform: Platform) -> Result<ScrapedPost, ScrapeError>;
}
