//! Platform detection from post URLs.

use crate::config::PlatformLimits;
use crate::error::PipelineError;
use crate::models::Platform;
use url::Url;

/// Domain fragments that identify each platform, checked in order.
const DOMAIN_PATTERNS: &[(Platform, &[&str])] = &[
    (Platform::Youtube, &["youtube.com", "youtu.be"]),
    (Platform::Facebook, &["facebook.com", "fb.com"]),
    (Platform::Twitter, &["twitter.com", "x.com"]),
    (Platform::Instagram, &["instagram.com"]),
];

/// Resolve the platform a post URL belongs to.
///
/// Matching is done on the lowercased host. URLs that do not parse or
/// have no host are rejected as invalid; parseable URLs on any other
/// domain are rejected as unsupported.
pub fn detect_platform(url: &str) -> Result<Platform, PipelineError> {
    let parsed = Url::parse(url.trim()).map_err(|e| PipelineError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PipelineError::InvalidUrl(format!(
            "{url}: scheme must be http or https"
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| PipelineError::InvalidUrl(format!("{url}: missing host")))?
        .to_lowercase();

    DOMAIN_PATTERNS
        .iter()
        .find(|(_, domains)| domains.iter().any(|d| host_matches(&host, d)))
        .map(|(platform, _)| *platform)
        .ok_or(PipelineError::UnsupportedPlatform(host))
}

/// True when `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Example URL shown in the platform listing.
pub fn example_url(platform: Platform) -> &'static str {
    match platform {
        Platform::Youtube => "https://www.youtube.com/watch?v=xxxxx",
        Platform::Facebook => "https://www.facebook.com/user/posts/xxxxx",
        Platform::Twitter => "https://twitter.com/user/status/xxxxx",
        Platform::Instagram => "https://www.instagram.com/p/xxxxx",
    }
}

/// One `--list-platforms` line, including the configured comment limit.
pub fn describe_platform(platform: Platform, limits: &PlatformLimits) -> String {
    format!(
        "{:<10} up to {:>4} comments  e.g. {}",
        platform.as_str(),
        limits.for_platform(platform),
        example_url(platform)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_platform_shows_configured_limit() {
        let limits = PlatformLimits {
            twitter: 250,
            ..PlatformLimits::default()
        };

        let line = describe_platform(Platform::Twitter, &limits);
        assert!(line.starts_with("twitter"));
        assert!(line.contains("up to  250 comments"));
        assert!(line.ends_with("https://twitter.com/user/status/xxxxx"));

        let line = describe_platform(Platform::Youtube, &limits);
        assert!(line.contains("up to  100 comments"));
    }

    #[test]
    fn test_detect_known_platforms() {
        let cases = [
            ("https://www.youtube.com/watch?v=abc", Platform::Youtube),
            ("https://youtu.be/abc", Platform::Youtube),
            ("https://m.facebook.com/page/posts/1", Platform::Facebook),
            ("https://fb.com/123", Platform::Facebook),
            ("https://twitter.com/u/status/1", Platform::Twitter),
            ("https://x.com/u/status/1", Platform::Twitter),
            ("https://www.instagram.com/p/xyz", Platform::Instagram),
            ("HTTPS://WWW.YOUTUBE.COM/watch?v=abc", Platform::Youtube),
        ];

        for (url, expected) in cases {
            assert_eq!(detect_platform(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn test_unsupported_domain() {
        let err = detect_platform("https://www.tiktok.com/@u/video/1").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedPlatform(ref h) if h == "www.tiktok.com"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_lookalike_domain_is_not_matched() {
        assert!(matches!(
            detect_platform("https://notx.com/status/1"),
            Err(PipelineError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            detect_platform("not a url"),
            Err(PipelineError::InvalidUrl(_))
        ));
        assert!(matches!(
            detect_platform("ftp://youtube.com/file"),
            Err(PipelineError::InvalidUrl(_))
        ));
    }
}
