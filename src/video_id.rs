use regex::Regex;
use std::sync::LazyLock;

/// `?v=<id>` or `/<id>`, optionally followed by a query string
static VIDEO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[?&].*)?$").expect("video id pattern is valid")
});

/// Extract the YouTube video ID from common URL formats.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERN
        .captures(url.trim())
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}
