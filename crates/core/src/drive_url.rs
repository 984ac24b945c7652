//! Google Drive URL parsing.
//!
//! Drive links come in several shapes; the identifier is the only part the API
//! cares about:
//! - `https://drive.google.com/file/d/<id>/view?usp=sharing`
//! - `https://drive.google.com/drive/folders/<id>`
//! - `https://drive.google.com/open?id=<id>`

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::warn;

/// Matchers tried in order; the first capture wins.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/file/d/([a-zA-Z0-9_-]+)",
        r"/drive/folders/([a-zA-Z0-9_-]+)",
        r"id=([a-zA-Z0-9_-]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Extracts the file or folder identifier from a Drive URL.
///
/// Returns `None` when no known pattern matches.
pub fn extract_id(url: &str) -> Option<String> {
    let id = ID_PATTERNS.iter().find_map(|re| {
        re.captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });

    if id.is_none() {
        warn!("Could not extract ID from URL: {}", url);
    }

    id
}
