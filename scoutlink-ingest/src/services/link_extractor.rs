//! Link extraction from raw inbound text
//!
//! Scouts paste Transfermarkt links into chat messages surrounded by prose,
//! so the extractor has to cope with missing schemes, `www` variants, mixed
//! case and trailing punctuation. Finding no link is a normal outcome, not
//! an error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Supported profile URL shapes: any transfermarkt country domain, with or
/// without scheme and `www`.
static PROFILE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:www\.)?transfermarkt\.(?:com\.br|co\.uk|com|de|us|es|it|fr|nl|pt|at|ch)/[^\s<>]+",
    )
    .expect("profile link regex must compile")
});

/// Punctuation that commonly trails a pasted link in prose
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\'', '>'];

/// Find and normalize the first supported profile URL in `text`.
///
/// The returned URL always carries an `https://` scheme and a lowercased
/// host; the path is kept as sent. Returns `None` when the text contains
/// no recognizable link.
pub fn extract(text: &str) -> Option<String> {
    let matched = PROFILE_LINK.find(text)?.as_str();
    let trimmed = matched.trim_end_matches(TRAILING_PUNCTUATION);

    // Drop any scheme the sender included; we force https below
    let without_scheme = if let Some(rest) = strip_scheme(trimmed) {
        rest
    } else {
        trimmed
    };

    let (host, path) = match without_scheme.split_once('/') {
        Some((host, path)) => (host, path),
        None => return None,
    };

    if path.is_empty() {
        return None;
    }

    Some(format!("https://{}/{}", host.to_lowercase(), path))
}

fn strip_scheme(url: &str) -> Option<&str> {
    let lower = url.to_lowercase();
    if lower.starts_with("https://") {
        Some(&url[8..])
    } else if lower.starts_with("http://") {
        Some(&url[7..])
    } else {
        None
    }
}
