//! URL extraction from chat lines.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .expect("URL pattern is valid")
});

/// Suffixes of links that are never HTML pages.
const NON_HTML_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".pdf"];

/// Yield every URL in `text`, left to right.
///
/// Matches are exact substrings of the input: trailing punctuation that the
/// URL grammar allows (`,`, `)`, `.` ...) is kept as-is.
pub fn extract_urls(text: &str) -> impl Iterator<Item = &str> + '_ {
    URL_RE.find_iter(text).map(|m| m.as_str())
}

/// Whether `url` points at a known binary file type and can be skipped
/// without fetching it.
pub fn is_non_html(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    NON_HTML_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
