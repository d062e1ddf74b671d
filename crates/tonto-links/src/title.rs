//! `<title>` extraction from fetched markup.

use scraper::{ElementRef, Html};

use crate::error::ParseError;

/// Return the trimmed text of the first `<title>` element in `bytes`.
///
/// The body may be cut off mid-document by the fetch cap, so parsing is
/// lenient: unclosed tags and invalid UTF-8 are accepted.
pub fn parse_title(bytes: &[u8]) -> Result<String, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let text = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&text);

    let title = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .ok_or(ParseError::NoTitle)?;

    Ok(title.text().collect::<String>().trim().to_string())
}
