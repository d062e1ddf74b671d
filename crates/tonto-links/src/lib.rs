//! tonto-links: everything the bot does with a URL before replying.
//!
//! Extraction from chat text, bounded page fetch, `<title>` parsing and
//! link shortening.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod shorten;
pub mod title;

pub use error::{FetchError, ParseError, ShortenError};
pub use extract::{extract_urls, is_non_html};
pub use fetch::{HttpFetcher, PageFetcher, DEFAULT_FETCH_MAX, USER_AGENT};
pub use shorten::{needs_shortening, LinkShortener, TinyUrl, SHORTEN_THRESHOLD};
pub use title::parse_title;
