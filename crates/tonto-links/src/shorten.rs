//! Link shortening through an external service.

use async_trait::async_trait;
use url::Url;

use crate::error::ShortenError;
use crate::fetch::PageFetcher;

/// URLs longer than this many characters get a shortened form in replies.
pub const SHORTEN_THRESHOLD: usize = 60;

/// Upper bound on the shortener's response body.
const MAX_RESPONSE_BYTES: usize = 1024;

/// Whether a reply for `url` should carry a shortened link.
pub fn needs_shortening(url: &str) -> bool {
    url.chars().count() > SHORTEN_THRESHOLD
}

/// Something that turns a long URL into a short one.
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError>;
}

/// TinyURL-style shortener: `GET <endpoint>?url=<long url>` answers with the
/// short URL as plain text.
pub struct TinyUrl<F> {
    fetcher: F,
    endpoint: Url,
}

impl<F: PageFetcher> TinyUrl<F> {
    pub fn new(fetcher: F, endpoint: &str) -> Result<Self, ShortenError> {
        Ok(Self {
            fetcher,
            endpoint: Url::parse(endpoint)?,
        })
    }
}

#[async_trait]
impl<F: PageFetcher> LinkShortener for TinyUrl<F> {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        let mut request = self.endpoint.clone();
        request.query_pairs_mut().append_pair("url", url);

        let body = self.fetcher.fetch(request.as_str(), MAX_RESPONSE_BYTES).await?;
        let short = String::from_utf8_lossy(&body).trim().to_string();

        if !short.starts_with("http") || short.contains(char::is_whitespace) {
            return Err(ShortenError::BadResponse(short));
        }
        Ok(short)
    }
}
