use thiserror::Error;

/// Failure to retrieve a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("too many redirects fetching {url}")]
    Redirect { url: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            FetchError::Timeout { url }
        } else if source.is_redirect() {
            FetchError::Redirect { url }
        } else {
            FetchError::Request { url, source }
        }
    }
}

/// Failure to find a title in fetched markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty document")]
    Empty,
    #[error("no <title> element found")]
    NoTitle,
}

/// Failure of the shortening service. Never fatal for a reply.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("invalid shortener endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("unexpected shortener response: {0:?}")]
    BadResponse(String),
}
