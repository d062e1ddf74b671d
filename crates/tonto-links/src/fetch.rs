//! Bounded page fetching.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::error::FetchError;

/// Default cap on the number of body bytes read from a page.
pub const DEFAULT_FETCH_MAX: usize = 20 * 1024;

/// Browser identification sent with every request. Some sites refuse
/// clients that do not look like a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; U; Linux i686) Gecko/20071127 Firefox/2.0.0.11";

/// Something that can GET a URL and return the start of its body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, returning at most `max_bytes` of the body.
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, FetchError>;
}

/// `reqwest`-backed fetcher with a request timeout and a redirect limit.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = read_capped(resp, max_bytes)
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        tracing::debug!(url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Read the response body, stopping once `max_bytes` have been collected.
///
/// The rest of the body is never downloaded.
async fn read_capped(resp: reqwest::Response, max_bytes: usize) -> Result<Bytes, reqwest::Error> {
    let mut body = BytesMut::with_capacity(max_bytes.min(16 * 1024));
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = max_bytes - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}
