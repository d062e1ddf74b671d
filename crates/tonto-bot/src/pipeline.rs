//! Per-line message processing.
//!
//! Every channel line goes through two independent passes:
//! 1. command dispatch (`!rtfm`, `ping`, `!juanito`)
//! 2. URL scanning, where each link is fetched, titled, checked against the
//!    seen-URL store and answered on its own
//!
//! Failures never leave the smallest unit they happen in: a broken command
//! answers with its error message, a broken link answers with a filler.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tonto_links::{
    extract_urls, is_non_html, needs_shortening, parse_title, FetchError, LinkShortener,
    PageFetcher, ParseError,
};
use tonto_storage::{SeenUrlStore, StorageError};
use tonto_types::{InboundMessage, SeenUrl};

use crate::channel::ChatTransport;
use crate::commands::{parse_command, Command, GREETING, PONG};
use crate::fillers::FillerPicker;
use crate::manpage::{describe, LookupError, ManRenderer};
use crate::reply::send_reply;

/// Failure anywhere in a single URL's chain.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything the pipeline needs, built once at startup.
pub struct BotContext {
    /// The channel replies go to; lines from elsewhere are ignored.
    pub channel: String,
    pub store: SeenUrlStore,
    pub fetcher: Arc<dyn PageFetcher>,
    pub shortener: Arc<dyn LinkShortener>,
    pub man: Arc<dyn ManRenderer>,
    pub transport: Arc<dyn ChatTransport>,
    pub fillers: FillerPicker,
    /// Body bytes read per page.
    pub fetch_max_bytes: usize,
}

pub struct MessagePipeline {
    ctx: BotContext,
}

impl MessagePipeline {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    /// Consume inbound lines in arrival order until the sender side closes.
    ///
    /// A line's replies are all sent before the next line is looked at.
    pub async fn run(&self, mut inbound_rx: mpsc::Receiver<InboundMessage>) {
        info!(channel = %self.ctx.channel, "Message pipeline started");

        while let Some(inbound) = inbound_rx.recv().await {
            if inbound.channel != self.ctx.channel {
                debug!(channel = %inbound.channel, "Ignoring line from another channel");
                continue;
            }
            self.handle_line(&inbound).await;
        }

        info!("Message pipeline stopped");
    }

    /// Process one channel line: command reply first, then link replies.
    pub async fn handle_line(&self, inbound: &InboundMessage) {
        debug!(sender = %inbound.sender, line = %inbound.text, "Processing line");
        self.dispatch_command(inbound).await;
        self.scan_urls(inbound).await;
    }

    async fn dispatch_command(&self, inbound: &InboundMessage) {
        let reply = match parse_command(&inbound.text) {
            Ok(None) => return,
            Ok(Some(command)) => match self.run_command(command).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(line = %inbound.text, "Command failed: {e}");
                    e.to_string()
                }
            },
            Err(e) => {
                warn!(line = %inbound.text, "Malformed command: {e}");
                e.to_string()
            }
        };
        self.reply(&reply).await;
    }

    async fn run_command(&self, command: Command) -> Result<String, LookupError> {
        match command {
            Command::Ping => Ok(PONG.to_string()),
            Command::Greet => Ok(GREETING.to_string()),
            Command::Rtfm { section, command } => {
                describe(self.ctx.man.as_ref(), &command, section.as_deref()).await
            }
        }
    }

    async fn scan_urls(&self, inbound: &InboundMessage) {
        let chains = extract_urls(&inbound.text)
            .filter(|url| {
                if is_non_html(url) {
                    info!(url, "Not a webpage, skipping");
                    return false;
                }
                true
            })
            .map(|url| self.handle_url(inbound, url));

        join_all(chains).await;
    }

    async fn handle_url(&self, inbound: &InboundMessage, url: &str) {
        let reply = match self.describe_url(inbound, url).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url, line = %inbound.text, "Link failed: {e}");
                self.ctx.fillers.pick().to_string()
            }
        };

        if reply.is_empty() {
            debug!(url, "Page has an empty title, nothing to say");
            return;
        }
        self.reply(&reply).await;
    }

    /// Build the reply for one link:
    /// `[repost: <user>]` if seen before, `[<short url>]` if the link is
    /// long, then the page title.
    pub async fn describe_url(&self, inbound: &InboundMessage, url: &str) -> Result<String, UrlError> {
        let body = self.ctx.fetcher.fetch(url, self.ctx.fetch_max_bytes).await?;
        let title = parse_title(&body)?;

        let mut parts = Vec::new();
        if let Some(first) = self.earlier_sighting(inbound, url, &title).await? {
            parts.push(format!("[repost: {}]", first.user));
        }
        if needs_shortening(url) {
            match self.ctx.shortener.shorten(url).await {
                Ok(short) => parts.push(format!("[{short}]")),
                Err(e) => warn!(url, "Shortening failed: {e}"),
            }
        }
        if !title.is_empty() {
            parts.push(title);
        }

        Ok(parts.join(" "))
    }

    /// The earlier sighting of `url` if this is a repost. Otherwise the URL
    /// is recorded as first seen now, by the sender.
    async fn earlier_sighting(
        &self,
        inbound: &InboundMessage,
        url: &str,
        title: &str,
    ) -> Result<Option<SeenUrl>, StorageError> {
        let store = &self.ctx.store;
        if let Some(seen) = store.lookup(url).await? {
            return Ok(Some(seen));
        }

        if store
            .record_if_absent(url, title, &inbound.sender, inbound.timestamp)
            .await?
        {
            info!(url, user = %inbound.sender, "Recorded new URL");
            return Ok(None);
        }

        // Another chain recorded it between our lookup and insert.
        store.lookup(url).await
    }

    async fn reply(&self, text: &str) {
        send_reply(self.ctx.transport.as_ref(), &self.ctx.channel, text).await;
    }
}
