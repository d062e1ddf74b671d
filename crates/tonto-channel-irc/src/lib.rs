//! IRC transport for tonto.
//!
//! Keeps one plain-text connection to a server, joins a single channel and
//! forwards that channel's lines to the bot.
//!
//! # Configuration
//!
//! ```json5
//! net: {
//!     server: "irc.libera.chat",
//!     port: 6667,
//!     nickname: "tonto_bot",
//!     channel: "#tontotest",
//! }
//! ```

pub mod connection;
pub mod message;

use std::sync::{Arc, RwLock};

use anyhow::{Context, anyhow, bail};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tonto_config::NetConfig;
use tonto_types::{ChannelStatus, InboundMessage, OutboundMessage};

use connection::{SharedStatus, set_status};

/// Replies queued while the connection is down or busy.
const OUTGOING_BUFFER: usize = 64;

/// Where to connect and who to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcConfig {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    pub realname: String,
    pub channel: String,
}

impl From<&NetConfig> for IrcConfig {
    fn from(net: &NetConfig) -> Self {
        Self {
            server: net.server.clone(),
            port: net.port,
            nickname: net.nickname.clone(),
            realname: net.realname.clone(),
            channel: net.channel.clone(),
        }
    }
}

/// IRC transport implementing `ChatTransport`.
pub struct IrcChannel {
    config: IrcConfig,
    status: SharedStatus,
    state: Mutex<IrcState>,
}

struct IrcState {
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
    outgoing: Option<mpsc::Sender<String>>,
}

impl IrcChannel {
    pub fn new(config: IrcConfig) -> Self {
        Self {
            config,
            status: Arc::new(RwLock::new(ChannelStatus::Stopped)),
            state: Mutex::new(IrcState {
                cancel: None,
                handle: None,
                outgoing: None,
            }),
        }
    }
}

#[async_trait::async_trait]
impl tonto_bot::ChatTransport for IrcChannel {
    fn name(&self) -> &str {
        "irc"
    }

    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            bail!("IRC channel {} is already running", self.config.channel);
        }

        set_status(&self.status, ChannelStatus::Starting);

        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_BUFFER);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let config = self.config.clone();
        let status = self.status.clone();

        let handle = tokio::spawn(async move {
            connection::run_connection_loop(config, sender, outgoing_rx, status, cancel_child)
                .await;
        });

        state.cancel = Some(cancel);
        state.handle = Some(handle);
        state.outgoing = Some(outgoing_tx);

        info!(
            server = %self.config.server,
            channel = %self.config.channel,
            "IRC channel started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        state.outgoing = None;

        if let Some(handle) = state.handle.take() {
            let _ = handle.await;
        }

        set_status(&self.status, ChannelStatus::Stopped);
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let outgoing = self
            .state
            .lock()
            .await
            .outgoing
            .clone()
            .context("IRC channel is not running")?;

        outgoing
            .send(message::privmsg(&message.channel, &message.text))
            .await
            .map_err(|_| anyhow!("IRC connection loop has exited"))
    }

    fn status(&self) -> ChannelStatus {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

/// Factory function: create an `IrcChannel` from the `net` config section.
pub fn create_irc_channel(net: &NetConfig) -> Arc<dyn tonto_bot::ChatTransport> {
    Arc::new(IrcChannel::new(IrcConfig::from(net)))
}
