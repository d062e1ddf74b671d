//! Chat transport capability.
//!
//! The bot never manages a connection itself. It is handed something that
//! delivers channel lines and accepts replies:
//!
//! ```text
//! Chat network
//!     ↓ (protocol-specific)
//! ChatTransport::start() spawns listener
//!     ↓ (InboundMessage via mpsc)
//! MessagePipeline::run()
//!     ↓ (reply text)
//! ChatTransport::send(OutboundMessage)
//!     ↓ (protocol-specific)
//! Chat network
//! ```

use tokio::sync::mpsc;

use tonto_types::{ChannelStatus, InboundMessage, OutboundMessage};

/// A connection to a single chat channel.
///
/// Use `&self` for all methods; implementations should use interior
/// mutability for any mutable state.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport kind, for logging (e.g. "irc").
    fn name(&self) -> &str;

    /// Connect and start forwarding channel lines to `sender`.
    ///
    /// Implementations spawn a background task and return once it runs.
    /// The transport joins the channel itself once the server accepts it.
    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Disconnect and stop the listener.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Send one line to the channel.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Returns the current status of this transport.
    fn status(&self) -> ChannelStatus;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;

    /// Transport double: replays a script of inbound lines on start and
    /// records everything sent.
    pub(crate) struct MockChannel {
        state: AtomicU8, // 0=stopped, 2=running
        script: Vec<InboundMessage>,
        pub(crate) sent: tokio::sync::Mutex<Vec<OutboundMessage>>,
    }

    impl MockChannel {
        pub(crate) fn new() -> Self {
            Self::with_script(Vec::new())
        }

        pub(crate) fn with_script(script: Vec<InboundMessage>) -> Self {
            Self {
                state: AtomicU8::new(0),
                script,
                sent: tokio::sync::Mutex::new(Vec::new()),
            }
        }

        pub(crate) async fn sent_texts(&self) -> Vec<String> {
            self.sent.lock().await.iter().map(|m| m.text.clone()).collect()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
            self.state.store(2, Ordering::SeqCst);
            let script = self.script.clone();
            tokio::spawn(async move {
                for message in script {
                    if sender.send(message).await.is_err() {
                        return;
                    }
                }
            });
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.state.store(0, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
            self.sent.lock().await.push(message);
            Ok(())
        }

        fn status(&self) -> ChannelStatus {
            match self.state.load(Ordering::SeqCst) {
                0 => ChannelStatus::Stopped,
                2 => ChannelStatus::Running,
                _ => ChannelStatus::Error("unknown".into()),
            }
        }
    }
}
