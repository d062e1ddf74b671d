//! tonto-bot: the channel assistant.
//!
//! Provides:
//! - `ChatTransport`, the capability a chat connection implements
//! - command routing (`!rtfm`, `ping`, `!juanito`) and manual page lookup
//! - the per-line message pipeline: link titles, repost notices, short links
//! - reply shaping (single line, 140 characters)

pub mod channel;
pub mod commands;
pub mod fillers;
pub mod manpage;
pub mod pipeline;
pub mod reply;

use tokio::sync::mpsc;
use tracing::info;

pub use channel::ChatTransport;
pub use fillers::FillerPicker;
pub use manpage::{ManCommand, ManRenderer};
pub use pipeline::{BotContext, MessagePipeline};

/// Inbound lines buffered between the transport and the pipeline.
pub const INBOUND_BUFFER: usize = 256;

/// Run the bot until the transport closes its inbound stream or the process
/// is interrupted, then stop the transport.
///
/// This is the main entry point once a `BotContext` has been built.
pub async fn start_bot(pipeline: &MessagePipeline) -> anyhow::Result<()> {
    let ctx = pipeline.context();
    let transport = ctx.transport.clone();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

    transport.start(inbound_tx).await?;
    info!(transport = transport.name(), channel = %ctx.channel, "Bot started");

    tokio::select! {
        _ = pipeline.run(inbound_rx) => info!("Inbound stream closed"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    transport.stop().await
}
