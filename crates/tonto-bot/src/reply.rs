//! Outbound message shaping.

use tracing::{info, warn};

use tonto_types::OutboundMessage;

use crate::channel::ChatTransport;

/// Hard cap on reply length, in characters.
pub const MAX_REPLY_CHARS: usize = 140;

/// Flatten `text` to one line and cut it to [`MAX_REPLY_CHARS`].
///
/// Line breaks would split the reply into several protocol lines, so each
/// one becomes a space. The cut is not word aware.
pub fn normalize_reply(text: &str) -> String {
    let line: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    match line.char_indices().nth(MAX_REPLY_CHARS) {
        Some((cut, _)) => line[..cut].to_string(),
        None => line,
    }
}

/// Normalize `text` and hand it to the transport.
///
/// Delivery failures are logged and dropped.
pub async fn send_reply(transport: &dyn ChatTransport, channel: &str, text: &str) {
    let msg = normalize_reply(text);
    info!(channel, msg = %msg, "Sending reply");
    if msg.len() < text.len() {
        info!(original = %text, "Reply truncated");
    }

    let outbound = OutboundMessage {
        channel: channel.to_string(),
        text: msg,
    };
    if let Err(e) = transport.send(outbound).await {
        warn!(channel, "Failed to deliver reply: {e}");
    }
}
