use serde::{Deserialize, Serialize};

// ──────────────────── Channel Types ────────────────────

/// A line said in the channel, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the line was said in (e.g. "#coderspuebla").
    pub channel: String,
    /// Nick of the user who said it.
    pub sender: String,
    /// Raw line text.
    pub text: String,
    /// Receive time (unix seconds).
    pub timestamp: i64,
}

impl InboundMessage {
    /// Build a message stamped with the current time.
    pub fn new(
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// A single reply line for the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Target channel.
    pub channel: String,
    /// Reply text. Already normalized to a single line by the sender.
    pub text: String,
}

/// Status of a chat transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Transport is not running.
    Stopped,
    /// Transport is connecting or waiting for the server welcome.
    Starting,
    /// Transport is connected and has joined the channel.
    Running,
    /// Transport encountered an error.
    Error(String),
}

// ──────────────────── Dedup Types ────────────────────

/// First sighting of a URL in the channel.
///
/// Rows are written once and never updated, so `user` and `timestamp`
/// always describe the original poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenUrl {
    pub url: String,
    /// Page title at first sighting. May be empty.
    pub title: String,
    /// Nick of the first poster.
    pub user: String,
    /// Unix seconds of the first sighting.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_new_stamps_time() {
        let before = chrono::Utc::now().timestamp();
        let msg = InboundMessage::new("#chan", "alice", "hello");
        assert_eq!(msg.channel, "#chan");
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.text, "hello");
        assert!(msg.timestamp >= before);
    }

    #[test]
    fn test_channel_status_serde() {
        let status = ChannelStatus::Running;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"running\"");

        let err = ChannelStatus::Error("connection lost".into());
        let json = serde_json::to_string(&err).unwrap();
        let parsed: ChannelStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ChannelStatus::Error("connection lost".into()));
    }
}
