//! Messages the dashboards send over the socket.

use serde::{Deserialize, Serialize};

/// Channel subscription sent right after the socket opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribeMessage {
    /// Always "subscribe"
    #[serde(rename = "type")]
    pub kind: String,

    /// Channels of interest, e.g. ["tables", "orders"]
    pub channels: Vec<String>,
}

impl SubscribeMessage {
    /// Create a subscription for the given channels
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: "subscribe".to_string(),
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the subscription names no channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Anything the client may put on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OutboundMessage {
    Subscribe(SubscribeMessage),
    Raw(serde_json::Value),
}

impl From<SubscribeMessage> for OutboundMessage {
    fn from(message: SubscribeMessage) -> Self {
        Self::Subscribe(message)
    }
}

impl From<serde_json::Value> for OutboundMessage {
    fn from(value: serde_json::Value) -> Self {
        Self::Raw(value)
    }
}
