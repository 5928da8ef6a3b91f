use serde::{Deserialize, Serialize};

use crate::models::{Direction, Message};

/// Events pushed to live WebSocket subscribers, one per newly persisted
/// message.
///
/// Wire shape is flat: `{"type":"message_received","sender_id":"+1555...",
/// "message":"hi","timestamp":1720000000.5}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// An inbound message was absorbed from the foreign log.
    MessageReceived {
        sender_id: String,
        message: String,
        timestamp: f64,
    },

    /// An outbound message was delivered through the bridge.
    MessageSent {
        sender_id: String,
        message: String,
        timestamp: f64,
    },
}

impl BridgeEvent {
    /// Derive the broadcast event for a freshly persisted message.
    pub fn from_message(message: &Message) -> Self {
        match message.direction {
            Direction::Inbound => Self::MessageReceived {
                sender_id: message.sender_id.clone(),
                message: message.text.clone(),
                timestamp: message.timestamp,
            },
            Direction::Outbound => Self::MessageSent {
                sender_id: message.sender_id.clone(),
                message: message.text.clone(),
                timestamp: message.timestamp,
            },
        }
    }

    pub fn sender_id(&self) -> &str {
        match self {
            Self::MessageReceived { sender_id, .. } | Self::MessageSent { sender_id, .. } => {
                sender_id
            }
        }
    }
}
