use serde::{Deserialize, Serialize};

use crate::models::Message;

// -- Messages --

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub sender_id: String,
    pub messages: Vec<MessageView>,
}

/// One message as rendered for the web frontend.  `date` is the ISO-8601
/// form of `timestamp`.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub text: String,
    pub is_from_user: bool,
    pub timestamp: f64,
    pub date: String,
}

impl MessageView {
    pub fn from_message(message: &Message) -> Self {
        let date = chrono::DateTime::from_timestamp_micros((message.timestamp * 1e6) as i64)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        Self {
            text: message.text.clone(),
            is_from_user: message.is_from_user(),
            timestamp: message.timestamp,
            date,
        }
    }
}

// -- Send --

/// Fields default to empty so a missing field is rejected by the handler
/// with a structured 400 rather than a serde-level rejection.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
}

// -- Typing indicator --

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

// -- Health --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub clients: usize,
}
