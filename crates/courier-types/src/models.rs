use serde::{Deserialize, Serialize};

/// Direction of a message relative to the bridge owner: `Inbound` came from
/// the counterparty, `Outbound` was delivered through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// A single message as persisted in the local store.  Immutable once
/// assigned an id; `timestamp` is seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub text: String,
    pub direction: Direction,
    pub timestamp: f64,
}

impl Message {
    /// Inbound messages originate from the counterparty, which the web
    /// frontend calls "from user".
    pub fn is_from_user(&self) -> bool {
        self.direction == Direction::Inbound
    }
}

/// Derived per-counterparty view: latest message and activity time.  Never
/// stored; computed by aggregation over the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub sender_id: String,
    pub last_message: String,
    pub last_timestamp: f64,
    pub unread_count: u32,
}
