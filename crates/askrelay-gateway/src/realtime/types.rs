use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use askrelay_core::protocol::Envelope;
use uuid::Uuid;

/// What sits in a peer's outbound queue. Shared so a fan-out encodes one
/// envelope and hands the same allocation to every target.
pub type Outbound = Arc<Envelope>;

/// Server-generated connection identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Arc<str>);

impl PeerId {
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::now_v7().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-sortable request id (UUIDv7).
pub fn new_request_id() -> String {
    Uuid::now_v7().to_string()
}

pub fn new_chat_message_id() -> String {
    format!("chat_{}", Uuid::now_v7().simple())
}

/// Unix seconds, saturating to 0 on a clock before the epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Which peers a token-scoped operation reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Peers whose token equals this one (the empty token included).
    Token(String),
    /// Every active peer (legacy broadcast mode).
    Global,
}

impl Scope {
    pub fn matches(&self, token: &str) -> bool {
        match self {
            Scope::Token(t) => t == token,
            Scope::Global => true,
        }
    }
}
