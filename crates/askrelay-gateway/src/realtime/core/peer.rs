use std::sync::{Arc, Mutex};

use askrelay_core::protocol::envelope::OnlineUser;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::realtime::types::{unix_now, Outbound, PeerId};

#[derive(Debug, Default, Clone)]
struct Identity {
    token: String,
    nickname: String,
}

/// One live operator connection.
///
/// The outbound queue is bounded and FIFO. Exactly one writer task owns the
/// receiver; anyone may `enqueue`. `close` drops the sender exactly once,
/// which flips liveness and lets the writer drain and exit.
pub struct Peer {
    id: PeerId,
    connected_at: i64,
    identity: Mutex<Identity>,
    tx: Mutex<Option<mpsc::Sender<Outbound>>>,
}

impl Peer {
    /// Create a peer and the receiving half of its outbound queue.
    pub fn new(id: PeerId, queue_capacity: usize) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let peer = Arc::new(Self {
            id,
            connected_at: unix_now(),
            identity: Mutex::new(Identity::default()),
            tx: Mutex::new(Some(tx)),
        });
        (peer, rx)
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }

    /// Scope token; empty until the peer logs in.
    pub fn token(&self) -> String {
        self.identity
            .lock()
            .map(|i| i.token.clone())
            .unwrap_or_default()
    }

    pub fn nickname(&self) -> String {
        self.identity
            .lock()
            .map(|i| i.nickname.clone())
            .unwrap_or_default()
    }

    pub fn set_identity(&self, token: &str, nickname: Option<&str>) {
        if let Ok(mut i) = self.identity.lock() {
            i.token = token.to_string();
            if let Some(n) = nickname {
                i.nickname = n.to_string();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.tx.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Non-blocking delivery. `false` when the peer is closed or its queue
    /// is full; never waits.
    pub fn enqueue(&self, msg: Outbound) -> bool {
        let Ok(guard) = self.tx.lock() else {
            return false;
        };
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                tracing::warn!(peer_id = %self.id, cmd = msg.command(), "outbound queue full");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Idempotent. Returns `true` only for the call that actually closed.
    pub fn close(&self) -> bool {
        match self.tx.lock() {
            Ok(mut guard) => guard.take().is_some(),
            Err(_) => false,
        }
    }

    pub fn online_user(&self) -> OnlineUser {
        OnlineUser {
            client_id: self.id.to_string(),
            nickname: self.nickname(),
            connected_at: self.connected_at,
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("active", &self.is_active())
            .finish()
    }
}
