use std::sync::Arc;

use askrelay_core::protocol::envelope::OnlineUser;
use dashmap::DashMap;

use crate::realtime::core::Peer;
use crate::realtime::types::{PeerId, Scope};

/// Peer registry: `peer_id -> Peer`.
///
/// Reads iterate shard by shard, so a snapshot is point-in-time per shard
/// only. A peer that leaves mid fan-out just fails its own delivery.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, Arc<Peer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Idempotent: registering the same peer twice keeps one entry.
    pub fn register(&self, peer: Arc<Peer>) {
        self.peers.insert(peer.id().clone(), peer);
        tracing::debug!(total = self.peers.len(), "peer registered");
    }

    /// Remove and close. Returns the peer only for the call that removed it,
    /// so concurrent unregisters of one peer see a single `Some`.
    pub fn unregister(&self, id: &PeerId) -> Option<Arc<Peer>> {
        let (_, peer) = self.peers.remove(id)?;
        peer.close();
        tracing::debug!(peer_id = %id, total = self.peers.len(), "peer unregistered");
        Some(peer)
    }

    pub fn find(&self, id: &PeerId) -> Option<Arc<Peer>> {
        self.peers
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .filter(|p| p.is_active())
    }

    /// Active peers inside `scope`. Callers deliver after this returns, so
    /// no shard lock is held during I/O.
    pub fn snapshot(&self, scope: &Scope) -> Vec<Arc<Peer>> {
        self.peers
            .iter()
            .filter(|r| r.value().is_active() && scope.matches(&r.value().token()))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Peers sharing `token`, minus `exclude` (usually the asker).
    pub fn presence(&self, token: &str, exclude: &PeerId) -> Vec<OnlineUser> {
        let mut users: Vec<OnlineUser> = self
            .snapshot(&Scope::Token(token.to_string()))
            .into_iter()
            .filter(|p| p.id() != exclude)
            .map(|p| p.online_user())
            .collect();
        users.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });
        users
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
