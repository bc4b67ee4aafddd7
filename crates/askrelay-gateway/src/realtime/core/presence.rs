use askrelay_core::protocol::envelope::{ConnectionStatus, PresenceStatus};
use askrelay_core::protocol::Envelope;

use crate::realtime::core::Peer;
use crate::realtime::types::unix_now;

/// `UserConnectionStatusNotification` announcing `peer` to its scope.
pub fn status_notice(peer: &Peer, status: PresenceStatus) -> Envelope {
    Envelope::UserConnectionStatusNotification(ConnectionStatus {
        user: peer.online_user(),
        status,
        timestamp: unix_now(),
    })
}
