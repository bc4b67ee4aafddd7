//! Relay core: peers, the registry they live in, the pending-request table,
//! and the broadcast router that ties them together.

mod broadcast;
mod peer;
mod pending;
mod presence;
mod registry;

pub use broadcast::{BroadcastRouter, FanOut, RouterSettings, CANCELLED_BY_CALLER};
pub use peer::Peer;
pub use pending::{PendingEntry, PendingTable, Resolved};
pub use presence::status_notice;
pub use registry::PeerRegistry;
