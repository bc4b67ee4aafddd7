//! Realtime runtime for the relay.
//!
//! Peer registry + pending table + scoped fan-out.

pub mod core;
pub mod types;

pub use core::{BroadcastRouter, FanOut, Peer, PeerRegistry, PendingTable, RouterSettings};
pub use types::{Outbound, PeerId, Scope};
