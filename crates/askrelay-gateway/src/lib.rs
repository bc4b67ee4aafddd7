//! askrelay gateway library entry.
//!
//! Wires the WebSocket transport, command dispatcher, broadcast router, RPC
//! surface, and ops endpoints into one service. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod rpc;
pub mod transport;
