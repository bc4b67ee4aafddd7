//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that turns frames into
//! envelopes before they reach the dispatcher.

pub mod codec;
pub mod ws;
