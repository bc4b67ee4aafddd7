//! Frame codec for the peer connection.
//!
//! - Text and Binary frames both carry the JSON envelope
//! - Outbound envelopes always go out as Text
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use askrelay_core::error::Result;
use askrelay_core::protocol::{frame, Decoded, Envelope};

#[derive(Debug)]
pub enum Inbound {
    Command(Envelope),
    Unknown { cmd: String, payload_bytes: usize },
    Ping,
    Pong,
    Close,
}

/// Frame size, computed before any decoding.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message) -> Result<Inbound> {
    let decoded = match msg {
        Message::Text(s) => frame::decode(s.as_bytes())?,
        Message::Binary(b) => frame::decode(&b)?,
        Message::Ping(_) => return Ok(Inbound::Ping),
        Message::Pong(_) => return Ok(Inbound::Pong),
        Message::Close(_) => return Ok(Inbound::Close),
    };
    Ok(match decoded {
        Decoded::Command(env) => Inbound::Command(env),
        Decoded::Unknown { cmd, payload_bytes } => Inbound::Unknown { cmd, payload_bytes },
    })
}

pub fn encode(env: &Envelope) -> Result<Message> {
    frame::encode(env).map(Message::Text)
}
