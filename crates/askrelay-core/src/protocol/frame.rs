//! Header-first frame decoding.
//!
//! The `cmd` tag is peeked with the payload left as a lazy `RawValue`, so an
//! unknown tag is reported as `Decoded::Unknown` instead of a parse failure.
//! Only frames whose tag is known are decoded in full.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{RelayError, Result};
use crate::protocol::envelope::Envelope;

/// Every tag the envelope understands, including legacy aliases.
pub const KNOWN_COMMANDS: &[&str] = &[
    "UserLogin",
    "AskQuestion",
    "AskQuestionReply",
    "AskQuestionReplyNotification",
    "WorkReport",
    "WorkReportReply",
    "WorkReportReplyNotification",
    "TaskFinish",
    "TaskFinishReply",
    "TaskFinishReplyNotification",
    "RequestCancelled",
    "CheckMessageValidity",
    "CheckMessageValidityResponse",
    "GetPendingMessages",
    "GetPendingMessagesResponse",
    "GetOnlineUsers",
    "GetOnlineUsersResponse",
    "SendChatMessage",
    "ChatMessageNotification",
    "UserConnectionStatusNotification",
];

#[derive(Debug, Deserialize)]
struct Header<'a> {
    #[serde(borrow)]
    cmd: Cow<'a, str>,
    #[serde(default, borrow)]
    payload: Option<&'a RawValue>,
}

/// Result of decoding one inbound frame.
#[derive(Debug)]
pub enum Decoded {
    Command(Envelope),
    /// Well-formed frame with a tag outside the closed set.
    Unknown { cmd: String, payload_bytes: usize },
}

pub fn is_known_command(cmd: &str) -> bool {
    KNOWN_COMMANDS.contains(&cmd)
}

/// Decode a frame body (UTF-8 JSON, from either a text or binary frame).
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    let header: Header<'_> = serde_json::from_slice(bytes)
        .map_err(|e| RelayError::BadRequest(format!("invalid frame header: {e}")))?;

    if !is_known_command(&header.cmd) {
        return Ok(Decoded::Unknown {
            cmd: header.cmd.into_owned(),
            payload_bytes: header.payload.map(|p| p.get().len()).unwrap_or(0),
        });
    }

    let env: Envelope = serde_json::from_slice(bytes).map_err(|e| {
        RelayError::BadRequest(format!("invalid {} payload: {e}", header.cmd))
    })?;
    Ok(Decoded::Command(env))
}

/// Encode an envelope to its JSON text form.
pub fn encode(env: &Envelope) -> Result<String> {
    serde_json::to_string(env)
        .map_err(|e| RelayError::Internal(format!("encode {} failed: {e}", env.command())))
}
