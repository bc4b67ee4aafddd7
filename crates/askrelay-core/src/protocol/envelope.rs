//! Tagged envelope exchanged with operator peers.
//!
//! Wire shape: `{"cmd": "<Tag>", "payload": {...}}`. Exactly one payload
//! type belongs to each tag; unit commands carry no payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::result::CallResult;

/// The two caller-facing verbs. They are structurally identical: send a
/// scoped prompt, block for a scoped answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    AskQuestion,
    #[serde(alias = "TaskFinish")]
    WorkReport,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::AskQuestion => "AskQuestion",
            Verb::WorkReport => "WorkReport",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBody {
    #[serde(default)]
    pub project_directory: String,
    pub question: String,
    /// Seconds.
    #[serde(default)]
    pub timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub project_directory: String,
    pub summary: String,
    /// Seconds.
    #[serde(default)]
    pub timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskQuestionRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_token: String,
    pub request: QuestionBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkReportRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_token: String,
    pub request: ReportBody,
}

/// A request sub-message of either verb, as fanned out to peers and as
/// remembered by the pending table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "request")]
pub enum Prompt {
    AskQuestion(AskQuestionRequest),
    #[serde(alias = "TaskFinish")]
    WorkReport(WorkReportRequest),
}

impl Prompt {
    pub fn verb(&self) -> Verb {
        match self {
            Prompt::AskQuestion(_) => Verb::AskQuestion,
            Prompt::WorkReport(_) => Verb::WorkReport,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Prompt::AskQuestion(r) => &r.id,
            Prompt::WorkReport(r) => &r.id,
        }
    }

    pub fn user_token(&self) -> &str {
        match self {
            Prompt::AskQuestion(r) => &r.user_token,
            Prompt::WorkReport(r) => &r.user_token,
        }
    }

    /// Declared timeout in seconds (as the caller sent it, may be <= 0).
    pub fn timeout_secs(&self) -> i64 {
        match self {
            Prompt::AskQuestion(r) => r.request.timeout,
            Prompt::WorkReport(r) => r.request.timeout,
        }
    }

    /// Stamp the routing identity onto the request sub-message.
    pub fn assign(&mut self, id: &str, user_token: &str, timeout_secs: i64) {
        match self {
            Prompt::AskQuestion(r) => {
                r.id = id.to_string();
                r.user_token = user_token.to_string();
                r.request.timeout = timeout_secs;
            }
            Prompt::WorkReport(r) => {
                r.id = id.to_string();
                r.user_token = user_token.to_string();
                r.request.timeout = timeout_secs;
            }
        }
    }

    /// The envelope peers receive for this prompt.
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Prompt::AskQuestion(r) => Envelope::AskQuestion(r.clone()),
            Prompt::WorkReport(r) => Envelope::WorkReport(r.clone()),
        }
    }
}

/// The answer half of a reply: which request, and the result to hand back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyBody {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub result: CallResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskQuestionReply {
    pub request: AskQuestionRequest,
    pub response: ReplyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkReportReply {
    pub request: WorkReportRequest,
    pub response: ReplyBody,
}

impl AskQuestionReply {
    /// The id being answered; older peers only fill in the request half.
    pub fn request_id(&self) -> &str {
        reply_id(&self.response.id, &self.request.id)
    }
}

impl WorkReportReply {
    pub fn request_id(&self) -> &str {
        reply_id(&self.response.id, &self.request.id)
    }
}

fn reply_id<'a>(response_id: &'a str, request_id: &'a str) -> &'a str {
    if response_id.is_empty() {
        request_id
    } else {
        response_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLogin {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelled {
    pub request_id: String,
    pub reason: String,
    pub message_type: Verb,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityQuery {
    #[serde(default)]
    pub request_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityResponse {
    pub validity: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub prompt: Prompt,
    /// Unix seconds.
    pub created_at: i64,
    /// Seconds.
    pub timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessages {
    pub messages: Vec<PendingMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub client_id: String,
    #[serde(default)]
    pub nickname: String,
    /// Unix seconds.
    pub connected_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsers {
    pub users: Vec<OnlineUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSend {
    pub receiver_client_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub sender_client_id: String,
    pub sender_nickname: String,
    pub receiver_client_id: String,
    pub receiver_nickname: String,
    pub content: String,
    /// Unix seconds.
    pub sent_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub user: OnlineUser,
    pub status: PresenceStatus,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Every frame on the persistent connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "payload")]
pub enum Envelope {
    UserLogin(UserLogin),

    AskQuestion(AskQuestionRequest),
    AskQuestionReply(AskQuestionReply),
    AskQuestionReplyNotification(AskQuestionReply),

    #[serde(alias = "TaskFinish")]
    WorkReport(WorkReportRequest),
    #[serde(alias = "TaskFinishReply")]
    WorkReportReply(WorkReportReply),
    #[serde(alias = "TaskFinishReplyNotification")]
    WorkReportReplyNotification(WorkReportReply),

    RequestCancelled(RequestCancelled),

    CheckMessageValidity(ValidityQuery),
    CheckMessageValidityResponse(ValidityResponse),

    GetPendingMessages,
    GetPendingMessagesResponse(PendingMessages),

    GetOnlineUsers,
    GetOnlineUsersResponse(OnlineUsers),

    SendChatMessage(ChatSend),
    ChatMessageNotification(ChatMessage),

    UserConnectionStatusNotification(ConnectionStatus),
}

impl Envelope {
    /// Wire tag of this envelope.
    pub fn command(&self) -> &'static str {
        match self {
            Envelope::UserLogin(_) => "UserLogin",
            Envelope::AskQuestion(_) => "AskQuestion",
            Envelope::AskQuestionReply(_) => "AskQuestionReply",
            Envelope::AskQuestionReplyNotification(_) => "AskQuestionReplyNotification",
            Envelope::WorkReport(_) => "WorkReport",
            Envelope::WorkReportReply(_) => "WorkReportReply",
            Envelope::WorkReportReplyNotification(_) => "WorkReportReplyNotification",
            Envelope::RequestCancelled(_) => "RequestCancelled",
            Envelope::CheckMessageValidity(_) => "CheckMessageValidity",
            Envelope::CheckMessageValidityResponse(_) => "CheckMessageValidityResponse",
            Envelope::GetPendingMessages => "GetPendingMessages",
            Envelope::GetPendingMessagesResponse(_) => "GetPendingMessagesResponse",
            Envelope::GetOnlineUsers => "GetOnlineUsers",
            Envelope::GetOnlineUsersResponse(_) => "GetOnlineUsersResponse",
            Envelope::SendChatMessage(_) => "SendChatMessage",
            Envelope::ChatMessageNotification(_) => "ChatMessageNotification",
            Envelope::UserConnectionStatusNotification(_) => "UserConnectionStatusNotification",
        }
    }

    /// Request id carried by request, reply, and cancellation envelopes.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Envelope::AskQuestion(r) => Some(&r.id),
            Envelope::WorkReport(r) => Some(&r.id),
            Envelope::AskQuestionReply(r) | Envelope::AskQuestionReplyNotification(r) => {
                Some(r.request_id())
            }
            Envelope::WorkReportReply(r) | Envelope::WorkReportReplyNotification(r) => {
                Some(r.request_id())
            }
            Envelope::RequestCancelled(c) => Some(&c.request_id),
            _ => None,
        }
    }
}
