use std::sync::Arc;

use askrelay_core::protocol::Envelope;

use crate::realtime::{BroadcastRouter, Peer, PeerId};

/// Routes every command a peer can send. Replies go to the peer's own
/// queue; server-only tags arriving inbound are ignored.
#[derive(Clone)]
pub struct CommandDispatcher {
    router: BroadcastRouter,
}

impl CommandDispatcher {
    pub fn new(router: BroadcastRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    pub async fn dispatch(&self, peer: &Arc<Peer>, env: Envelope) {
        match env {
            Envelope::UserLogin(login) => {
                self.router
                    .login(peer, &login.token, login.nickname.as_deref())
                    .await;
            }

            Envelope::AskQuestionReply(mut reply) => {
                let id = reply.request_id().to_string();
                reply.response.result = std::mem::take(&mut reply.response.result).validated();
                if let Some(scope) = self.router.resolve_reply(&id, reply.response.result.clone()) {
                    let notice = Envelope::AskQuestionReplyNotification(reply);
                    self.router
                        .broadcast_except(notice, &scope, Some(peer.id()))
                        .await;
                }
            }

            Envelope::WorkReportReply(mut reply) => {
                let id = reply.request_id().to_string();
                reply.response.result = std::mem::take(&mut reply.response.result).validated();
                if let Some(scope) = self.router.resolve_reply(&id, reply.response.result.clone()) {
                    let notice = Envelope::WorkReportReplyNotification(reply);
                    self.router
                        .broadcast_except(notice, &scope, Some(peer.id()))
                        .await;
                }
            }

            Envelope::CheckMessageValidity(q) => {
                self.respond(peer, self.router.validity_query(&q.request_ids));
            }

            Envelope::GetPendingMessages => {
                self.respond(peer, self.router.pending_query(peer));
            }

            Envelope::GetOnlineUsers => {
                self.respond(peer, self.router.presence_query(peer));
            }

            Envelope::SendChatMessage(chat) => {
                let receiver = PeerId::from(chat.receiver_client_id.as_str());
                if let Err(e) = self.router.relay_chat(peer.id(), &receiver, &chat.content) {
                    tracing::warn!(
                        peer_id = %peer.id(),
                        receiver = %receiver,
                        code = e.code().as_str(),
                        error = %e,
                        "chat not relayed"
                    );
                }
            }

            other @ (Envelope::AskQuestion(_)
            | Envelope::WorkReport(_)
            | Envelope::AskQuestionReplyNotification(_)
            | Envelope::WorkReportReplyNotification(_)
            | Envelope::RequestCancelled(_)
            | Envelope::CheckMessageValidityResponse(_)
            | Envelope::GetPendingMessagesResponse(_)
            | Envelope::GetOnlineUsersResponse(_)
            | Envelope::ChatMessageNotification(_)
            | Envelope::UserConnectionStatusNotification(_)) => {
                tracing::warn!(peer_id = %peer.id(), cmd = other.command(), "server-only command from peer ignored");
            }
        }
    }

    fn respond(&self, peer: &Arc<Peer>, env: Envelope) {
        if !peer.enqueue(Arc::new(env)) {
            self.router.evict(peer);
        }
    }
}
