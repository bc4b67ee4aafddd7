use std::sync::Arc;
use std::time::Duration;

use askrelay_core::error::{ErrorCode, RelayError, Result};
use askrelay_core::protocol::envelope::{
    ChatMessage, OnlineUsers, PendingMessages, PresenceStatus, RequestCancelled, ValidityResponse,
};
use askrelay_core::protocol::{CallResult, Envelope, Prompt, Verb};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::obs::RelayMetrics;
use crate::realtime::core::presence::status_notice;
use crate::realtime::core::{PeerRegistry, PendingEntry, PendingTable, Peer};
use crate::realtime::types::{new_chat_message_id, new_request_id, unix_now, Outbound, PeerId, Scope};

pub const CANCELLED_BY_CALLER: &str = "cancelled by caller";

#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Applied by the RPC boundary when a caller sends timeout <= 0.
    pub default_timeout: Duration,
    /// Empty scope token reaches every active peer instead of only
    /// unscoped ones.
    pub legacy_global_broadcast: bool,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(3600),
            legacy_global_broadcast: false,
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub evicted: usize,
}

enum Wake {
    Resolved(std::result::Result<CallResult, oneshot::error::RecvError>),
    TimedOut,
    Cancelled,
}

/// Broadcast router: fans scoped prompts out to peers and resolves each
/// pending request exactly once (reply, timeout, or cancellation).
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct BroadcastRouter {
    registry: Arc<PeerRegistry>,
    pending: Arc<PendingTable>,
    metrics: Arc<RelayMetrics>,
    settings: RouterSettings,
}

impl BroadcastRouter {
    pub fn new(settings: RouterSettings, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            registry: Arc::new(PeerRegistry::new()),
            pending: Arc::new(PendingTable::new()),
            metrics,
            settings,
        }
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn scope_for(&self, token: &str) -> Scope {
        if token.is_empty() && self.settings.legacy_global_broadcast {
            Scope::Global
        } else {
            Scope::Token(token.to_string())
        }
    }

    // --------------------
    // Peer lifecycle
    // --------------------

    pub fn connect(&self, peer: Arc<Peer>) {
        tracing::info!(peer_id = %peer.id(), total = self.registry.len() + 1, "peer connected");
        self.registry.register(peer);
    }

    /// Connection teardown. Safe after an eviction already removed the peer.
    pub async fn disconnect(&self, peer: &Arc<Peer>) {
        self.registry.unregister(peer.id());
        peer.close();
        tracing::info!(peer_id = %peer.id(), total = self.registry.len(), "peer disconnected");

        let token = peer.token();
        if !token.is_empty() {
            let notice = status_notice(peer, PresenceStatus::Disconnected);
            self.broadcast_except(notice, &Scope::Token(token), Some(peer.id()))
                .await;
        }
    }

    /// Apply a `UserLogin`: set identity and announce the peer to its scope.
    pub async fn login(&self, peer: &Arc<Peer>, token: &str, nickname: Option<&str>) {
        peer.set_identity(token, nickname);
        tracing::info!(peer_id = %peer.id(), token = %token, nickname = ?nickname, "peer logged in");

        if !token.is_empty() {
            let notice = status_notice(peer, PresenceStatus::Connected);
            self.broadcast_except(notice, &Scope::Token(token.to_string()), Some(peer.id()))
                .await;
        }
    }

    /// Dead-peer eviction after a failed delivery.
    pub fn evict(&self, peer: &Peer) {
        if self.registry.unregister(peer.id()).is_some() {
            self.metrics.peer_evictions.inc(&[]);
            tracing::warn!(peer_id = %peer.id(), "evicted unresponsive peer");
        }
    }

    // --------------------
    // Request / response
    // --------------------

    /// Fan `prompt` out to every peer in `scope_token`'s scope and block
    /// until one of: a peer replies, `timeout` elapses, `cancel` fires.
    /// Every outcome comes back as a `CallResult`.
    pub async fn submit(
        &self,
        mut prompt: Prompt,
        scope_token: &str,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> CallResult {
        let verb = prompt.verb();
        let id = new_request_id();
        prompt.assign(&id, scope_token, timeout.as_secs() as i64);

        let targets = self.registry.snapshot(&self.scope_for(scope_token));
        if targets.is_empty() {
            tracing::warn!(request_id = %id, verb = verb.as_str(), token = %scope_token, "no peers available");
            return self.finish(verb, CallResult::from_error(&RelayError::NoClients));
        }

        let (entry, mut resolve_rx) = PendingEntry::new(prompt.clone(), scope_token, timeout);
        if let Err(e) = self.pending.insert(&id, entry) {
            tracing::error!(request_id = %id, error = %e, "pending insert failed");
            return self.finish(verb, CallResult::from_error(&e));
        }
        let mut guard = PendingGuard {
            router: self.clone(),
            id: id.clone(),
            verb,
            armed: true,
        };

        let fan = self.fan_out(targets, Arc::new(prompt.to_envelope()));
        tracing::info!(
            request_id = %id,
            verb = verb.as_str(),
            delivered = fan.delivered,
            evicted = fan.evicted,
            timeout_secs = timeout.as_secs(),
            "request fanned out"
        );

        let wake = tokio::select! {
            biased;
            res = &mut resolve_rx => Wake::Resolved(res),
            _ = tokio::time::sleep(timeout) => Wake::TimedOut,
            _ = cancel.cancelled() => Wake::Cancelled,
        };

        let result = match wake {
            Wake::Resolved(res) => res.unwrap_or_else(|_| {
                CallResult::failure(ErrorCode::Internal, "resolution channel dropped")
            }),
            Wake::TimedOut => {
                let reason = RelayError::Timeout(timeout.as_secs());
                self.abandon(&id, verb, reason, &mut resolve_rx).await
            }
            Wake::Cancelled => {
                let reason = RelayError::Cancelled(CANCELLED_BY_CALLER.into());
                self.abandon(&id, verb, reason, &mut resolve_rx).await
            }
        };
        guard.armed = false;
        self.finish(verb, result)
    }

    /// Timeout / caller-cancel transition. When a reply removed the entry
    /// first, its result wins and is returned instead.
    async fn abandon(
        &self,
        id: &str,
        verb: Verb,
        reason: RelayError,
        resolve_rx: &mut oneshot::Receiver<CallResult>,
    ) -> CallResult {
        match self.pending.cancel(id) {
            Some(entry) => {
                tracing::info!(request_id = %id, reason = %reason, "request abandoned");
                let token = entry.token.clone();
                drop(entry);
                self.broadcast_cancellation(id, verb, &token, &reason.to_string())
                    .await;
                CallResult::from_error(&reason)
            }
            // the resolver delivers right after removing
            None => resolve_rx
                .await
                .unwrap_or_else(|_| CallResult::from_error(&reason)),
        }
    }

    fn finish(&self, verb: Verb, result: CallResult) -> CallResult {
        let outcome = result.error_code().unwrap_or("answered");
        self.metrics
            .submits
            .inc(&[("verb", verb.as_str()), ("outcome", outcome)]);
        result
    }

    /// Resolve a pending request from a peer reply. Unknown or already
    /// finished ids are logged and dropped.
    pub fn handle_reply(&self, request_id: &str, result: CallResult) -> bool {
        self.resolve_reply(request_id, result).is_some()
    }

    /// `handle_reply`, returning the scope that owned the request so the
    /// rest of it can be told it was answered.
    pub fn resolve_reply(&self, request_id: &str, result: CallResult) -> Option<Scope> {
        match self.pending.resolve(request_id, result) {
            Some(resolved) => {
                self.metrics.replies.inc(&[("outcome", "resolved")]);
                self.metrics.answer_latency.observe(&[], resolved.elapsed);
                tracing::info!(
                    request_id = %request_id,
                    elapsed_ms = resolved.elapsed.as_millis() as u64,
                    "request resolved"
                );
                Some(self.scope_for(&resolved.token))
            }
            None => {
                self.metrics.replies.inc(&[("outcome", "unknown")]);
                let err = RelayError::UnknownRequest(request_id.to_string());
                tracing::warn!(error = %err, "reply dropped");
                None
            }
        }
    }

    /// Withdraw a pending request: the blocked caller gets `cancelled`, the
    /// request's scope gets a `RequestCancelled` notice.
    pub async fn cancel_request(&self, request_id: &str, reason: &str) -> bool {
        let Some(entry) = self.pending.cancel(request_id) else {
            tracing::debug!(request_id = %request_id, "cancel for request that is not pending");
            return false;
        };
        let verb = entry.prompt.verb();
        let token = entry.token.clone();
        entry.deliver(CallResult::from_error(&RelayError::Cancelled(reason.to_string())));
        self.broadcast_cancellation(request_id, verb, &token, reason)
            .await;
        true
    }

    async fn broadcast_cancellation(&self, request_id: &str, verb: Verb, token: &str, reason: &str) {
        let notice = Envelope::RequestCancelled(RequestCancelled {
            request_id: request_id.to_string(),
            reason: reason.to_string(),
            message_type: verb,
        });
        let scope = self.scope_for(token);
        self.broadcast_except(notice, &scope, None).await;
    }

    // --------------------
    // Fan-out
    // --------------------

    /// Best-effort delivery to every active peer in `scope` except
    /// `exclude`. Failed deliveries evict the peer.
    pub async fn broadcast_except(
        &self,
        env: Envelope,
        scope: &Scope,
        exclude: Option<&PeerId>,
    ) -> FanOut {
        let targets: Vec<Arc<Peer>> = self
            .registry
            .snapshot(scope)
            .into_iter()
            .filter(|p| Some(p.id()) != exclude)
            .collect();
        let cmd = env.command();
        let fan = self.fan_out(targets, Arc::new(env));
        tracing::debug!(cmd, delivered = fan.delivered, evicted = fan.evicted, "broadcast");
        fan
    }

    /// One non-blocking `enqueue` per target. A wedged peer fails its own
    /// enqueue immediately, so nobody waits on it.
    pub fn fan_out(&self, targets: Vec<Arc<Peer>>, msg: Outbound) -> FanOut {
        let mut fan = FanOut::default();
        for peer in targets {
            if peer.enqueue(Arc::clone(&msg)) {
                fan.delivered += 1;
            } else {
                self.evict(&peer);
                fan.evicted += 1;
            }
        }
        fan
    }

    // --------------------
    // Read-only projections
    // --------------------

    pub fn presence_query(&self, peer: &Peer) -> Envelope {
        Envelope::GetOnlineUsersResponse(OnlineUsers {
            users: self.registry.presence(&peer.token(), peer.id()),
        })
    }

    pub fn validity_query(&self, request_ids: &[String]) -> Envelope {
        Envelope::CheckMessageValidityResponse(ValidityResponse {
            validity: self.pending.contains_all(request_ids),
        })
    }

    pub fn pending_query(&self, peer: &Peer) -> Envelope {
        let scope = self.scope_for(&peer.token());
        Envelope::GetPendingMessagesResponse(PendingMessages {
            messages: self.pending.messages_for(&scope),
        })
    }

    // --------------------
    // Peer-to-peer chat
    // --------------------

    /// Deliver a chat line to `receiver` only. Both peers must be active and
    /// share a token.
    pub fn relay_chat(
        &self,
        sender: &PeerId,
        receiver: &PeerId,
        content: &str,
    ) -> Result<ChatMessage> {
        let from = self
            .registry
            .find(sender)
            .ok_or_else(|| RelayError::NotFound(sender.to_string()))?;
        let to = self
            .registry
            .find(receiver)
            .ok_or_else(|| RelayError::NotFound(receiver.to_string()))?;

        if from.token() != to.token() {
            return Err(RelayError::ScopeMismatch);
        }

        let msg = ChatMessage {
            message_id: new_chat_message_id(),
            sender_client_id: sender.to_string(),
            sender_nickname: from.nickname(),
            receiver_client_id: receiver.to_string(),
            receiver_nickname: to.nickname(),
            content: content.to_string(),
            sent_at: unix_now(),
        };

        if !to.enqueue(Arc::new(Envelope::ChatMessageNotification(msg.clone()))) {
            self.evict(&to);
            return Err(RelayError::NotFound(receiver.to_string()));
        }
        tracing::debug!(from = %sender, to = %receiver, message_id = %msg.message_id, "chat relayed");
        Ok(msg)
    }
}

/// Performs the caller-cancel transition when a `submit` future is dropped
/// before it finished (e.g. the RPC client hung up).
struct PendingGuard {
    router: BroadcastRouter,
    id: String,
    verb: Verb,
    armed: bool,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(entry) = self.router.pending.cancel(&self.id) else {
            return;
        };
        let token = entry.token.clone();
        drop(entry);
        tracing::info!(request_id = %self.id, "caller dropped request");
        self.router.finish(
            self.verb,
            CallResult::from_error(&RelayError::Cancelled(CANCELLED_BY_CALLER.into())),
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let router = self.router.clone();
        let id = std::mem::take(&mut self.id);
        let verb = self.verb;
        handle.spawn(async move {
            router
                .broadcast_cancellation(&id, verb, &token, CANCELLED_BY_CALLER)
                .await;
        });
    }
}
