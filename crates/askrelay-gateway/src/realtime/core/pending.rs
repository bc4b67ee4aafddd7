use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use askrelay_core::error::{RelayError, Result};
use askrelay_core::protocol::envelope::PendingMessage;
use askrelay_core::protocol::{CallResult, Prompt};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::realtime::types::{unix_now, Scope};

/// State needed to resume one blocked caller.
pub struct PendingEntry {
    pub prompt: Prompt,
    /// Owning scope token.
    pub token: String,
    /// Unix seconds.
    pub created_at: i64,
    pub started: Instant,
    pub timeout: Duration,
    resolve_tx: oneshot::Sender<CallResult>,
}

impl PendingEntry {
    pub fn new(
        prompt: Prompt,
        token: impl Into<String>,
        timeout: Duration,
    ) -> (Self, oneshot::Receiver<CallResult>) {
        let (resolve_tx, resolve_rx) = oneshot::channel();
        let entry = Self {
            prompt,
            token: token.into(),
            created_at: unix_now(),
            started: Instant::now(),
            timeout,
            resolve_tx,
        };
        (entry, resolve_rx)
    }

    /// Hand `result` to the blocked caller. Dropped (and logged) when the
    /// caller is already gone.
    pub fn deliver(self, result: CallResult) {
        if self.resolve_tx.send(result).is_err() {
            tracing::warn!(request_id = self.prompt.id(), "caller gone before resolution was delivered");
        }
    }

    fn to_message(&self) -> PendingMessage {
        PendingMessage {
            prompt: self.prompt.clone(),
            created_at: self.created_at,
            timeout: self.timeout.as_secs() as i64,
        }
    }
}

/// What a successful `resolve` reports back.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub token: String,
    pub elapsed: Duration,
}

/// Pending-request table: `request_id -> PendingEntry`.
///
/// Every removal goes through `DashMap::remove`, so whichever of
/// resolve / cancel gets there first owns the entry and the rest see `None`.
#[derive(Default)]
pub struct PendingTable {
    entries: DashMap<String, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn insert(&self, id: &str, entry: PendingEntry) -> Result<()> {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(RelayError::DuplicateRequest(id.to_string())),
            Entry::Vacant(v) => {
                v.insert(entry);
                Ok(())
            }
        }
    }

    /// Remove the entry and deliver `result` to its caller. `None` when
    /// `id` was not pending.
    pub fn resolve(&self, id: &str, result: CallResult) -> Option<Resolved> {
        let (_, entry) = self.entries.remove(id)?;
        let resolved = Resolved {
            token: entry.token.clone(),
            elapsed: entry.started.elapsed(),
        };
        entry.deliver(result);
        Some(resolved)
    }

    /// Remove without delivering; the caller decides what the blocked
    /// requester and the other peers are told.
    pub fn cancel(&self, id: &str) -> Option<PendingEntry> {
        self.entries.remove(id).map(|(_, e)| e)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn contains_all(&self, ids: &[String]) -> BTreeMap<String, bool> {
        ids.iter()
            .map(|id| (id.clone(), self.entries.contains_key(id)))
            .collect()
    }

    /// Pending prompts visible to `scope`, oldest first.
    pub fn messages_for(&self, scope: &Scope) -> Vec<PendingMessage> {
        let mut out: Vec<(Instant, PendingMessage)> = self
            .entries
            .iter()
            .filter(|r| scope.matches(&r.value().token))
            .map(|r| (r.value().started, r.value().to_message()))
            .collect();
        out.sort_by_key(|(started, _)| *started);
        out.into_iter().map(|(_, m)| m).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
