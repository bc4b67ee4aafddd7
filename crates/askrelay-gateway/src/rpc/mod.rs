//! RPC boundary: the two blocking caller verbs.
//!
//! Callers never see transport faults; every outcome is a `CallResult`.

pub mod http;

use std::time::Duration;

use askrelay_core::protocol::envelope::{AskQuestionRequest, WorkReportRequest};
use askrelay_core::protocol::{CallResult, Prompt};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::realtime::{BroadcastRouter, RouterSettings};

#[async_trait]
pub trait AssistService: Send + Sync {
    /// Ask every peer under the request's token; returns the first answer.
    async fn ask_question(&self, req: AskQuestionRequest, cancel: CancellationToken) -> CallResult;

    /// Report finished work; returns the first acknowledgement.
    async fn work_report(&self, req: WorkReportRequest, cancel: CancellationToken) -> CallResult;
}

/// Caller timeout in seconds; `<= 0` means the configured default.
pub fn effective_timeout(settings: &RouterSettings, secs: i64) -> Duration {
    if secs <= 0 {
        settings.default_timeout
    } else {
        Duration::from_secs(secs as u64)
    }
}

#[async_trait]
impl AssistService for BroadcastRouter {
    async fn ask_question(&self, req: AskQuestionRequest, cancel: CancellationToken) -> CallResult {
        let timeout = effective_timeout(self.settings(), req.request.timeout);
        let token = req.user_token.clone();
        self.submit(Prompt::AskQuestion(req), &token, timeout, cancel)
            .await
    }

    async fn work_report(&self, req: WorkReportRequest, cancel: CancellationToken) -> CallResult {
        let timeout = effective_timeout(self.settings(), req.request.timeout);
        let token = req.user_token.clone();
        self.submit(Prompt::WorkReport(req), &token, timeout, cancel)
            .await
    }
}
