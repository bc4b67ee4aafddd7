//! JSON-over-HTTP surface for the RPC verbs.
//!
//! A client that hangs up drops the handler future; the router's drop guard
//! turns that into a caller cancellation.

use askrelay_core::protocol::envelope::{AskQuestionRequest, WorkReportRequest};
use askrelay_core::protocol::CallResult;
use axum::{extract::State, Json};

use crate::app_state::AppState;
use crate::rpc::AssistService;

pub async fn ask_question(
    State(app): State<AppState>,
    Json(req): Json<AskQuestionRequest>,
) -> Json<CallResult> {
    let cancel = app.shutdown_token().child_token();
    Json(app.router().ask_question(req, cancel).await)
}

pub async fn work_report(
    State(app): State<AppState>,
    Json(req): Json<WorkReportRequest>,
) -> Json<CallResult> {
    let cancel = app.shutdown_token().child_token();
    Json(app.router().work_report(req, cancel).await)
}
