//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, rpc, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(transport::ws::ws_upgrade))
        .route("/v1/rpc/ask_question", post(rpc::http::ask_question))
        .route("/v1/rpc/work_report", post(rpc::http::work_report))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
