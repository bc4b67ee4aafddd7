//! WebSocket handler for operator peers.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS, register the peer, tear it down exactly once
//! - Writer task: drain the peer's outbound queue, keepalive ping on idle,
//!   bounded write deadline
//! - Reader loop: read deadline (reset by any frame, pongs included), frame
//!   size limit, decode, dispatch

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::app_state::AppState;
use crate::realtime::{Outbound, Peer, PeerId};
use crate::transport::codec::{self, Inbound};

#[derive(Debug, Clone, Copy)]
struct WriterTimers {
    ping_every: Duration,
    write_timeout: Duration,
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if app.metrics().is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    app.metrics().ws_upgrades.inc(&[]);

    let max_frame = app.cfg().gateway.max_frame_bytes;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| run_session(app, socket))
}

// --------------------
// Session lifecycle
// --------------------
async fn run_session(app: AppState, socket: WebSocket) {
    let (peer, out_rx) = Peer::new(PeerId::generate(), app.cfg().relay.peer_queue_capacity);
    let span = tracing::info_span!("peer", peer_id = %peer.id());

    async move {
        let router = app.router();
        let gw = &app.cfg().gateway;
        let timers = WriterTimers {
            ping_every: gw.ping_interval(),
            write_timeout: gw.write_timeout(),
        };

        router.connect(Arc::clone(&peer));
        app.metrics().peers_connected.inc();

        let (ws_tx, ws_rx) = socket.split();
        let conn = app.shutdown_token().child_token();

        let writer = tokio::spawn(
            write_loop(ws_tx, out_rx, timers, conn.clone()).instrument(tracing::Span::current()),
        );

        read_loop(&app, &peer, ws_rx, &conn).await;

        conn.cancel();
        router.disconnect(&peer).await;
        if let Err(e) = writer.await {
            tracing::warn!(error = %e, "writer task failed");
        }
        app.metrics().peers_connected.dec();
    }
    .instrument(span)
    .await
}

// --------------------
// Writer
// --------------------
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<Outbound>,
    timers: WriterTimers,
    conn: CancellationToken,
) {
    let mut last_write = Instant::now();

    loop {
        let frame = tokio::select! {
            _ = conn.cancelled() => break,

            maybe_out = out_rx.recv() => match maybe_out {
                Some(env) => match codec::encode(&env) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::error!(error = %e, "dropping unencodable envelope");
                        continue;
                    }
                },
                // queue closed: the peer was unregistered or evicted
                None => {
                    let _ = tokio::time::timeout(timers.write_timeout, ws_tx.send(Message::Close(None))).await;
                    break;
                }
            },

            _ = tokio::time::sleep_until(last_write + timers.ping_every) => Message::Ping(Vec::new()),
        };

        match tokio::time::timeout(timers.write_timeout, ws_tx.send(frame)).await {
            Ok(Ok(())) => last_write = Instant::now(),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "write failed");
                break;
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timers.write_timeout.as_millis() as u64, "write deadline exceeded");
                break;
            }
        }
    }

    conn.cancel();
}

// --------------------
// Reader
// --------------------
async fn read_loop(
    app: &AppState,
    peer: &Arc<Peer>,
    mut ws_rx: SplitStream<WebSocket>,
    conn: &CancellationToken,
) {
    let gw = &app.cfg().gateway;
    let deadline = gw.read_deadline();
    let max_frame = gw.max_frame_bytes;
    let dispatcher = app.dispatcher();
    let metrics = app.metrics();

    loop {
        let next = tokio::select! {
            _ = conn.cancelled() => break,
            next = tokio::time::timeout(deadline, ws_rx.next()) => next,
        };

        let msg = match next {
            Err(_) => {
                tracing::info!(deadline_ms = deadline.as_millis() as u64, "read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "read failed");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        let bytes_len = codec::frame_len(&msg);
        if bytes_len > max_frame {
            tracing::warn!(bytes_len, max_frame, "frame too large; closing");
            break;
        }

        match codec::decode(msg) {
            Ok(Inbound::Command(env)) => {
                metrics.frames_in.inc(&[("cmd", env.command())]);
                tracing::debug!(cmd = env.command(), request_id = ?env.request_id(), "frame in");
                dispatcher.dispatch(peer, env).await;
            }
            Ok(Inbound::Unknown { cmd, payload_bytes }) => {
                metrics.frames_in.inc(&[("cmd", "unknown")]);
                tracing::warn!(cmd = %cmd, payload_bytes, "unknown command ignored");
            }
            Ok(Inbound::Ping) | Ok(Inbound::Pong) => {}
            Ok(Inbound::Close) => break,
            Err(e) => {
                metrics.decode_errors.inc(&[]);
                tracing::warn!(bytes_len, error = %e, "frame dropped");
            }
        }
    }
}
