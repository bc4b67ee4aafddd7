#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use askrelay_core::protocol::envelope::PresenceStatus;
use askrelay_core::protocol::{CallResult, ContentItem, Envelope, Verb};
use askrelay_gateway::realtime::core::CANCELLED_BY_CALLER;
use askrelay_gateway::realtime::PeerId;
use tokio_util::sync::CancellationToken;

use relay_harness::*;

const LONG: Duration = Duration::from_secs(30);

fn answer(text: &str) -> CallResult {
    CallResult::success(Default::default(), vec![ContentItem::text(text)])
}

#[tokio::test]
async fn no_clients_fails_fast_without_pending_entry() {
    let router = router();
    let (_other, _rx) = connect(&router, "someone-else");

    let started = Instant::now();
    let res = router
        .submit(ask("anyone?"), "t", LONG, CancellationToken::new())
        .await;

    assert!(res.is_error);
    assert_eq!(res.error_code(), Some("no_clients"));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(router.pending().is_empty());
}

#[tokio::test]
async fn first_reply_wins_and_later_replies_drop() {
    let router = router();
    let (_a, mut rx_a) = connect(&router, "t");
    let (_b, mut rx_b) = connect(&router, "t");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("deploy?"), "t", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx_a).await);
    assert_eq!(prompt_id(&next(&mut rx_b).await), id);
    assert!(router.pending().contains(&id));

    assert!(router.handle_reply(&id, answer("yes")));
    assert!(!router.handle_reply(&id, answer("no")));

    let res = call.await.unwrap();
    assert_eq!(res, answer("yes"));
    assert!(router.pending().is_empty());
    assert_eq!(
        router
            .metrics()
            .submits
            .get(&[("verb", "AskQuestion"), ("outcome", "answered")]),
        1
    );
}

#[tokio::test]
async fn prompt_carries_id_token_and_timeout() {
    let router = router();
    let (_a, mut rx) = connect(&router, "t");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(report("done"), "t", Duration::from_secs(90), CancellationToken::new())
            .await
    });

    let env = next(&mut rx).await;
    let Envelope::WorkReport(req) = env.as_ref() else {
        panic!("expected WorkReport, got {}", env.command());
    };
    assert!(!req.id.is_empty());
    assert_eq!(req.user_token, "t");
    assert_eq!(req.request.timeout, 90);

    router.handle_reply(&req.id, answer("ack"));
    assert!(!call.await.unwrap().is_error);
}

#[tokio::test]
async fn timeout_resolves_and_broadcasts_one_cancellation() {
    let router = router();
    let (_a, mut rx) = connect(&router, "t");

    let started = Instant::now();
    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("still there?"), "t", Duration::from_millis(100), CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx).await);
    let res = call.await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(res.error_code(), Some("timeout"));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2));
    assert!(!router.pending().contains(&id));

    match next(&mut rx).await.as_ref() {
        Envelope::RequestCancelled(c) => {
            assert_eq!(c.request_id, id);
            assert_eq!(c.message_type, Verb::AskQuestion);
            assert!(c.reason.contains("timed out"));
        }
        other => panic!("expected RequestCancelled, got {}", other.command()),
    }
    assert_quiet(&mut rx);

    // a reply after the timeout changes nothing
    assert!(!router.handle_reply(&id, answer("late")));
}

#[tokio::test]
async fn caller_cancellation_mirrors_timeout() {
    let router = router();
    let (_a, mut rx) = connect(&router, "t");
    let cancel = CancellationToken::new();

    let r = router.clone();
    let token = cancel.clone();
    let call = tokio::spawn(async move { r.submit(ask("hello?"), "t", LONG, token).await });

    let id = prompt_id(&next(&mut rx).await);
    cancel.cancel();

    let res = call.await.unwrap();
    assert_eq!(res.error_code(), Some("cancelled"));
    assert_eq!(res.meta.get("message").map(String::as_str), Some(CANCELLED_BY_CALLER));

    match next(&mut rx).await.as_ref() {
        Envelope::RequestCancelled(c) => {
            assert_eq!(c.request_id, id);
            assert_eq!(c.reason, CANCELLED_BY_CALLER);
        }
        other => panic!("expected RequestCancelled, got {}", other.command()),
    }
    assert!(router.pending().is_empty());
}

#[tokio::test]
async fn dropping_the_call_cancels_the_request() {
    let router = router();
    let (_a, mut rx) = connect(&router, "t");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("anyone?"), "t", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx).await);
    call.abort();
    assert!(call.await.unwrap_err().is_cancelled());

    match next(&mut rx).await.as_ref() {
        Envelope::RequestCancelled(c) => assert_eq!(c.request_id, id),
        other => panic!("expected RequestCancelled, got {}", other.command()),
    }
    assert!(router.pending().is_empty());
}

#[tokio::test]
async fn explicit_cancel_reaches_caller_and_scope() {
    let router = router();
    let (_a, mut rx) = connect(&router, "t");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("merge?"), "t", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx).await);
    assert!(router.cancel_request(&id, "superseded").await);
    assert!(!router.cancel_request(&id, "superseded").await);

    let res = call.await.unwrap();
    assert_eq!(res.error_code(), Some("cancelled"));
    assert_eq!(res.meta.get("message").map(String::as_str), Some("superseded"));

    match next(&mut rx).await.as_ref() {
        Envelope::RequestCancelled(c) => assert_eq!(c.reason, "superseded"),
        other => panic!("expected RequestCancelled, got {}", other.command()),
    }
}

#[tokio::test]
async fn unknown_reply_is_dropped() {
    let router = router();
    assert!(!router.handle_reply("does-not-exist", answer("?")));
    assert_eq!(router.metrics().replies.get(&[("outcome", "unknown")]), 1);
}

#[tokio::test]
async fn delivery_is_scoped_by_token() {
    let router = router();
    let (_a, mut rx_a) = connect(&router, "t1");
    let (_b, mut rx_b) = connect(&router, "t2");
    let (_anon, mut rx_anon) = connect(&router, "");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("t1 only"), "t1", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx_a).await);
    assert_quiet(&mut rx_b);
    assert_quiet(&mut rx_anon);

    router.handle_reply(&id, answer("ok"));
    call.await.unwrap();

    // empty scope reaches only peers without a token
    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("unscoped"), "", LONG, CancellationToken::new())
            .await
    });
    let id = prompt_id(&next(&mut rx_anon).await);
    assert_quiet(&mut rx_a);
    assert_quiet(&mut rx_b);
    router.handle_reply(&id, answer("ok"));
    call.await.unwrap();
}

#[tokio::test]
async fn legacy_mode_sends_unscoped_requests_everywhere() {
    let router = legacy_router();
    let (_a, mut rx_a) = connect(&router, "t1");
    let (_b, mut rx_b) = connect(&router, "t2");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("everyone"), "", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx_a).await);
    assert_eq!(prompt_id(&next(&mut rx_b).await), id);
    router.handle_reply(&id, answer("ok"));
    assert!(!call.await.unwrap().is_error);
}

#[tokio::test]
async fn wedged_peer_is_evicted_without_delaying_others() {
    let router = router();
    let (wedged, _wedged_rx) = connect_with_capacity(&router, "t", 1);
    let (_healthy, mut rx) = connect(&router, "t");
    assert!(wedged.enqueue(Arc::new(Envelope::GetOnlineUsers)));

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("who's there?"), "t", LONG, CancellationToken::new())
            .await
    });

    let id = prompt_id(&next(&mut rx).await);
    assert!(!wedged.is_active());
    assert!(router.registry().find(wedged.id()).is_none());
    assert_eq!(router.registry().len(), 1);
    assert_eq!(router.metrics().peer_evictions.get(&[]), 1);

    router.handle_reply(&id, answer("me"));
    assert_eq!(call.await.unwrap(), answer("me"));
}

#[tokio::test]
async fn broadcast_except_skips_excluded_peer() {
    let router = router();
    let (a, mut rx_a) = connect(&router, "t");
    let (_b, mut rx_b) = connect(&router, "t");

    let fan = router
        .broadcast_except(
            Envelope::GetOnlineUsers,
            &router.scope_for("t"),
            Some(a.id()),
        )
        .await;

    assert_eq!(fan.delivered, 1);
    assert_eq!(fan.evicted, 0);
    assert_eq!(next(&mut rx_b).await.command(), "GetOnlineUsers");
    assert_quiet(&mut rx_a);
}

#[tokio::test]
async fn chat_is_point_to_point_within_a_token() {
    let router = router();
    let (a, mut rx_a) = connect(&router, "t");
    let (b, mut rx_b) = connect(&router, "t");
    let (c, mut rx_c) = connect(&router, "other");

    let msg = router.relay_chat(a.id(), b.id(), "lunch?").unwrap();
    assert!(msg.message_id.starts_with("chat_"));
    assert_eq!(msg.sender_nickname, "nick-t");

    match next(&mut rx_b).await.as_ref() {
        Envelope::ChatMessageNotification(m) => {
            assert_eq!(m.content, "lunch?");
            assert_eq!(m.sender_client_id, a.id().to_string());
        }
        other => panic!("expected chat, got {}", other.command()),
    }
    assert_quiet(&mut rx_a);

    let err = router.relay_chat(a.id(), c.id(), "psst").unwrap_err();
    assert_eq!(err.code().as_str(), "scope_mismatch");
    assert_quiet(&mut rx_c);

    let ghost = PeerId::from("ghost");
    let err = router.relay_chat(a.id(), &ghost, "hello?").unwrap_err();
    assert_eq!(err.code().as_str(), "not_found");
}

#[tokio::test]
async fn pending_and_validity_queries_follow_the_table() {
    let router = router();
    let (a, mut rx) = connect(&router, "t");
    let (stranger, _rx_s) = connect(&router, "u");

    let r = router.clone();
    let call = tokio::spawn(async move {
        r.submit(ask("pending?"), "t", LONG, CancellationToken::new())
            .await
    });
    let id = prompt_id(&next(&mut rx).await);

    match router.pending_query(&a) {
        Envelope::GetPendingMessagesResponse(p) => {
            assert_eq!(p.messages.len(), 1);
            assert_eq!(p.messages[0].prompt.id(), id);
        }
        other => panic!("unexpected {}", other.command()),
    }
    match router.pending_query(&stranger) {
        Envelope::GetPendingMessagesResponse(p) => assert!(p.messages.is_empty()),
        other => panic!("unexpected {}", other.command()),
    }

    router.handle_reply(&id, answer("done"));
    call.await.unwrap();

    match router.validity_query(&[id.clone()]) {
        Envelope::CheckMessageValidityResponse(v) => assert_eq!(v.validity.get(&id), Some(&false)),
        other => panic!("unexpected {}", other.command()),
    }
}

#[tokio::test]
async fn login_and_disconnect_announce_presence() {
    let router = router();
    let (watcher, mut rx_w) = connect(&router, "t");
    let (newcomer, mut rx_n) = connect(&router, "");

    router.login(&newcomer, "t", Some("dana")).await;
    match next(&mut rx_w).await.as_ref() {
        Envelope::UserConnectionStatusNotification(s) => {
            assert_eq!(s.status, PresenceStatus::Connected);
            assert_eq!(s.user.client_id, newcomer.id().to_string());
            assert_eq!(s.user.nickname, "dana");
        }
        other => panic!("unexpected {}", other.command()),
    }
    assert_quiet(&mut rx_n);

    match router.presence_query(&watcher) {
        Envelope::GetOnlineUsersResponse(u) => {
            assert_eq!(u.users.len(), 1);
            assert_eq!(u.users[0].nickname, "dana");
        }
        other => panic!("unexpected {}", other.command()),
    }

    router.disconnect(&newcomer).await;
    match next(&mut rx_w).await.as_ref() {
        Envelope::UserConnectionStatusNotification(s) => {
            assert_eq!(s.status, PresenceStatus::Disconnected)
        }
        other => panic!("unexpected {}", other.command()),
    }
    assert!(router.registry().find(newcomer.id()).is_none());
}
