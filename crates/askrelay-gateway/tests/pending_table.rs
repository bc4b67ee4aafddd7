#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use askrelay_core::protocol::envelope::{AskQuestionRequest, QuestionBody};
use askrelay_core::protocol::{CallResult, ContentItem, Prompt};
use askrelay_gateway::realtime::core::{PendingEntry, PendingTable};
use askrelay_gateway::realtime::Scope;

fn prompt(id: &str, token: &str) -> Prompt {
    Prompt::AskQuestion(AskQuestionRequest {
        id: id.into(),
        user_token: token.into(),
        request: QuestionBody {
            project_directory: "/srv/app".into(),
            question: "ship it?".into(),
            timeout: 60,
        },
    })
}

fn entry(id: &str, token: &str) -> (PendingEntry, tokio::sync::oneshot::Receiver<CallResult>) {
    PendingEntry::new(prompt(id, token), token, Duration::from_secs(60))
}

#[test]
fn duplicate_insert_is_rejected() {
    let table = PendingTable::new();
    let (a, _rx_a) = entry("r1", "t");
    let (b, _rx_b) = entry("r1", "t");

    table.insert("r1", a).unwrap();
    let err = table.insert("r1", b).expect_err("duplicate");
    assert_eq!(err.code().as_str(), "duplicate_request");
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn resolve_delivers_exactly_once() {
    let table = PendingTable::new();
    let (e, rx) = entry("r1", "t");
    table.insert("r1", e).unwrap();

    let answer = CallResult::success(Default::default(), vec![ContentItem::text("yes")]);
    assert!(table.resolve("r1", answer.clone()).is_some());
    assert!(table.resolve("r1", CallResult::default()).is_none());
    assert!(table.cancel("r1").is_none());
    assert!(table.is_empty());

    assert_eq!(rx.await.unwrap(), answer);
}

#[test]
fn cancel_wins_over_late_resolve() {
    let table = PendingTable::new();
    let (e, _rx) = entry("r1", "t");
    table.insert("r1", e).unwrap();

    let removed = table.cancel("r1").expect("pending");
    assert_eq!(removed.token, "t");
    assert_eq!(removed.prompt.id(), "r1");
    assert!(table.resolve("r1", CallResult::default()).is_none());
}

#[test]
fn resolve_of_missing_id_is_harmless() {
    let table = PendingTable::new();
    assert!(table.resolve("nope", CallResult::default()).is_none());
    assert!(!table.contains("nope"));
}

#[test]
fn bulk_validity() {
    let table = PendingTable::new();
    let (e, _rx) = entry("live", "t");
    table.insert("live", e).unwrap();

    let ids = vec!["live".to_string(), "gone".to_string()];
    let validity = table.contains_all(&ids);
    assert_eq!(validity.get("live"), Some(&true));
    assert_eq!(validity.get("gone"), Some(&false));
}

#[test]
fn messages_are_scoped_and_oldest_first() {
    let table = PendingTable::new();
    let mut receivers = Vec::new();
    for (id, token) in [("a1", "a"), ("b1", "b"), ("a2", "a")] {
        let (e, rx) = entry(id, token);
        receivers.push(rx);
        table.insert(id, e).unwrap();
        std::thread::sleep(Duration::from_millis(2));
    }

    let ids: Vec<String> = table
        .messages_for(&Scope::Token("a".into()))
        .into_iter()
        .map(|m| m.prompt.id().to_string())
        .collect();
    assert_eq!(ids, vec!["a1", "a2"]);

    assert_eq!(table.messages_for(&Scope::Global).len(), 3);
    assert!(table.messages_for(&Scope::Token(String::new())).is_empty());
}
