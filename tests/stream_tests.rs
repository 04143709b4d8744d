#![allow(clippy::unwrap_used)]

use revu::runner::{TurnError, TurnRequest, TurnRunner};
use revu::store::{MessageStore, SessionId};
use revu::stream::{StreamCoordinator, StreamError, StreamEvent, StreamHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use test_utils::{ScriptedRunner, Step, TestStore, fast_settings};

fn coordinator(store: &Arc<TestStore>, runner: Arc<dyn TurnRunner>) -> StreamCoordinator {
    StreamCoordinator::new(
        Arc::clone(store) as Arc<dyn MessageStore>,
        runner,
        CancellationToken::new(),
        fast_settings(),
    )
}

fn scripted(store: &Arc<TestStore>, steps: Vec<Step>) -> StreamCoordinator {
    let runner = ScriptedRunner::new(Arc::clone(store), steps);
    coordinator(store, runner)
}

/// Drain a handle, failing the test if it does not finish in time
async fn collect(handle: &mut StreamHandle) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = handle.next().await {
            events.push(event);
        }
    })
    .await
    .expect("stream did not finish");
    events
}

fn chunk_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_chunks_arrive_in_order_then_done() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![
            Step::Grow("Hello"),
            Step::Grow("Hello, world"),
            Step::Grow("Hello, world!"),
        ],
    );
    let session = SessionId::new();

    let mut handle = streams.start(TurnRequest::new(session, "sys", "Review please"));
    let events = collect(&mut handle).await;

    assert_eq!(chunk_text(&events), "Hello, world!");
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Done("Hello, world!".to_string()))
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Done(_)))
            .count(),
        1
    );

    let messages = store.list(session).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Review please");
}

#[tokio::test]
async fn test_redelivered_content_is_not_duplicated() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![
            Step::Grow("Hel"),
            Step::Publish("Hel"),
            Step::Grow("Hello"),
            Step::Publish("Hello"),
        ],
    );

    let mut handle = streams.start(TurnRequest::new(SessionId::new(), "sys", "q"));
    let events = collect(&mut handle).await;

    assert_eq!(chunk_text(&events), "Hello");
    assert_eq!(events.last(), Some(&StreamEvent::Done("Hello".to_string())));
}

#[tokio::test]
async fn test_store_text_overrides_streamed_text() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![Step::Grow("Draft answer"), Step::Store("Final answer.")],
    );

    let mut handle = streams.start(TurnRequest::new(SessionId::new(), "sys", "q"));
    let events = collect(&mut handle).await;

    assert_eq!(chunk_text(&events), "Draft answer");
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Done("Final answer.".to_string()))
    );
}

#[tokio::test]
async fn test_reconciliation_retries_once() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![
            Step::Grow("streamed"),
            Step::Store("stored"),
            Step::FailLists(1),
        ],
    );

    let mut handle = streams.start(TurnRequest::new(SessionId::new(), "sys", "q"));
    let events = collect(&mut handle).await;

    assert_eq!(events.last(), Some(&StreamEvent::Done("stored".to_string())));
}

#[tokio::test]
async fn test_unreadable_store_falls_back_to_streamed_text() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![
            Step::Grow("streamed"),
            Step::Store("stored"),
            Step::FailLists(2),
        ],
    );

    let mut handle = streams.start(TurnRequest::new(SessionId::new(), "sys", "q"));
    let events = collect(&mut handle).await;

    assert_eq!(
        events.last(),
        Some(&StreamEvent::Done("streamed".to_string()))
    );
}

#[tokio::test]
async fn test_later_turn_reports_only_its_own_reply() {
    let store = TestStore::new();
    let session = SessionId::new();

    let first = scripted(&store, vec![Step::Grow("First reply.")]);
    let mut handle = first.start(TurnRequest::new(session, "sys", "one"));
    collect(&mut handle).await;

    let second = scripted(&store, vec![Step::Grow("Second reply.")]);
    let mut handle = second.start(TurnRequest::new(session, "sys", "two"));
    let events = collect(&mut handle).await;

    assert_eq!(chunk_text(&events), "Second reply.");
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Done("Second reply.".to_string()))
    );
    assert_eq!(store.list(session).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_runner_error_ends_without_done_and_rolls_back() {
    let store = TestStore::new();
    let streams = scripted(
        &store,
        vec![
            Step::Grow("partial"),
            Step::Fail(TurnError::Transport("connection reset".to_string())),
        ],
    );
    let session = SessionId::new();

    let mut handle = streams.start(TurnRequest::new(session, "sys", "q"));
    let events = collect(&mut handle).await;

    assert_eq!(
        events.last(),
        Some(&StreamEvent::Error(StreamError::Model(
            "connection reset".to_string()
        )))
    );
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done(_))));
    assert!(store.list(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_safety_block_is_typed_and_rolls_back() {
    let store = TestStore::new();
    let session = SessionId::new();

    let first = scripted(&store, vec![Step::Grow("Fine.")]);
    let mut handle = first.start(TurnRequest::new(session, "sys", "one"));
    collect(&mut handle).await;

    let blocked = scripted(
        &store,
        vec![Step::Fail(TurnError::SafetyBlocked("policy".to_string()))],
    );
    let mut handle = blocked.start(TurnRequest::new(session, "sys", "two"));
    let events = collect(&mut handle).await;

    assert!(matches!(
        events.last(),
        Some(StreamEvent::Error(StreamError::SafetyBlocked(_)))
    ));
    let messages = store.list(session).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Fine.");
}

#[tokio::test]
async fn test_cancel_mid_stream_ends_promptly() {
    let store = TestStore::new();
    let streams = scripted(&store, vec![Step::Grow("Hel"), Step::Hang]);
    let session = SessionId::new();

    let mut handle = streams.start(TurnRequest::new(session, "sys", "q"));
    let first = tokio::time::timeout(Duration::from_secs(2), handle.next())
        .await
        .expect("no first chunk");
    assert_eq!(first, Some(StreamEvent::Chunk("Hel".to_string())));

    handle.cancel_handle().cancel();
    handle.cancel_handle().cancel();
    let rest = collect(&mut handle).await;

    assert!(
        rest.iter()
            .all(|e| !matches!(e, StreamEvent::Done(_) | StreamEvent::Error(_)))
    );
    assert!(store.list(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_root_cancel_stops_every_turn() {
    let store = TestStore::new();
    let root = CancellationToken::new();
    let streams = StreamCoordinator::new(
        Arc::clone(&store) as Arc<dyn MessageStore>,
        ScriptedRunner::new(Arc::clone(&store), vec![Step::Hang]),
        root.clone(),
        fast_settings(),
    );

    let mut a = streams.start(TurnRequest::new(SessionId::new(), "sys", "a"));
    let mut b = streams.start(TurnRequest::new(SessionId::new(), "sys", "b"));
    root.cancel();

    assert!(collect(&mut a).await.is_empty());
    assert!(collect(&mut b).await.is_empty());
    assert!(a.cancel_handle().is_cancelled());
    assert!(b.cancel_handle().is_cancelled());
}

#[tokio::test]
async fn test_cancelled_turn_retires_before_next_turn_writes() {
    for _ in 0..20 {
        let store = TestStore::new();
        let runner = ScriptedRunner::sequence(
            Arc::clone(&store),
            vec![
                vec![Step::Grow("Hel"), Step::Hang],
                vec![Step::Grow("Answer B")],
            ],
        );
        let streams = coordinator(&store, runner);
        let session = SessionId::new();

        let mut first = streams.start(TurnRequest::new(session, "sys", "question A"));
        let chunk = tokio::time::timeout(Duration::from_secs(2), first.next())
            .await
            .expect("no first chunk");
        assert_eq!(chunk, Some(StreamEvent::Chunk("Hel".to_string())));

        first.cancel_handle().cancel();
        let mut second = streams.start(TurnRequest::new(session, "sys", "question B"));
        let events = collect(&mut second).await;
        assert_eq!(chunk_text(&events), "Answer B");
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Done("Answer B".to_string()))
        );
        assert!(collect(&mut first).await.is_empty());

        let contents: Vec<String> = store
            .list(session)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["question B", "Answer B"]);
    }
}

#[tokio::test]
async fn test_turn_cancelled_while_queued_never_runs() {
    let store = TestStore::new();
    let runner = ScriptedRunner::sequence(
        Arc::clone(&store),
        vec![vec![Step::Pause(Duration::from_millis(100)), Step::Grow("A")]],
    );
    let streams = coordinator(&store, Arc::clone(&runner) as Arc<dyn TurnRunner>);
    let session = SessionId::new();

    let mut first = streams.start(TurnRequest::new(session, "sys", "a"));
    let mut queued = streams.start(TurnRequest::new(session, "sys", "b"));
    queued.cancel_handle().cancel();

    assert!(collect(&mut queued).await.is_empty());
    assert_eq!(
        collect(&mut first).await.last(),
        Some(&StreamEvent::Done("A".to_string()))
    );
    assert_eq!(runner.runs.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_stops_yielding() {
    let store = TestStore::new();
    let streams = scripted(&store, vec![Step::Pause(Duration::from_millis(50))]);

    let mut handle = streams.start(TurnRequest::new(SessionId::new(), "sys", "q"));
    handle.close();
    assert_eq!(handle.next().await, None);
    assert!(handle.cancel_handle().is_cancelled());
}
