//! Tests for the reducer

use crossterm::event::KeyCode;

use super::{FILES, ctrl, key, reviewed_state, started_turn, test_state, type_text};
use crate::runner::INITIAL_REVIEW_PROMPT;
use crate::store::Role;
use crate::stream::{PruneError, StreamError};
use crate::studio::events::{SideEffect, StudioEvent};
use crate::studio::reducer::{reduce, request_prune, start_initial_review};
use crate::studio::state::{CANCELLED, NotificationLevel, SessionState};

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_initial_review_starts_loading() {
    let mut state = test_state();
    let effects = start_initial_review(&mut state);

    assert_eq!(state.state, SessionState::Loading);
    assert!(state.is_streaming());
    match effects.as_slice() {
        [SideEffect::StartTurn { request, .. }] => {
            assert_eq!(request.prompt, INITIAL_REVIEW_PROMPT);
            assert_eq!(request.system_prompt, state.context.prompt());
            assert_eq!(request.session_id, state.session_id);
        }
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn test_chunks_then_done_commits_text_once() {
    let mut state = test_state();
    let (op, _) = started_turn(&start_initial_review(&mut state));

    for text in ["Hello", " world", "!"] {
        let _ = reduce(
            &mut state,
            StudioEvent::StreamChunk {
                op,
                text: text.to_string(),
            },
        );
    }
    assert_eq!(state.state, SessionState::Reviewing);
    assert_eq!(state.chat.streaming.as_deref(), Some("Hello world!"));

    let _ = reduce(
        &mut state,
        StudioEvent::StreamDone {
            op,
            text: "Hello world!".to_string(),
        },
    );

    assert!(!state.is_streaming());
    assert!(state.chat.streaming.is_none());
    assert_eq!(state.chat.turns.len(), 1);
    assert_eq!(state.chat.turns[0].content, "Hello world!");
    assert_eq!(state.chat.transcript_text().matches("Hello world!").count(), 1);
}

#[test]
fn test_done_text_overrides_streamed_text() {
    let mut state = test_state();
    let (op, _) = started_turn(&start_initial_review(&mut state));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op,
            text: "Hello wrld".to_string(),
        },
    );
    let _ = reduce(
        &mut state,
        StudioEvent::StreamDone {
            op,
            text: "Hello world".to_string(),
        },
    );
    assert_eq!(state.chat.latest_response(), Some("Hello world"));
}

#[test]
fn test_cancel_keeps_partial_text() {
    let mut state = test_state();
    let (op, cancel) = started_turn(&start_initial_review(&mut state));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op,
            text: "Hel".to_string(),
        },
    );

    let effects = reduce(&mut state, ctrl('x'));

    assert!(effects.is_empty());
    assert!(cancel.is_cancelled());
    assert!(!state.is_streaming());
    assert_eq!(state.state, SessionState::Error(CANCELLED.to_string()));
    assert!(state.chat.transcript_text().contains("Hel"));
    assert!(state.chat.turns[0].interrupted);

    // The pump's late cancellation report changes nothing
    let _ = reduce(
        &mut state,
        StudioEvent::StreamFailed {
            op,
            error: StreamError::Cancelled,
        },
    );
    assert_eq!(state.chat.turns.len(), 1);
}

#[test]
fn test_cancel_while_loading_without_text() {
    let mut state = test_state();
    let _ = start_initial_review(&mut state);
    let _ = reduce(&mut state, ctrl('x'));

    assert_eq!(state.state, SessionState::Error(CANCELLED.to_string()));
    assert!(state.chat.turns.is_empty());
}

#[test]
fn test_cancel_is_idempotent() {
    let mut state = test_state();
    let (_, cancel) = started_turn(&start_initial_review(&mut state));

    let _ = reduce(&mut state, ctrl('x'));
    let _ = reduce(&mut state, ctrl('x'));
    cancel.cancel();

    assert!(cancel.is_cancelled());
    assert_eq!(
        state.current_notification().map(|n| n.message.as_str()),
        Some("Nothing to cancel")
    );
}

#[test]
fn test_cancel_with_nothing_active_notifies() {
    let mut state = reviewed_state("All good.");
    let effects = reduce(&mut state, ctrl('x'));

    assert!(effects.is_empty());
    assert_eq!(state.state, SessionState::Reviewing);
    let notification = state.current_notification().expect("notification");
    assert_eq!(notification.level, NotificationLevel::Info);
    assert_eq!(notification.message, "Nothing to cancel");
}

#[test]
fn test_model_error_keeps_transcript() {
    let mut state = reviewed_state("First review.");
    let _ = reduce(&mut state, key(KeyCode::Char('c')));
    type_text(&mut state, "why?");
    let (op, _) = started_turn(&reduce(&mut state, key(KeyCode::Enter)));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamFailed {
            op,
            error: StreamError::Model("connection reset".to_string()),
        },
    );

    assert!(matches!(state.state, SessionState::Error(ref m) if m.contains("connection reset")));
    assert!(state.chat.transcript_text().contains("First review."));
    assert!(!state.is_streaming());
}

#[test]
fn test_safety_block_rolls_back_turn() {
    let mut state = reviewed_state("First review.");
    let _ = reduce(&mut state, key(KeyCode::Char('c')));
    type_text(&mut state, "something unsafe");
    let (op, _) = started_turn(&reduce(&mut state, key(KeyCode::Enter)));
    assert_eq!(state.chat.turns.len(), 2);

    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op,
            text: "I can".to_string(),
        },
    );
    let _ = reduce(
        &mut state,
        StudioEvent::StreamFailed {
            op,
            error: StreamError::SafetyBlocked("content_filter".to_string()),
        },
    );

    assert_eq!(state.chat.turns.len(), 1);
    assert!(state.chat.streaming.is_none());
    assert!(!state.chat.transcript_text().contains("something unsafe"));
    assert!(matches!(state.state, SessionState::Error(_)));
}

#[test]
fn test_stale_op_events_dropped() {
    let mut state = test_state();
    let (first, _) = started_turn(&start_initial_review(&mut state));
    let _ = reduce(&mut state, ctrl('x'));

    let _ = reduce(&mut state, key(KeyCode::Char('c')));
    type_text(&mut state, "again");
    let (second, _) = started_turn(&reduce(&mut state, key(KeyCode::Enter)));
    assert_ne!(first, second);

    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op: first,
            text: "stale".to_string(),
        },
    );
    let _ = reduce(
        &mut state,
        StudioEvent::StreamDone {
            op: first,
            text: "stale".to_string(),
        },
    );

    assert!(state.is_streaming());
    assert!(!state.chat.transcript_text().contains("stale"));
}

#[test]
fn test_streaming_blocks_submission() {
    let mut state = test_state();
    let _ = start_initial_review(&mut state);
    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op: 1,
            text: "Partial".to_string(),
        },
    );

    let _ = reduce(&mut state, key(KeyCode::Char('c')));
    assert_eq!(state.state, SessionState::Chatting);
    type_text(&mut state, "follow up");
    let effects = reduce(&mut state, key(KeyCode::Enter));

    assert!(effects.is_empty());
    assert_eq!(state.input, "follow up");
    assert_eq!(
        state.current_notification().map(|n| n.level),
        Some(NotificationLevel::Warning)
    );
}

#[test]
fn test_submission_after_completion() {
    let mut state = reviewed_state("Looks fine.");
    let _ = reduce(&mut state, key(KeyCode::Char('i')));
    type_text(&mut state, "  what about tests?  ");
    let effects = reduce(&mut state, key(KeyCode::Enter));

    match effects.as_slice() {
        [SideEffect::StartTurn { request, .. }] => {
            assert_eq!(request.prompt, "what about tests?");
        }
        other => panic!("unexpected effects: {other:?}"),
    }
    assert!(state.input.is_empty());
    assert_eq!(state.chat.turns.last().map(|t| t.role), Some(Role::User));
    assert_eq!(state.prompt_history.len(), 1);
}

#[test]
fn test_quit_cancels_everything() {
    let mut state = test_state();
    let (_, cancel) = started_turn(&start_initial_review(&mut state));
    let effects = reduce(&mut state, key(KeyCode::Char('q')));

    assert!(effects.iter().any(|e| matches!(e, SideEffect::Quit)));
    assert_eq!(state.state, SessionState::Quitting);
    assert!(cancel.is_cancelled());
}

// ─────────────────────────────────────────────────────────────────────────────
// Pruning
// ─────────────────────────────────────────────────────────────────────────────

fn prune_handles(state: &mut crate::studio::state::StudioState) -> Vec<crate::stream::CancelHandle> {
    FILES
        .iter()
        .flat_map(|path| request_prune(state, path))
        .filter_map(|effect| match effect {
            SideEffect::StartPrune { cancel, .. } => Some(cancel),
            _ => None,
        })
        .collect()
}

#[test]
fn test_cancel_all_prunes_before_completion() {
    let mut state = reviewed_state("Review.");
    let handles = prune_handles(&mut state);
    assert_eq!(handles.len(), 3);
    assert_eq!(state.pruning.len(), 3);

    let _ = reduce(&mut state, ctrl('x'));

    assert!(handles.iter().all(|h| h.is_cancelled()));
    assert!(state.pruning.is_empty());
    assert!(state.context.pruned().is_empty());

    // A summary racing the cancellation is discarded
    let _ = reduce(
        &mut state,
        StudioEvent::PruneSucceeded {
            path: FILES[0].to_string(),
            summary: "Late.".to_string(),
        },
    );
    assert!(state.context.pruned().is_empty());
}

#[test]
fn test_prune_success_updates_prompt() {
    let mut state = reviewed_state("Review.");
    let before = state.context.token_estimate();
    let _ = request_prune(&mut state, FILES[1]);

    let _ = reduce(
        &mut state,
        StudioEvent::PruneSucceeded {
            path: FILES[1].to_string(),
            summary: "Defines the beta helpers.".to_string(),
        },
    );

    assert!(state.pruning.is_empty());
    assert_eq!(state.context.pruned().get(FILES[1]), Some("Defines the beta helpers."));
    assert!(state.context.prompt().contains("[pruned] Defines the beta helpers."));
    assert!(state.context.token_estimate() < before);
}

#[test]
fn test_prune_is_noop_when_pruned_or_pruning() {
    let mut state = reviewed_state("Review.");
    assert_eq!(request_prune(&mut state, FILES[0]).len(), 1);
    assert!(request_prune(&mut state, FILES[0]).is_empty());

    let _ = reduce(
        &mut state,
        StudioEvent::PruneSucceeded {
            path: FILES[0].to_string(),
            summary: "Alpha.".to_string(),
        },
    );
    assert!(request_prune(&mut state, FILES[0]).is_empty());
    assert!(state.pruning.is_empty());
    assert_eq!(state.context.pruned().len(), 1);
}

#[test]
fn test_prune_unknown_file_starts_nothing() {
    let mut state = reviewed_state("Review.");
    assert!(request_prune(&mut state, "src/missing.rs").is_empty());
    assert_eq!(
        state.current_notification().map(|n| n.level),
        Some(NotificationLevel::Error)
    );
}

#[test]
fn test_prune_failures_reported_by_kind() {
    let mut state = reviewed_state("Review.");
    let _ = request_prune(&mut state, FILES[0]);
    let _ = request_prune(&mut state, FILES[1]);

    let _ = reduce(
        &mut state,
        StudioEvent::PruneFailed {
            path: FILES[0].to_string(),
            error: PruneError::Cancelled,
        },
    );
    assert_eq!(
        state.current_notification().map(|n| n.level),
        Some(NotificationLevel::Info)
    );

    let _ = reduce(
        &mut state,
        StudioEvent::PruneFailed {
            path: FILES[1].to_string(),
            error: PruneError::MissingCredential {
                provider: "openai".to_string(),
            },
        },
    );
    assert_eq!(
        state.current_notification().map(|n| n.level),
        Some(NotificationLevel::Error)
    );
    assert!(state.pruning.is_empty());
    assert!(state.context.pruned().is_empty());
}

#[test]
fn test_pruning_independent_of_streaming() {
    let mut state = test_state();
    let _ = start_initial_review(&mut state);
    assert_eq!(request_prune(&mut state, FILES[2]).len(), 1);
    assert!(state.is_streaming());
}

// ─────────────────────────────────────────────────────────────────────────────
// Yank chord
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_yank_chord_copies_transcript() {
    let mut state = reviewed_state("Copy me.");

    let first = reduce(&mut state, key(KeyCode::Char('y')));
    assert!(matches!(first.as_slice(), [SideEffect::ScheduleYankTimeout { .. }]));
    assert!(state.yank.is_armed());

    let second = reduce(&mut state, key(KeyCode::Char('y')));
    match second.as_slice() {
        [SideEffect::CopyToClipboard { label, text }] => {
            assert_eq!(*label, "transcript");
            assert!(text.contains("Copy me."));
        }
        other => panic!("unexpected effects: {other:?}"),
    }
    assert!(!state.yank.is_armed());
}

#[test]
fn test_yank_timeout_disarms_without_copy() {
    let mut state = reviewed_state("Copy me.");
    let effects = reduce(&mut state, key(KeyCode::Char('y')));
    let Some(SideEffect::ScheduleYankTimeout { token, after }) = effects.into_iter().next() else {
        panic!("expected a timeout");
    };
    assert_eq!(after, state.config.ui.yank_chord_timeout());

    let effects = reduce(&mut state, StudioEvent::YankTimeout { token });
    assert!(effects.is_empty());
    assert!(!state.yank.is_armed());

    // The next press starts over
    let effects = reduce(&mut state, key(KeyCode::Char('y')));
    assert!(matches!(effects.as_slice(), [SideEffect::ScheduleYankTimeout { .. }]));
}

#[test]
fn test_yank_latest_copies_only_last_response() {
    let mut state = reviewed_state("First answer.");
    let _ = reduce(&mut state, key(KeyCode::Char('c')));
    type_text(&mut state, "more?");
    let (op, _) = started_turn(&reduce(&mut state, key(KeyCode::Enter)));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamDone {
            op,
            text: "Second answer.".to_string(),
        },
    );
    let _ = reduce(&mut state, key(KeyCode::Esc));

    // Armed chord does not change what Y copies
    let _ = reduce(&mut state, key(KeyCode::Char('y')));
    let effects = reduce(&mut state, key(KeyCode::Char('Y')));
    match effects.as_slice() {
        [SideEffect::CopyToClipboard { text, .. }] => assert_eq!(text, "Second answer."),
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn test_clipboard_result_notifies() {
    let mut state = reviewed_state("x");
    let _ = reduce(
        &mut state,
        StudioEvent::ClipboardResult {
            label: "transcript",
            result: Err("no display".to_string()),
        },
    );
    assert_eq!(
        state.current_notification().map(|n| n.level),
        Some(NotificationLevel::Error)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_save_key_emits_snapshot() {
    let mut state = reviewed_state("Saved text.");
    state.save_name = Some("mine".to_string());
    let effects = reduce(&mut state, key(KeyCode::Char('s')));

    match effects.as_slice() {
        [SideEffect::SaveSnapshot(snapshot)] => {
            assert_eq!(snapshot.name, "mine");
            assert_eq!(snapshot.turns.len(), 1);
            assert_eq!(snapshot.system_prompt, state.context.prompt());
            assert_eq!(snapshot.model, state.model);
        }
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn test_unnamed_save_uses_timestamp() {
    let mut state = reviewed_state("Saved text.");
    let effects = reduce(&mut state, key(KeyCode::Char('s')));
    match effects.as_slice() {
        [SideEffect::SaveSnapshot(snapshot)] => assert!(snapshot.name.starts_with("review-")),
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn test_exit_save_keeps_interrupted_conversation() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut state = test_state();
    let (op, _) = started_turn(&start_initial_review(&mut state));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamChunk {
            op,
            text: "Half a review".to_string(),
        },
    );
    let _ = reduce(&mut state, ctrl('x'));

    let saved = crate::studio::app::save_on_exit_to(&state, "on-exit", || {
        crate::snapshot::SnapshotStore::new(dir.path())
    });
    let path = saved.expect("non-empty chat is saved").expect("save");
    assert!(path.ends_with("on-exit.json"));

    let loaded = crate::snapshot::SnapshotStore::new(dir.path())
        .and_then(|store| store.load("on-exit"))
        .expect("load")
        .expect("present");
    assert_eq!(loaded.turns.len(), 1);
    assert!(loaded.turns[0].interrupted);
}

#[test]
fn test_exit_save_skips_empty_conversation() {
    let state = test_state();
    let saved = crate::studio::app::save_on_exit_to(&state, "empty", || {
        anyhow::bail!("store should not be opened")
    });
    assert!(saved.is_none());
}
