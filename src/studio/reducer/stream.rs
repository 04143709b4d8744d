//! Main-transcript transitions: starting turns, applying their results,
//! cancelling, yanking and saving.

use chrono::Local;

use super::prune::cancel_all_prunes;
use crate::runner::{INITIAL_REVIEW_PROMPT, TurnRequest};
use crate::studio::events::{OpId, SideEffect};
use crate::studio::state::{ActiveTurn, CANCELLED, Notification, SessionState, StudioState};
use crate::studio::yank::YankPress;
use crate::log_debug;
use crate::stream::StreamError;

// ═══════════════════════════════════════════════════════════════════════════════
// Starting turns
// ═══════════════════════════════════════════════════════════════════════════════

/// Kick off the initial review; the session sits in `Loading` until text arrives
pub fn start_initial_review(state: &mut StudioState) -> Vec<SideEffect> {
    state.state = SessionState::Loading;
    let turns_before = state.chat.turns.len();
    vec![begin_turn(state, INITIAL_REVIEW_PROMPT.to_string(), turns_before)]
}

/// Submit the chat input as a follow-up question
pub fn submit_chat(state: &mut StudioState) -> Vec<SideEffect> {
    if state.is_streaming() {
        state.notify(Notification::warning(
            "A response is still streaming (Ctrl+X to cancel)",
        ));
        return Vec::new();
    }

    let prompt = state.input.trim().to_string();
    if prompt.is_empty() {
        return Vec::new();
    }

    state.input.clear();
    state.prompt_history.push(&prompt);
    let turns_before = state.chat.turns.len();
    state.chat.push_user(prompt.clone());
    vec![begin_turn(state, prompt, turns_before)]
}

/// Register a new active operation and describe the turn to run
fn begin_turn(state: &mut StudioState, prompt: String, turns_before: usize) -> SideEffect {
    let op = state.allocate_op();
    let cancel = state.new_cancel_handle();
    state.active = Some(ActiveTurn {
        op,
        cancel: cancel.clone(),
        turns_before,
    });

    state.chat.begin_response();
    state.follow_tail();
    state.mark_dirty();
    log_debug!("Starting turn op={} ({} chars)", op, prompt.len());

    let request = TurnRequest::new(state.session_id, state.context.prompt(), prompt);
    SideEffect::StartTurn {
        op,
        request,
        cancel,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stream results
// ═══════════════════════════════════════════════════════════════════════════════

pub(super) fn chunk(state: &mut StudioState, op: OpId, text: &str) {
    if !state.is_active_op(op) {
        log_debug!("Dropping chunk from stale op={}", op);
        return;
    }
    state.chat.append_chunk(text);
    state.finish_loading();
    state.refresh_search();
    state.follow_tail();
    state.mark_dirty();
}

/// The reconciled text replaces whatever was streamed
pub(super) fn done(state: &mut StudioState, op: OpId, text: String) {
    if !state.is_active_op(op) {
        log_debug!("Dropping completion from stale op={}", op);
        return;
    }
    state.active = None;
    state.chat.finish_response(text);
    state.finish_loading();
    state.refresh_search();
    state.follow_tail();
    state.mark_dirty();
}

pub(super) fn failed(state: &mut StudioState, op: OpId, error: &StreamError) {
    let Some(active) = state.active.take_if(|a| a.op == op) else {
        log_debug!("Dropping failure from stale op={}: {}", op, error);
        return;
    };

    match error {
        StreamError::SafetyBlocked(_) => {
            // The withheld exchange disappears from the transcript entirely
            state.chat.rollback(active.turns_before);
            state.enter_error(error.to_string());
        }
        StreamError::Cancelled => {
            state.chat.interrupt_response();
            state.enter_error(CANCELLED);
        }
        StreamError::Model(_) | StreamError::Config(_) => {
            state.chat.interrupt_response();
            state.enter_error(error.to_string());
        }
    }
    state.refresh_search();
    state.follow_tail();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════════════════════════

/// Cancel the active turn and every prune in one step
pub fn cancel_all(state: &mut StudioState) -> Vec<SideEffect> {
    let turn_cancelled = cancel_active(state);
    let prunes_cancelled = cancel_all_prunes(state);

    if !turn_cancelled && prunes_cancelled == 0 {
        state.notify(Notification::info("Nothing to cancel"));
    } else if prunes_cancelled > 0 {
        state.notify(Notification::info(format!(
            "Cancelled {prunes_cancelled} file summar{}",
            if prunes_cancelled == 1 { "y" } else { "ies" }
        )));
    }
    state.mark_dirty();
    Vec::new()
}

/// Cancel the main-transcript operation, keeping its partial text
fn cancel_active(state: &mut StudioState) -> bool {
    let Some(active) = state.active.take() else {
        return false;
    };
    active.cancel.cancel();
    log_debug!("Cancelled op={}", active.op);

    state.chat.interrupt_response();
    state.enter_error(CANCELLED);
    state.refresh_search();
    state.follow_tail();
    true
}

pub fn quit(state: &mut StudioState) -> Vec<SideEffect> {
    state.shutdown();
    state.state = SessionState::Quitting;
    state.previous = None;
    vec![SideEffect::Quit]
}

// ═══════════════════════════════════════════════════════════════════════════════
// Yank and save
// ═══════════════════════════════════════════════════════════════════════════════

/// Chord key: first press arms, second press within the timeout copies all
pub fn yank_transcript(state: &mut StudioState) -> Vec<SideEffect> {
    state.mark_dirty();
    match state.yank.press() {
        YankPress::Armed(token) => vec![SideEffect::ScheduleYankTimeout {
            token,
            after: state.config.ui.yank_chord_timeout(),
        }],
        YankPress::Chord => {
            if state.chat.is_empty() {
                state.notify(Notification::info("Nothing to copy yet"));
                return Vec::new();
            }
            vec![SideEffect::CopyToClipboard {
                label: "transcript",
                text: state.chat.transcript_text(),
            }]
        }
    }
}

/// Copy only the most recent reply, regardless of chord state
pub fn yank_latest(state: &mut StudioState) -> Vec<SideEffect> {
    match state.chat.latest_response() {
        Some(text) => vec![SideEffect::CopyToClipboard {
            label: "latest response",
            text: text.to_string(),
        }],
        None => {
            state.notify(Notification::info("No response to copy yet"));
            Vec::new()
        }
    }
}

/// Save the session under its name, or a timestamped one
pub fn save_snapshot(state: &mut StudioState) -> Vec<SideEffect> {
    let name = state
        .save_name
        .clone()
        .unwrap_or_else(|| format!("review-{}", Local::now().format("%Y%m%d-%H%M%S")));
    vec![SideEffect::SaveSnapshot(state.snapshot(name))]
}
