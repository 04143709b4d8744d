mod reducer_tests;

use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::context::ReviewContext;
use crate::instruction_presets::get_instruction_preset_library;
use crate::store::SessionId;
use crate::stream::CancelHandle;
use crate::studio::events::{OpId, SideEffect, StudioEvent};
use crate::studio::reducer::{reduce, start_initial_review};
use crate::studio::state::StudioState;

pub(super) const FILES: [&str; 3] = ["src/alpha.rs", "src/beta.rs", "src/gamma.rs"];

pub(super) fn test_state() -> StudioState {
    let files: BTreeMap<String, String> = FILES
        .iter()
        .map(|path| (path.to_string(), format!("// {path}\n{}", "fn body() {}\n".repeat(40))))
        .collect();
    let context = ReviewContext::new("diff --git a/src/alpha.rs b/src/alpha.rs\n+fn added() {}\n", files);
    let preset = get_instruction_preset_library().get_or_default("default");
    StudioState::new(
        Config::default(),
        context,
        preset,
        SessionId::new(),
        CancellationToken::new(),
    )
}

pub(super) fn key(code: KeyCode) -> StudioEvent {
    StudioEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub(super) fn ctrl(c: char) -> StudioEvent {
    StudioEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

pub(super) fn type_text(state: &mut StudioState, text: &str) {
    for c in text.chars() {
        let _ = reduce(state, key(KeyCode::Char(c)));
    }
}

/// Pull the op and cancel handle out of a `StartTurn` effect
pub(super) fn started_turn(effects: &[SideEffect]) -> (OpId, CancelHandle) {
    effects
        .iter()
        .find_map(|e| match e {
            SideEffect::StartTurn { op, cancel, .. } => Some((*op, cancel.clone())),
            _ => None,
        })
        .expect("expected a StartTurn effect")
}

/// Start the initial review and finish it with `text`
pub(super) fn reviewed_state(text: &str) -> StudioState {
    let mut state = test_state();
    let (op, _) = started_turn(&start_initial_review(&mut state));
    let _ = reduce(
        &mut state,
        StudioEvent::StreamDone {
            op,
            text: text.to_string(),
        },
    );
    state
}
