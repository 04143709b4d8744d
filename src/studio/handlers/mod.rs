//! Key handlers for the review studio
//!
//! One handler per session state, chosen through [`handler_for`]. Handlers
//! mutate state directly and return side effects for anything async.

mod chatting;
mod files;
mod searching;
mod transcript;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::studio::events::SideEffect;
use crate::studio::reducer::{cancel_all, quit};
use crate::studio::state::{SessionState, StudioState};

pub use chatting::handle_chatting_key;
pub use files::handle_file_list_key;
pub use searching::handle_searching_key;
pub use transcript::{handle_loading_key, handle_reviewing_key};

/// Signature shared by every per-state handler
pub type KeyHandler = fn(&mut StudioState, KeyEvent) -> Vec<SideEffect>;

// ═══════════════════════════════════════════════════════════════════════════════
// Main Event Handler
// ═══════════════════════════════════════════════════════════════════════════════

/// Process a key event and return any side effects needed
pub fn handle_key_event(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    if key.kind != KeyEventKind::Press {
        return Vec::new();
    }

    if let Some(effects) = handle_global_key(state, key) {
        return effects;
    }

    handler_for(&state.state)(state, key)
}

/// The dispatch table: which handler owns the keys in each state
pub fn handler_for(session: &SessionState) -> KeyHandler {
    match session {
        SessionState::Loading => handle_loading_key,
        // The transcript stays usable under an error banner
        SessionState::Reviewing | SessionState::Error(_) => handle_reviewing_key,
        SessionState::Chatting => handle_chatting_key,
        SessionState::Searching => handle_searching_key,
        SessionState::Help => handle_help_key,
        SessionState::FileList => handle_file_list_key,
        SessionState::Quitting => handle_quitting_key,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Global Key Handling
// ═══════════════════════════════════════════════════════════════════════════════

fn handle_global_key(state: &mut StudioState, key: KeyEvent) -> Option<Vec<SideEffect>> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(quit(state)),
        KeyCode::Char('x') if ctrl => Some(cancel_all(state)),

        // Help swallows every other key
        _ if state.state == SessionState::Help => None,

        KeyCode::Char('q') if !is_editing(state) => Some(quit(state)),
        KeyCode::Char('?') if !is_editing(state) => {
            state.enter_overlay(SessionState::Help);
            Some(Vec::new())
        }

        _ => None,
    }
}

/// Whether printable keys are text input right now
pub fn is_editing(state: &StudioState) -> bool {
    state.state.is_text_input()
        || (state.state == SessionState::FileList && state.file_list.filtering)
}

fn handle_help_key(state: &mut StudioState, _key: KeyEvent) -> Vec<SideEffect> {
    state.pop_overlay();
    Vec::new()
}

fn handle_quitting_key(_state: &mut StudioState, _key: KeyEvent) -> Vec<SideEffect> {
    Vec::new()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Keybinding Descriptions
// ═══════════════════════════════════════════════════════════════════════════════

/// Keybinding descriptions for the help overlay
pub fn get_keybindings(session: &SessionState) -> Vec<(&'static str, &'static str)> {
    let mut bindings = vec![
        ("Ctrl+C / q", "Quit"),
        ("Ctrl+X", "Cancel streaming and pruning"),
        ("?", "Help"),
    ];

    match session {
        SessionState::Loading => bindings.push(("j/k", "Scroll")),
        SessionState::Chatting => bindings.extend([
            ("Enter", "Send question"),
            ("Up/Down", "Prompt history"),
            ("PgUp/PgDn", "Scroll"),
            ("Esc", "Back to review"),
        ]),
        SessionState::Searching => bindings.extend([
            ("Enter/Down", "Next match"),
            ("Up", "Previous match"),
            ("Tab", "Highlight / filter"),
            ("Esc", "Close search"),
        ]),
        SessionState::FileList => bindings.extend([
            ("j/k", "Select file"),
            ("p", "Prune (summarize) file"),
            ("u", "Restore full file"),
            ("/", "Filter files"),
            ("Esc", "Back to review"),
        ]),
        _ => bindings.extend([
            ("j/k", "Scroll"),
            ("PgUp/PgDn", "Page"),
            ("g/G", "Top / bottom"),
            ("c / i", "Ask a follow-up"),
            ("/", "Search"),
            ("n/N", "Next / previous match"),
            ("f", "Files and pruning"),
            ("yy", "Copy transcript"),
            ("Y", "Copy latest response"),
            ("s", "Save session"),
        ]),
    }

    bindings
}
