//! Live transcript search

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::studio::events::SideEffect;
use crate::studio::state::StudioState;

pub fn handle_searching_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    match key.code {
        KeyCode::Esc => state.pop_overlay(),

        KeyCode::Enter | KeyCode::Down => {
            state.search.next_match();
            state.scroll_to_match();
        }
        KeyCode::Up => {
            state.search.prev_match();
            state.scroll_to_match();
        }
        KeyCode::Tab => {
            state.search.toggle_mode();
            state.scroll_to_match();
        }

        KeyCode::Backspace => {
            let mut query = state.search.query.clone();
            query.pop();
            requery(state, &query);
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut query = state.search.query.clone();
            query.push(c);
            requery(state, &query);
        }
        _ => {}
    }
    Vec::new()
}

/// Rebuild the match index on every keystroke
fn requery(state: &mut StudioState, query: &str) {
    let lines = state.transcript_lines();
    state.search.update(query, &lines);
    state.scroll_to_match();
}
