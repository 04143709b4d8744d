//! Keys for the transcript view: loading, reviewing, and the error banner

use crossterm::event::{KeyCode, KeyEvent};

use crate::studio::events::SideEffect;
use crate::studio::layout;
use crate::studio::reducer::{save_snapshot, yank_latest, yank_transcript};
use crate::studio::state::{SessionState, StudioState};

/// Only scrolling while the first chunk is awaited
pub fn handle_loading_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll(-1),
        _ => {}
    }
    Vec::new()
}

pub fn handle_reviewing_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    let page = page_delta(state);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll(-1),
        KeyCode::PageDown | KeyCode::Char(' ') => state.scroll(page),
        KeyCode::PageUp => state.scroll(-page),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_to_bottom(),

        KeyCode::Char('c' | 'i') => {
            state.state = SessionState::Chatting;
            state.follow_tail();
            state.mark_dirty();
        }
        KeyCode::Char('/') => {
            let lines = state.transcript_lines();
            let query = state.search.query.clone();
            state.search.update(&query, &lines);
            state.enter_overlay(SessionState::Searching);
        }
        KeyCode::Char('n') => {
            if state.search.next_match().is_some() {
                state.scroll_to_match();
            }
        }
        KeyCode::Char('N') => {
            if state.search.prev_match().is_some() {
                state.scroll_to_match();
            }
        }
        KeyCode::Char('f') => {
            state.state = SessionState::FileList;
            state.mark_dirty();
        }

        KeyCode::Char('y') => return yank_transcript(state),
        KeyCode::Char('Y') => return yank_latest(state),
        KeyCode::Char('s') => return save_snapshot(state),

        KeyCode::Esc => {
            // Dismiss the error banner
            if matches!(state.state, SessionState::Error(_)) {
                state.state = SessionState::Reviewing;
                state.mark_dirty();
            }
        }
        _ => {}
    }
    Vec::new()
}

fn page_delta(state: &StudioState) -> isize {
    isize::try_from(layout::page_size(state.transcript_height())).unwrap_or(isize::MAX)
}
