//! File list key handling: selection, filtering, pruning

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::studio::events::SideEffect;
use crate::studio::reducer::{request_prune, restore_file};
use crate::studio::state::{SessionState, StudioState};

pub fn handle_file_list_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    if state.file_list.filtering {
        return handle_filter_key(state, key);
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let visible = visible_count(state);
            state.file_list.select_next(visible);
            state.mark_dirty();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.file_list.select_prev();
            state.mark_dirty();
        }
        KeyCode::Char('p') | KeyCode::Enter => {
            if let Some(path) = state.selected_file() {
                return request_prune(state, &path);
            }
        }
        KeyCode::Char('u') => {
            if let Some(path) = state.selected_file() {
                return restore_file(state, &path);
            }
        }
        KeyCode::Char('/') => {
            state.file_list.filtering = true;
            state.mark_dirty();
        }
        KeyCode::Esc => {
            if state.file_list.filter.is_empty() {
                state.state = SessionState::Reviewing;
            } else {
                state.file_list.filter.clear();
            }
            state.mark_dirty();
        }
        _ => {}
    }
    Vec::new()
}

fn handle_filter_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    match key.code {
        KeyCode::Enter => state.file_list.filtering = false,
        KeyCode::Esc => {
            state.file_list.filtering = false;
            state.file_list.filter.clear();
        }
        KeyCode::Backspace => {
            state.file_list.filter.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.file_list.filter.push(c);
        }
        _ => {}
    }
    let visible = visible_count(state);
    state.file_list.clamp(visible);
    state.mark_dirty();
    Vec::new()
}

fn visible_count(state: &StudioState) -> usize {
    let items = state.file_items();
    state.file_list.visible(&items).len()
}
