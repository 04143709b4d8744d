//! Chat input key handling

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::studio::events::SideEffect;
use crate::studio::layout;
use crate::studio::reducer::submit_chat;
use crate::studio::state::{SessionState, StudioState};

pub fn handle_chatting_key(state: &mut StudioState, key: KeyEvent) -> Vec<SideEffect> {
    match key.code {
        KeyCode::Enter => return submit_chat(state),
        KeyCode::Esc => {
            state.state = SessionState::Reviewing;
            state.mark_dirty();
        }

        KeyCode::Up => {
            if let Some(entry) = state.prompt_history.previous(&state.input) {
                state.input = entry.to_string();
                state.mark_dirty();
            }
        }
        KeyCode::Down => {
            if let Some(entry) = state.prompt_history.next() {
                state.input = entry.to_string();
                state.mark_dirty();
            }
        }

        KeyCode::PageUp | KeyCode::PageDown => {
            let page = isize::try_from(layout::page_size(state.transcript_height()))
                .unwrap_or(isize::MAX);
            state.scroll(if key.code == KeyCode::PageUp { -page } else { page });
        }

        KeyCode::Backspace => {
            state.input.pop();
            state.mark_dirty();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.input.clear();
            state.mark_dirty();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.input.push(c);
            state.mark_dirty();
        }
        _ => {}
    }
    Vec::new()
}
