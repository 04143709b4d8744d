//! Review studio: the interactive terminal session
//!
//! - **state**: session state machine and everything it owns
//! - **reducer**: the only place that state changes
//! - **handlers**: per-state key handling
//! - **render**: drawing from state
//! - **app**: terminal, event loop and side-effect execution

mod app;
mod events;
mod handlers;
mod layout;
mod reducer;
mod render;
mod search;
mod state;
mod theme;
mod utils;
mod yank;

#[cfg(test)]
mod tests;

pub use app::{RunOptions, StudioApp, run};
pub use events::{OpId, SideEffect, StudioEvent};
pub use handlers::handler_for;
pub use layout::Viewport;
pub use reducer::reduce;
pub use search::{SearchMatch, SearchMode, SearchState, find_matches};
pub use state::{
    ActiveTurn, ChatState, ChatTurn, Notification, NotificationLevel, PromptHistory,
    SessionState, StudioState,
};
pub use yank::{YankChord, YankPress};
