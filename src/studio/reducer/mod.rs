//! Pure reducer for the review studio
//!
//! All state transitions happen here:
//! - Takes current state + event
//! - Mutates the state and returns side effects
//! - No I/O, no async inside
//!
//! Side effects are returned for the app to execute after the state update.

mod prune;
mod stream;

pub use prune::{cancel_all_prunes, request_prune, restore_file};
pub use stream::{
    cancel_all, quit, save_snapshot, start_initial_review, submit_chat, yank_latest,
    yank_transcript,
};

use super::events::{SideEffect, StudioEvent};
use super::handlers::handle_key_event;
use super::layout::Viewport;
use super::state::{Notification, StudioState};
use crate::log_debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Reducer Function
// ═══════════════════════════════════════════════════════════════════════════════

/// Reducer: (state, event) → effects
///
/// The single place where session state changes. Results of background work
/// arrive here as events exactly like keystrokes do.
pub fn reduce(state: &mut StudioState, event: StudioEvent) -> Vec<SideEffect> {
    match event {
        // ─────────────────────────────────────────────────────────────────────────
        // Terminal
        // ─────────────────────────────────────────────────────────────────────────
        StudioEvent::Key(key) => handle_key_event(state, key),

        StudioEvent::Resize { width, height } => {
            state.viewport = Viewport { width, height };
            state.refresh_search();
            state.follow_tail();
            state.mark_dirty();
            Vec::new()
        }

        StudioEvent::Tick => {
            state.tick();
            Vec::new()
        }

        // ─────────────────────────────────────────────────────────────────────────
        // Main transcript stream
        // ─────────────────────────────────────────────────────────────────────────
        StudioEvent::StreamChunk { op, text } => {
            stream::chunk(state, op, &text);
            Vec::new()
        }

        StudioEvent::StreamDone { op, text } => {
            stream::done(state, op, text);
            Vec::new()
        }

        StudioEvent::StreamFailed { op, error } => {
            stream::failed(state, op, &error);
            Vec::new()
        }

        // ─────────────────────────────────────────────────────────────────────────
        // Pruning
        // ─────────────────────────────────────────────────────────────────────────
        StudioEvent::PruneSucceeded { path, summary } => {
            prune::succeeded(state, &path, summary);
            Vec::new()
        }

        StudioEvent::PruneFailed { path, error } => {
            prune::failed(state, &path, &error);
            Vec::new()
        }

        // ─────────────────────────────────────────────────────────────────────────
        // Timers and I/O results
        // ─────────────────────────────────────────────────────────────────────────
        StudioEvent::YankTimeout { token } => {
            if state.yank.expire(token) {
                log_debug!("Yank chord expired");
                state.mark_dirty();
            }
            Vec::new()
        }

        StudioEvent::ClipboardResult { label, result } => {
            match result {
                Ok(()) => state.notify(Notification::success(format!("Copied {label}"))),
                Err(e) => state.notify(Notification::error(format!("Clipboard error: {e}"))),
            }
            Vec::new()
        }

        StudioEvent::SnapshotSaved { name, result } => {
            match result {
                Ok(path) => {
                    state.save_name = Some(name.clone());
                    state.notify(Notification::success(format!(
                        "Saved session '{name}' to {}",
                        path.display()
                    )));
                }
                Err(e) => state.notify(Notification::error(format!("Save failed: {e}"))),
            }
            Vec::new()
        }
    }
}
