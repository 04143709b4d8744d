//! File pruning transitions.
//!
//! The pruned set only changes here, after a summary has come back.

use crate::studio::events::SideEffect;
use crate::studio::state::{Notification, StudioState};
use crate::log_debug;
use crate::stream::PruneError;

/// Queue a summary for `path`.
///
/// Already pruned or already pruning files start nothing.
pub fn request_prune(state: &mut StudioState, path: &str) -> Vec<SideEffect> {
    if state.context.is_pruned(path) {
        state.notify(Notification::info(format!("{path} is already pruned")));
        return Vec::new();
    }
    if state.pruning.contains_key(path) {
        return Vec::new();
    }
    let Some(content) = state.context.files.get(path).cloned() else {
        state.notify(Notification::error(
            PruneError::UnknownFile(path.to_string()).to_string(),
        ));
        return Vec::new();
    };

    let cancel = state.new_cancel_handle();
    state.pruning.insert(path.to_string(), cancel.clone());
    state.mark_dirty();
    log_debug!("Pruning {} ({} in flight)", path, state.pruning.len());

    vec![SideEffect::StartPrune {
        path: path.to_string(),
        content,
        cancel,
    }]
}

pub(super) fn succeeded(state: &mut StudioState, path: &str, summary: String) {
    // A cancelled prune may still report; only tracked files count
    if state.pruning.remove(path).is_none() {
        log_debug!("Ignoring summary for untracked file {}", path);
        return;
    }

    let before = state.context.token_estimate();
    if let Err(e) = state.context.set_pruned(path, summary) {
        state.notify(Notification::error(e.to_string()));
        return;
    }
    state.rebuild_prompt();
    let saved = before.saturating_sub(state.context.token_estimate());
    state.notify(Notification::success(format!(
        "Pruned {path} (saved ~{saved} tokens)"
    )));
}

pub(super) fn failed(state: &mut StudioState, path: &str, error: &PruneError) {
    let tracked = state.pruning.remove(path).is_some();
    state.mark_dirty();

    if error.is_cancelled() {
        if tracked {
            state.notify(Notification::info(format!("Pruning {path} cancelled")));
        }
        return;
    }
    if tracked {
        state.notify(Notification::error(format!("Pruning {path} failed: {error}")));
    }
}

/// Cancel every in-flight summary and forget them.
///
/// Returns how many were cancelled.
pub fn cancel_all_prunes(state: &mut StudioState) -> usize {
    let pruning = std::mem::take(&mut state.pruning);
    for (path, cancel) in &pruning {
        cancel.cancel();
        log_debug!("Cancelled prune of {}", path);
    }
    if !pruning.is_empty() {
        state.mark_dirty();
    }
    pruning.len()
}

/// Put a pruned file's full content back into the prompt
pub fn restore_file(state: &mut StudioState, path: &str) -> Vec<SideEffect> {
    if state.context.unprune(path) {
        state.rebuild_prompt();
        state.notify(Notification::success(format!("Restored {path}")));
    } else {
        state.notify(Notification::info(format!("{path} is not pruned")));
    }
    Vec::new()
}
