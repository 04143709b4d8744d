//! Event and side-effect types for the review studio.
//!
//! Everything the reducer reacts to arrives as a [`StudioEvent`]; everything
//! it wants done outside itself leaves as a [`SideEffect`].

use crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Duration;

use crate::runner::TurnRequest;
use crate::snapshot::SessionSnapshot;
use crate::stream::{CancelHandle, PruneError, StreamError};

/// Identifies one main-transcript operation (initial review or chat turn)
pub type OpId = u64;

// ═══════════════════════════════════════════════════════════════════════════════
// Studio Events
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum StudioEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Terminal
    // ─────────────────────────────────────────────────────────────────────────
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    /// Animation and notification housekeeping
    Tick,

    // ─────────────────────────────────────────────────────────────────────────
    // Main transcript stream
    // ─────────────────────────────────────────────────────────────────────────
    StreamChunk { op: OpId, text: String },
    StreamDone { op: OpId, text: String },
    StreamFailed { op: OpId, error: StreamError },

    // ─────────────────────────────────────────────────────────────────────────
    // Pruning
    // ─────────────────────────────────────────────────────────────────────────
    PruneSucceeded { path: String, summary: String },
    PruneFailed { path: String, error: PruneError },

    // ─────────────────────────────────────────────────────────────────────────
    // Timers and I/O results
    // ─────────────────────────────────────────────────────────────────────────
    YankTimeout { token: u64 },
    ClipboardResult {
        label: &'static str,
        result: Result<(), String>,
    },
    SnapshotSaved {
        name: String,
        result: Result<PathBuf, String>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// Side Effects
// ═══════════════════════════════════════════════════════════════════════════════

/// Work the app performs on the reducer's behalf
#[derive(Debug)]
pub enum SideEffect {
    /// Run a turn on the stream coordinator under `cancel`
    StartTurn {
        op: OpId,
        request: TurnRequest,
        cancel: CancelHandle,
    },
    /// Summarize one file on the prune coordinator under `cancel`
    StartPrune {
        path: String,
        content: String,
        cancel: CancelHandle,
    },
    /// Deliver `YankTimeout { token }` after `after`
    ScheduleYankTimeout { token: u64, after: Duration },
    CopyToClipboard { label: &'static str, text: String },
    SaveSnapshot(SessionSnapshot),
    Quit,
}
