//! State management for the review studio
//!
//! All of it is owned and mutated by the reducer. Background work never
//! touches these fields; its results come back as events.

mod chat;
mod file_list;
mod prompt_history;

pub use chat::{ChatState, ChatTurn, INTERRUPTED_MARKER, REVIEWER_HEADER, USER_HEADER};
pub use file_list::{FileItem, FileListState, ListItem};
pub use prompt_history::PromptHistory;

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::events::OpId;
use super::layout::{self, Viewport};
use super::search::SearchState;
use super::yank::YankChord;
use crate::config::Config;
use crate::context::ReviewContext;
use crate::instruction_presets::InstructionPreset;
use crate::snapshot::SessionSnapshot;
use crate::store::SessionId;
use crate::stream::CancelHandle;
use crate::tokens::TokenCounter;

// ═══════════════════════════════════════════════════════════════════════════════
// Session State
// ═══════════════════════════════════════════════════════════════════════════════

/// Which screen the studio is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the first chunk of the initial review
    Loading,
    Reviewing,
    Chatting,
    Searching,
    Help,
    FileList,
    /// Transcript stays visible with the message in a banner
    Error(String),
    Quitting,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "LOADING",
            Self::Reviewing => "REVIEW",
            Self::Chatting => "CHAT",
            Self::Searching => "SEARCH",
            Self::Help => "HELP",
            Self::FileList => "FILES",
            Self::Error(_) => "ERROR",
            Self::Quitting => "QUIT",
        }
    }

    /// States whose printable keys are text input
    pub fn is_text_input(&self) -> bool {
        matches!(self, Self::Chatting | Self::Searching)
    }

    /// States that remember and return to the state they interrupted
    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::Searching | Self::Help)
    }
}

/// Message shown when the user cancels the active operation
pub const CANCELLED: &str = "Cancelled";

// ═══════════════════════════════════════════════════════════════════════════════
// Notifications
// ═══════════════════════════════════════════════════════════════════════════════

const NOTIFICATION_TTL: Duration = Duration::from_secs(5);
const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub timestamp: Instant,
}

impl Notification {
    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > NOTIFICATION_TTL
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Active Operation
// ═══════════════════════════════════════════════════════════════════════════════

/// The main-transcript operation currently running
#[derive(Debug, Clone)]
pub struct ActiveTurn {
    pub op: OpId,
    pub cancel: CancelHandle,
    /// Transcript length before this turn, for safety rollback
    pub turns_before: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Studio State
// ═══════════════════════════════════════════════════════════════════════════════

pub struct StudioState {
    pub config: Config,
    pub session_id: SessionId,
    pub context: ReviewContext,
    pub preset: InstructionPreset,
    pub model: String,

    /// Current screen
    pub state: SessionState,
    /// Screen an overlay (search, help) returns to
    pub previous: Option<SessionState>,

    /// Parent of every cancel handle handed out
    root: CancellationToken,
    pub active: Option<ActiveTurn>,
    next_op: OpId,
    /// Per-file cancel handles for files being summarized
    pub pruning: BTreeMap<String, CancelHandle>,

    pub chat: ChatState,
    /// Chat input line
    pub input: String,
    pub prompt_history: PromptHistory,
    pub search: SearchState,
    pub yank: YankChord,
    pub file_list: FileListState,

    counter: TokenCounter,
    /// Token count of each file's full content
    file_tokens: BTreeMap<String, usize>,

    /// Name used by the save key
    pub save_name: Option<String>,
    pub viewport: Viewport,
    pub notifications: VecDeque<Notification>,
    pub spinner_frame: usize,
    pub dirty: bool,
}

impl StudioState {
    /// New session state. Assembles the system prompt for `preset`.
    pub fn new(
        config: Config,
        mut context: ReviewContext,
        preset: InstructionPreset,
        session_id: SessionId,
        root: CancellationToken,
    ) -> Self {
        let counter = TokenCounter::new();
        context.assemble_prompt(&preset, &counter);
        let file_tokens = context
            .files
            .iter()
            .map(|(path, content)| (path.clone(), counter.count_tokens(content)))
            .collect();
        let model = config.effective_model();
        let prompt_history = PromptHistory::new(config.ui.max_prompt_history);

        Self {
            config,
            session_id,
            context,
            preset,
            model,
            state: SessionState::Loading,
            previous: None,
            root,
            active: None,
            next_op: 1,
            pruning: BTreeMap::new(),
            chat: ChatState::default(),
            input: String::new(),
            prompt_history,
            search: SearchState::default(),
            yank: YankChord::default(),
            file_list: FileListState::default(),
            counter,
            file_tokens,
            save_name: None,
            viewport: Viewport::default(),
            notifications: VecDeque::new(),
            spinner_frame: 0,
            dirty: true,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a main-transcript operation is outstanding
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_active_op(&self, op: OpId) -> bool {
        self.active.as_ref().is_some_and(|a| a.op == op)
    }

    pub fn allocate_op(&mut self) -> OpId {
        let op = self.next_op;
        self.next_op += 1;
        op
    }

    /// Fresh cancel handle under the session root
    pub fn new_cancel_handle(&self) -> CancelHandle {
        CancelHandle::child_of(&self.root)
    }

    /// Cancel every background unit of the session
    pub fn shutdown(&mut self) {
        self.root.cancel();
        self.active = None;
        self.pruning.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.is_streaming() || !self.pruning.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Screens
    // ─────────────────────────────────────────────────────────────────────────

    /// Open an overlay, remembering the current screen
    pub fn enter_overlay(&mut self, overlay: SessionState) {
        if !self.state.is_overlay() {
            self.previous = Some(self.state.clone());
        }
        self.state = overlay;
        self.dirty = true;
    }

    /// Close the overlay and return to what it interrupted
    pub fn pop_overlay(&mut self) {
        self.state = self.previous.take().unwrap_or(SessionState::Reviewing);
        self.dirty = true;
    }

    /// Show an error. An open overlay stays up and returns to the error.
    pub fn enter_error(&mut self, message: impl Into<String>) {
        let error = SessionState::Error(message.into());
        if self.state.is_overlay() {
            self.previous = Some(error);
        } else {
            self.state = error;
        }
        self.dirty = true;
    }

    /// Leave `Loading` once the review has something to show
    pub fn finish_loading(&mut self) {
        if self.state == SessionState::Loading {
            self.state = SessionState::Reviewing;
        } else if self.previous == Some(SessionState::Loading) {
            self.previous = Some(SessionState::Reviewing);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transcript view
    // ─────────────────────────────────────────────────────────────────────────

    pub fn shows_input(&self) -> bool {
        self.state.is_text_input()
    }

    /// Transcript lines exactly as rendered
    pub fn transcript_lines(&self) -> Vec<String> {
        self.chat
            .wrapped_lines(layout::transcript_width(self.viewport))
    }

    pub fn transcript_height(&self) -> usize {
        layout::transcript_height(self.viewport, self.shows_input())
    }

    /// Rebuild search matches after the transcript changed
    pub fn refresh_search(&mut self) {
        if self.search.is_active() {
            let lines = self.transcript_lines();
            self.search.refresh(&lines);
        }
    }

    /// Scroll by `delta` lines; scrolling to the end resumes following
    pub fn scroll(&mut self, delta: isize) {
        let total = self.visible_line_count();
        let height = self.transcript_height();
        self.chat.scroll = layout::scroll_by(self.chat.scroll, delta, total, height);
        self.chat.follow = self.chat.scroll >= layout::max_scroll(total, height);
        self.dirty = true;
    }

    pub fn scroll_to_top(&mut self) {
        self.chat.scroll = 0;
        self.chat.follow = false;
        self.dirty = true;
    }

    pub fn scroll_to_bottom(&mut self) {
        let total = self.visible_line_count();
        self.chat.scroll = layout::max_scroll(total, self.transcript_height());
        self.chat.follow = true;
        self.dirty = true;
    }

    /// Keep the newest line in view while following
    pub fn follow_tail(&mut self) {
        if self.chat.follow {
            self.scroll_to_bottom();
        }
    }

    /// Bring the current search match into view
    pub fn scroll_to_match(&mut self) {
        let mode = self.view_mode();
        if let Some(row) = self.search.current_row(mode) {
            let total = self.visible_line_count();
            self.chat.scroll = layout::center_on(row, total, self.transcript_height());
            self.chat.follow = false;
        }
        self.dirty = true;
    }

    /// Search mode in effect for the transcript view
    pub fn view_mode(&self) -> super::search::SearchMode {
        if self.state == SessionState::Searching && self.search.is_active() {
            self.search.mode
        } else {
            super::search::SearchMode::Highlight
        }
    }

    fn visible_line_count(&self) -> usize {
        match self.view_mode() {
            super::search::SearchMode::Highlight => self.transcript_lines().len(),
            super::search::SearchMode::Filter => self.search.matching_lines().len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Context and files
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-render the system prompt after the pruned set changed
    pub fn rebuild_prompt(&mut self) {
        self.context.rebuild_prompt(&self.counter);
        self.dirty = true;
    }

    pub fn file_items(&self) -> Vec<FileItem> {
        self.context
            .files
            .keys()
            .map(|path| FileItem {
                path: path.clone(),
                tokens: self.file_tokens.get(path).copied().unwrap_or(0),
                summary: self.context.pruned().get(path).map(str::to_string),
                pruning: self.pruning.contains_key(path),
            })
            .collect()
    }

    /// Path under the file-list cursor
    pub fn selected_file(&self) -> Option<String> {
        let items = self.file_items();
        self.file_list
            .visible(&items)
            .get(self.file_list.selected)
            .map(|item| item.path.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications and rendering
    // ─────────────────────────────────────────────────────────────────────────

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.dirty = true;
    }

    /// Most recent non-expired notification
    pub fn current_notification(&self) -> Option<&Notification> {
        self.notifications.iter().rev().find(|n| !n.is_expired())
    }

    pub fn cleanup_notifications(&mut self) {
        let had_notifications = !self.notifications.is_empty();
        self.notifications.retain(|n| !n.is_expired());
        if had_notifications && self.notifications.is_empty() {
            self.dirty = true;
        }
    }

    pub fn spinner_char(&self) -> char {
        let frames = super::theme::SPINNER_BRAILLE;
        frames[self.spinner_frame % frames.len()]
    }

    /// Advance animations and expire notifications
    pub fn tick(&mut self) {
        self.cleanup_notifications();
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % super::theme::SPINNER_BRAILLE.len();
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check and clear dirty flag
    pub fn check_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    /// The conversation as it stands, under `name`
    pub fn snapshot(&self, name: impl Into<String>) -> SessionSnapshot {
        SessionSnapshot::new(
            name,
            self.context.prompt(),
            self.chat.to_snapshot_turns(),
            self.model.clone(),
        )
    }
}
