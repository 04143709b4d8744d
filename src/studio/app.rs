//! Main application for the review studio
//!
//! Owns the terminal and the event loop. Keys, ticks and the results of
//! background work all flow through one channel into the reducer; the side
//! effects it returns are executed here as spawned tasks.

use anyhow::{Context, Result};
use arboard::Clipboard;
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::{OpId, SideEffect, StudioEvent};
use super::reducer::{reduce, start_initial_review};
use super::render::render;
use super::state::{ChatState, SessionState, StudioState};
use crate::backend::Backend;
use crate::context::ReviewContext;
use crate::instruction_presets::InstructionPreset;
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::store::{MessageStore, SessionId};
use crate::stream::{
    CancelHandle, PruneCoordinator, StreamCoordinator, StreamError, StreamEvent, StreamHandle,
};
use crate::{log_debug, log_error};

/// How a studio session starts
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Continue a saved session instead of running a fresh review
    pub resume: Option<SessionSnapshot>,
    /// Name used by the save key, and saved under on exit
    pub save_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Studio Application
// ═══════════════════════════════════════════════════════════════════════════════

pub struct StudioApp {
    pub state: StudioState,
    store: Arc<dyn MessageStore>,
    streams: StreamCoordinator,
    prunes: Arc<PruneCoordinator>,
    event_tx: mpsc::UnboundedSender<StudioEvent>,
    event_rx: mpsc::UnboundedReceiver<StudioEvent>,
}

impl StudioApp {
    pub fn new(
        context: ReviewContext,
        backend: &Backend,
        session_id: SessionId,
        preset: InstructionPreset,
    ) -> Self {
        let root = CancellationToken::new();
        let streams = StreamCoordinator::new(
            Arc::clone(&backend.store),
            Arc::clone(&backend.runner),
            root.clone(),
            backend.config.streaming.clone(),
        );
        let prunes = Arc::new(PruneCoordinator::new(
            Arc::clone(&backend.summarizer),
            root.clone(),
        ));
        let state = StudioState::new(backend.config.clone(), context, preset, session_id, root);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            state,
            store: Arc::clone(&backend.store),
            streams,
            prunes,
            event_tx,
            event_rx,
        }
    }

    /// Start a fresh review, or restore a saved conversation
    pub async fn start(&mut self, options: RunOptions) -> Result<()> {
        self.state.save_name = options.save_name;

        let Some(snapshot) = options.resume else {
            let effects = start_initial_review(&mut self.state);
            self.execute(effects);
            return Ok(());
        };

        log_debug!(
            "Resuming session '{}' with {} turns",
            snapshot.name,
            snapshot.turns.len()
        );
        // Interrupted replies stay visible but never reach the model again
        for turn in snapshot.turns.iter().filter(|t| !t.interrupted) {
            self.store
                .append(self.state.session_id, turn.role, turn.content.clone(), true)
                .await
                .context("Failed to restore session history")?;
        }
        self.state.chat = ChatState::from_snapshot_turns(&snapshot.turns);
        self.state.state = SessionState::Reviewing;
        if self.state.save_name.is_none() {
            self.state.save_name = Some(snapshot.name);
        }
        self.state.scroll_to_bottom();
        Ok(())
    }

    /// Run the TUI until the user quits
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal).await;

        // Restore the terminal even when the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.state.shutdown();
        result
    }

    async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let size = terminal.size()?;
        self.dispatch(StudioEvent::Resize {
            width: size.width,
            height: size.height,
        });

        let mut terminal_events = EventStream::new();
        let mut ticker = tokio::time::interval(self.state.config.ui.tick_rate());

        loop {
            if self.state.check_dirty() {
                terminal.draw(|frame| render(frame, &self.state))?;
            }
            if self.state.state == SessionState::Quitting {
                return Ok(());
            }

            let event = tokio::select! {
                maybe = terminal_events.next() => match maybe {
                    Some(Ok(Event::Key(key))) => StudioEvent::Key(key),
                    Some(Ok(Event::Resize(width, height))) => StudioEvent::Resize { width, height },
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e).context("Failed to read terminal input"),
                    None => return Ok(()),
                },
                Some(event) = self.event_rx.recv() => event,
                _ = ticker.tick() => StudioEvent::Tick,
            };
            self.dispatch(event);
        }
    }

    /// Feed one event through the reducer and execute its effects
    pub fn dispatch(&mut self, event: StudioEvent) {
        let effects = reduce(&mut self.state, event);
        self.execute(effects);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Side Effects
    // ═══════════════════════════════════════════════════════════════════════════

    fn execute(&self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::StartTurn {
                    op,
                    request,
                    cancel,
                } => {
                    let handle = self.streams.start_with(request, cancel);
                    tokio::spawn(pump_stream(op, handle, self.event_tx.clone()));
                }
                SideEffect::StartPrune {
                    path,
                    content,
                    cancel,
                } => self.spawn_prune(path, content, cancel),
                SideEffect::ScheduleYankTimeout { token, after } => {
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(StudioEvent::YankTimeout { token });
                    });
                }
                SideEffect::CopyToClipboard { label, text } => {
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let result = tokio::task::spawn_blocking(move || copy_to_clipboard(&text))
                            .await
                            .unwrap_or_else(|e| Err(e.to_string()));
                        let _ = tx.send(StudioEvent::ClipboardResult { label, result });
                    });
                }
                SideEffect::SaveSnapshot(snapshot) => {
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let name = snapshot.name.clone();
                        let result = tokio::task::spawn_blocking(move || save_snapshot(&snapshot))
                            .await
                            .unwrap_or_else(|e| Err(e.to_string()));
                        let _ = tx.send(StudioEvent::SnapshotSaved { name, result });
                    });
                }
                // The loop exits once the state is Quitting
                SideEffect::Quit => {}
            }
        }
    }

    fn spawn_prune(&self, path: String, content: String, cancel: CancelHandle) {
        let prunes = Arc::clone(&self.prunes);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match prunes.prune(&path, &content, &cancel).await {
                Ok(summary) => StudioEvent::PruneSucceeded { path, summary },
                Err(error) => StudioEvent::PruneFailed { path, error },
            };
            let _ = tx.send(event);
        });
    }

    /// Snapshot of the session as it stands
    pub fn snapshot(&self, name: &str) -> SessionSnapshot {
        self.state.snapshot(name)
    }
}

/// Forward one stream handle into studio events.
///
/// A handle that ends without an error or a completion was cancelled.
async fn pump_stream(
    op: OpId,
    mut handle: StreamHandle,
    tx: mpsc::UnboundedSender<StudioEvent>,
) {
    let mut finished = false;
    while let Some(event) = handle.next().await {
        let message = match event {
            StreamEvent::Chunk(text) => StudioEvent::StreamChunk { op, text },
            StreamEvent::Error(error) => {
                finished = true;
                StudioEvent::StreamFailed { op, error }
            }
            StreamEvent::Done(text) => {
                finished = true;
                StudioEvent::StreamDone { op, text }
            }
        };
        if tx.send(message).is_err() {
            handle.close();
            return;
        }
    }
    if !finished {
        let _ = tx.send(StudioEvent::StreamFailed {
            op,
            error: StreamError::Cancelled,
        });
    }
}

fn copy_to_clipboard(text: &str) -> Result<(), String> {
    Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(text))
        .map_err(|e| e.to_string())
}

fn save_snapshot(snapshot: &SessionSnapshot) -> Result<std::path::PathBuf, String> {
    SnapshotStore::open_default()
        .and_then(|store| store.save(snapshot))
        .map_err(|e| format!("{e:#}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Public Entry Point
// ═══════════════════════════════════════════════════════════════════════════════

/// Run an interactive review session until the user quits
pub async fn run(
    context: ReviewContext,
    backend: &Backend,
    session_id: SessionId,
    preset: InstructionPreset,
    options: RunOptions,
) -> Result<()> {
    let save_on_exit = options.save_name.clone();
    let mut app = StudioApp::new(context, backend, session_id, preset);
    app.start(options).await?;
    let outcome = app.run().await;

    if let Some(name) = save_on_exit
        && let Some(saved) = save_on_exit_to(&app.state, &name, SnapshotStore::open_default)
    {
        match saved {
            Ok(path) => crate::ui::print_success(&format!("Session saved to {}", path.display())),
            Err(e) => {
                log_error!("Failed to save session '{}': {:#}", name, e);
                crate::ui::print_error(&format!("Failed to save session: {e:#}"));
            }
        }
    }
    outcome
}

/// Save a non-empty conversation under `name`, however the loop ended
pub(super) fn save_on_exit_to(
    state: &StudioState,
    name: &str,
    open: impl FnOnce() -> Result<SnapshotStore>,
) -> Option<Result<std::path::PathBuf>> {
    if state.chat.is_empty() {
        return None;
    }
    Some(open().and_then(|store| store.save(&state.snapshot(name))))
}
