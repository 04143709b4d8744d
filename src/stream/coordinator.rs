//! Streams one model turn into the studio.
//!
//! A turn runs as a background task. While the runner writes the reply into
//! the message store, a subscriber task forwards only the new suffix of each
//! growing assistant message as a chunk. When the runner finishes, the store
//! is read back once and that text becomes the `Done` payload.
//!
//! Turns on one session run one at a time: a turn holds its session's gate
//! from before it reads the baseline until after any rollback, so a
//! cancelled turn is fully retired before the next one touches the store.

use super::cancel::CancelHandle;
use crate::config::StreamingConfig;
use crate::runner::{TurnError, TurnRequest, TurnRunner};
use crate::store::{Message, MessageEvent, MessageId, MessageStore, Role, SessionId};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Cancelled")]
    Cancelled,
    #[error("{0}")]
    Model(String),
    #[error("Response withheld: {0}")]
    SafetyBlocked(String),
    #[error("{0}")]
    Config(String),
}

impl From<TurnError> for StreamError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::SafetyBlocked(reason) => Self::SafetyBlocked(reason),
            TurnError::Transport(reason) => Self::Model(reason),
            TurnError::Config(reason) => Self::Config(reason),
        }
    }
}

/// What a [`StreamHandle`] yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Error(StreamError),
    /// Final reconciled text; always the last event of a successful turn
    Done(String),
}

/// Consumer side of one streamed turn.
///
/// Chunks come first in production order, then either one error or one done.
/// A cancelled turn ends without either.
#[derive(Debug)]
pub struct StreamHandle {
    chunks: mpsc::Receiver<String>,
    error: Option<oneshot::Receiver<StreamError>>,
    done: Option<oneshot::Receiver<String>>,
    cancel: CancelHandle,
}

impl StreamHandle {
    /// Next event, or `None` once the turn is over
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if let Some(chunk) = self.chunks.recv().await {
            return Some(StreamEvent::Chunk(chunk));
        }

        if let Some(error) = self.error.take()
            && let Ok(err) = error.await
        {
            self.done = None;
            return Some(StreamEvent::Error(err));
        }

        let done = self.done.take()?;
        done.await.ok().map(StreamEvent::Done)
    }

    /// Cancel the turn and stop yielding events
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.chunks.close();
        self.error = None;
        self.done = None;
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }
}

/// Serializes turns within a session
type SessionGate = Arc<tokio::sync::Mutex<()>>;

/// Runs turns for the main transcript
pub struct StreamCoordinator {
    store: Arc<dyn MessageStore>,
    runner: Arc<dyn TurnRunner>,
    root: CancellationToken,
    settings: StreamingConfig,
    gates: Mutex<HashMap<SessionId, SessionGate>>,
}

impl StreamCoordinator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        runner: Arc<dyn TurnRunner>,
        root: CancellationToken,
        settings: StreamingConfig,
    ) -> Self {
        Self {
            store,
            runner,
            root,
            settings,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, session: SessionId) -> SessionGate {
        Arc::clone(self.gates.lock().entry(session).or_default())
    }

    pub fn root(&self) -> &CancellationToken {
        &self.root
    }

    /// Start a turn under a fresh child of the root token
    pub fn start(&self, request: TurnRequest) -> StreamHandle {
        self.start_with(request, CancelHandle::child_of(&self.root))
    }

    /// Start a turn cancelled through `cancel`
    pub fn start_with(&self, request: TurnRequest, cancel: CancelHandle) -> StreamHandle {
        let (chunk_tx, chunk_rx) = mpsc::channel(self.settings.chunk_buffer.max(1));
        let (error_tx, error_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let turn = Turn {
            store: Arc::clone(&self.store),
            runner: Arc::clone(&self.runner),
            settings: self.settings.clone(),
            cancel: cancel.token().clone(),
            gate: self.gate(request.session_id),
        };
        tokio::spawn(turn.drive(request, chunk_tx, error_tx, done_tx));

        StreamHandle {
            chunks: chunk_rx,
            error: Some(error_rx),
            done: Some(done_rx),
            cancel,
        }
    }
}

struct Turn {
    store: Arc<dyn MessageStore>,
    runner: Arc<dyn TurnRunner>,
    settings: StreamingConfig,
    cancel: CancellationToken,
    gate: SessionGate,
}

impl Turn {
    async fn drive(
        self,
        request: TurnRequest,
        chunk_tx: mpsc::Sender<String>,
        error_tx: oneshot::Sender<StreamError>,
        done_tx: oneshot::Sender<String>,
    ) {
        let session = request.session_id;
        // Held until this turn has returned, rollback included
        let _retiring = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(%session, "turn cancelled before it started");
                return;
            }
            guard = Arc::clone(&self.gate).lock_owned() => guard,
        };

        // Subscribe before the runner can write anything
        let events = self.store.subscribe();
        let baseline = match self.store.list(session).await {
            Ok(messages) => Some(messages.len()),
            Err(e) => {
                warn!(%session, "could not read turn baseline: {e}");
                None
            }
        };

        let accumulated = Arc::new(Mutex::new(String::new()));
        let stop = self.cancel.child_token();
        let subscriber = tokio::spawn(forward_chunks(
            events,
            session,
            chunk_tx,
            Arc::clone(&accumulated),
            stop.clone(),
            self.cancel.clone(),
        ));

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.runner.run(request) => Some(result),
        };

        let Some(result) = outcome else {
            debug!(%session, "turn cancelled while running");
            self.stop_subscriber(subscriber, &stop).await;
            self.rollback(session, baseline).await;
            return;
        };

        if let Err(err) = result {
            self.stop_subscriber(subscriber, &stop).await;
            // A failed exchange never becomes part of later prompts
            self.rollback(session, baseline).await;
            warn!(%session, "turn failed: {err}");
            if !self.cancel.is_cancelled() {
                let _ = error_tx.send(err.into());
            }
            return;
        }

        // Let trailing events drain
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(self.settings.grace_period()) => {}
        }
        self.stop_subscriber(subscriber, &stop).await;

        let reconciled = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            text = self.reconcile(session, baseline) => Some(text),
        };
        let Some(reconciled) = reconciled else {
            debug!(%session, "turn cancelled during reconciliation");
            self.rollback(session, baseline).await;
            return;
        };

        let streamed = accumulated.lock().clone();
        let text = match reconciled {
            Some(text) => {
                if text != streamed {
                    debug!(
                        %session,
                        streamed = streamed.len(),
                        stored = text.len(),
                        "streamed text differs from store, using store"
                    );
                }
                text
            }
            None => streamed,
        };

        drop(error_tx);
        if !self.cancel.is_cancelled() {
            let _ = done_tx.send(text);
        }
    }

    async fn stop_subscriber(&self, subscriber: JoinHandle<()>, stop: &CancellationToken) {
        stop.cancel();
        let abort = subscriber.abort_handle();
        if tokio::time::timeout(self.settings.join_timeout(), subscriber)
            .await
            .is_err()
        {
            warn!("event subscriber did not stop in time, aborting");
            abort.abort();
        }
    }

    /// Read the committed reply back, retrying once
    async fn reconcile(&self, session: SessionId, baseline: Option<usize>) -> Option<String> {
        let baseline = baseline?;
        let strategy = FixedInterval::new(self.settings.reconcile_retry_delay()).take(1);
        let result = Retry::spawn(strategy, || {
            let store = Arc::clone(&self.store);
            async move { store.list(session).await }
        })
        .await;

        match result {
            Ok(messages) => reply_text(&messages, baseline),
            Err(e) => {
                warn!(%session, "reconciliation failed, keeping streamed text: {e}");
                None
            }
        }
    }

    async fn rollback(&self, session: SessionId, baseline: Option<usize>) {
        let Some(len) = baseline else {
            return;
        };
        if let Err(e) = self.store.rollback(session, len).await {
            warn!(%session, "rollback failed: {e}");
        }
    }
}

/// Assistant text written after `baseline`
fn reply_text(messages: &[Message], baseline: usize) -> Option<String> {
    let replies: Vec<&str> = messages
        .iter()
        .skip(baseline)
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
        .collect();
    if replies.is_empty() {
        None
    } else {
        Some(replies.concat())
    }
}

/// Tracks how much of each message has already been forwarded
#[derive(Default)]
struct Offsets(HashMap<MessageId, usize>);

impl Offsets {
    /// The unseen suffix of `message`, advancing its offset
    fn take_suffix(&mut self, message: &Message) -> Option<String> {
        let offset = self.0.entry(message.id).or_insert(0);
        let suffix = message.content.get(*offset..)?;
        if suffix.is_empty() {
            return None;
        }
        let suffix = suffix.to_string();
        *offset = message.content.len();
        Some(suffix)
    }
}

async fn forward_chunks(
    mut events: broadcast::Receiver<MessageEvent>,
    session: SessionId,
    chunk_tx: mpsc::Sender<String>,
    accumulated: Arc<Mutex<String>>,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    let mut offsets = Offsets::default();
    let mut forwarded = 0usize;

    loop {
        let event = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            event = events.recv() => event,
        };

        let message = match event {
            Ok(MessageEvent::Upserted(message)) => message,
            Ok(MessageEvent::RolledBack { .. }) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(%session, skipped, "subscriber lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if message.session_id != session || message.role != Role::Assistant {
            continue;
        }
        let Some(suffix) = offsets.take_suffix(&message) else {
            continue;
        };

        accumulated.lock().push_str(&suffix);
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            sent = chunk_tx.send(suffix) => {
                if sent.is_err() {
                    break;
                }
                forwarded += 1;
            }
        }
    }

    // Events already queued when the turn finished still count
    if !cancel.is_cancelled() {
        while let Ok(event) = events.try_recv() {
            if let MessageEvent::Upserted(message) = event
                && message.session_id == session
                && message.role == Role::Assistant
                && let Some(suffix) = offsets.take_suffix(&message)
            {
                accumulated.lock().push_str(&suffix);
                if chunk_tx.try_send(suffix).is_ok() {
                    forwarded += 1;
                }
            }
        }
    }

    debug!(%session, forwarded, "event subscriber stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: MessageId, content: &str) -> Message {
        Message {
            id,
            session_id: SessionId::new(),
            role: Role::Assistant,
            content: content.to_string(),
            finished: false,
        }
    }

    #[test]
    fn test_offsets_forward_only_new_suffix() {
        let mut offsets = Offsets::default();
        let id = MessageId::new();
        assert_eq!(offsets.take_suffix(&message(id, "Hel")).as_deref(), Some("Hel"));
        assert_eq!(offsets.take_suffix(&message(id, "Hello")).as_deref(), Some("lo"));
        assert_eq!(offsets.take_suffix(&message(id, "Hello")), None);
        assert_eq!(offsets.take_suffix(&message(id, "He")), None);
    }

    #[test]
    fn test_reply_text_skips_baseline_and_user() {
        let session = SessionId::new();
        let mk = |role, content: &str| Message {
            id: MessageId::new(),
            session_id: session,
            role,
            content: content.to_string(),
            finished: true,
        };
        let messages = vec![
            mk(Role::Assistant, "old"),
            mk(Role::User, "question"),
            mk(Role::Assistant, "answer"),
        ];
        assert_eq!(reply_text(&messages, 1).as_deref(), Some("answer"));
        assert_eq!(reply_text(&messages, 3), None);
    }
}
