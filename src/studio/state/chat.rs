//! Transcript state: completed turns plus the reply currently streaming in.

use crate::snapshot::SnapshotTurn;
use crate::store::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Chat Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Header line shown above each user turn
pub const USER_HEADER: &str = "▸ You";
/// Header line shown above each reviewer turn
pub const REVIEWER_HEADER: &str = "◆ Review";
/// Trailer for replies cut short by cancellation
pub const INTERRUPTED_MARKER: &str = "[interrupted]";

/// A single turn in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// Reply cut short by cancellation or an error
    pub interrupted: bool,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            interrupted: false,
        }
    }

    pub fn reviewer(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            interrupted: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Chat State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ChatState {
    /// Completed turns, oldest first
    pub turns: Vec<ChatTurn>,
    /// Reply being streamed for the active operation
    pub streaming: Option<String>,
    /// First visible transcript line
    pub scroll: usize,
    /// Keep the view pinned to the newest line
    pub follow: bool,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            turns: Vec::new(),
            streaming: None,
            scroll: 0,
            follow: true,
        }
    }
}

impl ChatState {
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Start collecting a new streamed reply
    pub fn begin_response(&mut self) {
        self.streaming = Some(String::new());
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        self.streaming
            .get_or_insert_with(String::new)
            .push_str(chunk);
    }

    /// Commit the final text, replacing whatever was streamed
    pub fn finish_response(&mut self, text: String) {
        self.streaming = None;
        self.turns.push(ChatTurn::reviewer(text));
    }

    /// Keep the partial reply as an interrupted turn
    pub fn interrupt_response(&mut self) {
        if let Some(partial) = self.streaming.take()
            && !partial.is_empty()
        {
            self.turns.push(ChatTurn {
                role: Role::Assistant,
                content: partial,
                interrupted: true,
            });
        }
    }

    /// Drop the streamed reply and every turn after the first `len`
    pub fn rollback(&mut self, len: usize) {
        self.streaming = None;
        self.turns.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.streaming.as_deref().is_none_or(str::is_empty)
    }

    /// Most recent reviewer reply, including one still streaming
    pub fn latest_response(&self) -> Option<&str> {
        if let Some(streaming) = self.streaming.as_deref()
            && !streaming.is_empty()
        {
            return Some(streaming);
        }
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
    }

    /// Unwrapped transcript lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for turn in &self.turns {
            push_turn(&mut lines, turn.role, &turn.content);
            if turn.interrupted {
                lines.push(INTERRUPTED_MARKER.to_string());
            }
            lines.push(String::new());
        }
        if let Some(streaming) = &self.streaming {
            push_turn(&mut lines, Role::Assistant, streaming);
        }
        lines
    }

    /// Transcript lines wrapped to `width` columns, as rendered
    pub fn wrapped_lines(&self, width: usize) -> Vec<String> {
        let width = width.max(1);
        self.lines()
            .iter()
            .flat_map(|line| {
                if line.is_empty() {
                    vec![String::new()]
                } else {
                    textwrap::wrap(line, width)
                        .into_iter()
                        .map(|l| l.into_owned())
                        .collect()
                }
            })
            .collect()
    }

    /// Whole transcript as plain text
    pub fn transcript_text(&self) -> String {
        self.lines().join("\n").trim_end().to_string()
    }

    pub fn to_snapshot_turns(&self) -> Vec<SnapshotTurn> {
        self.turns
            .iter()
            .map(|t| SnapshotTurn {
                role: t.role,
                content: t.content.clone(),
                interrupted: t.interrupted,
            })
            .collect()
    }

    pub fn from_snapshot_turns(turns: &[SnapshotTurn]) -> Self {
        Self {
            turns: turns
                .iter()
                .map(|t| ChatTurn {
                    role: t.role,
                    content: t.content.clone(),
                    interrupted: t.interrupted,
                })
                .collect(),
            ..Self::default()
        }
    }
}

fn push_turn(lines: &mut Vec<String>, role: Role, content: &str) {
    lines.push(
        match role {
            Role::User => USER_HEADER,
            Role::Assistant => REVIEWER_HEADER,
        }
        .to_string(),
    );
    lines.extend(content.lines().map(str::to_string));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_replaces_streamed_text() {
        let mut chat = ChatState::default();
        chat.begin_response();
        chat.append_chunk("Hello");
        chat.append_chunk(" wrld");
        chat.finish_response("Hello world".to_string());

        assert!(chat.streaming.is_none());
        assert_eq!(chat.turns.len(), 1);
        assert_eq!(chat.latest_response(), Some("Hello world"));
    }

    #[test]
    fn test_interrupt_keeps_partial() {
        let mut chat = ChatState::default();
        chat.begin_response();
        chat.append_chunk("Hel");
        chat.interrupt_response();

        assert_eq!(chat.turns.len(), 1);
        assert!(chat.turns[0].interrupted);
        assert!(chat.transcript_text().contains("Hel"));
        assert!(chat.transcript_text().ends_with(INTERRUPTED_MARKER));
    }

    #[test]
    fn test_interrupt_without_text_adds_nothing() {
        let mut chat = ChatState::default();
        chat.begin_response();
        chat.interrupt_response();
        assert!(chat.turns.is_empty());
    }

    #[test]
    fn test_wrapped_lines_respect_width() {
        let mut chat = ChatState::default();
        chat.finish_response("one two three four five six".to_string());
        let lines = chat.wrapped_lines(10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert!(lines.len() > 2);
    }
}
