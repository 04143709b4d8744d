//! Submitted chat prompts with shell-style Up/Down navigation.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct PromptHistory {
    entries: VecDeque<String>,
    /// Entry currently shown, `None` when editing a fresh draft
    cursor: Option<usize>,
    /// Input that was being typed before navigation started
    draft: String,
    max_entries: usize,
}

impl PromptHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            draft: String::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a submitted prompt and reset navigation
    pub fn push(&mut self, prompt: &str) {
        self.cursor = None;
        self.draft.clear();

        let prompt = prompt.trim();
        if prompt.is_empty() || self.entries.back().is_some_and(|last| last == prompt) {
            return;
        }
        self.entries.push_back(prompt.to_string());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Step to an older entry. `current` is saved as the draft on the first step.
    pub fn previous(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = match self.cursor {
            None => {
                self.draft = current.to_string();
                self.entries.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(idx);
        self.entries.get(idx).map(String::as_str)
    }

    /// Step to a newer entry; past the newest, the saved draft comes back
    pub fn next(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 < self.entries.len() {
            self.cursor = Some(i + 1);
            self.entries.get(i + 1).map(String::as_str)
        } else {
            self.cursor = None;
            Some(self.draft.as_str())
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_navigating(&self) -> bool {
        self.cursor.is_some()
    }
}
