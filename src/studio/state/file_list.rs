//! The file list: which files are in the prompt and which were pruned.

/// Anything the studio shows as a selectable list row
pub trait ListItem {
    fn title(&self) -> String;
    fn description(&self) -> String;
    /// Text matched by the list filter
    fn filter_value(&self) -> String;
}

/// One file of the review context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub path: String,
    pub tokens: usize,
    pub summary: Option<String>,
    pub pruning: bool,
}

impl ListItem for FileItem {
    fn title(&self) -> String {
        self.path.clone()
    }

    fn description(&self) -> String {
        if self.pruning {
            "summarizing…".to_string()
        } else if let Some(summary) = &self.summary {
            format!("pruned: {summary}")
        } else {
            format!("{} tokens", self.tokens)
        }
    }

    fn filter_value(&self) -> String {
        self.path.to_lowercase()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileListState {
    /// Index into the visible (filtered) items
    pub selected: usize,
    pub filter: String,
    /// Typing goes into the filter
    pub filtering: bool,
}

impl FileListState {
    /// Items whose filter value contains the filter, case-insensitively
    pub fn visible<'a, T: ListItem>(&self, items: &'a [T]) -> Vec<&'a T> {
        let needle = self.filter.to_lowercase();
        items
            .iter()
            .filter(|item| needle.is_empty() || item.filter_value().contains(&needle))
            .collect()
    }

    pub fn select_next(&mut self, visible: usize) {
        if visible > 0 {
            self.selected = (self.selected + 1).min(visible - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the selection inside the visible range
    pub fn clamp(&mut self, visible: usize) {
        self.selected = self.selected.min(visible.saturating_sub(1));
    }
}
