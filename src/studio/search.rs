//! Live search over the rendered transcript.

use regex::RegexBuilder;

/// One occurrence of the query. Columns are byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Colorize matches in the full transcript
    #[default]
    Highlight,
    /// Show only lines containing a match
    Filter,
}

impl SearchMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Highlight => "highlight",
            Self::Filter => "filter",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub mode: SearchMode,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

impl SearchState {
    /// Rebuild the match index for `query` over `lines`.
    ///
    /// The cursor stays on the first match at or after the previously
    /// selected position, so typing refines the search in place.
    pub fn update(&mut self, query: &str, lines: &[String]) {
        let anchor = self.current_match().map(|m| (m.line, m.start));
        self.query = query.to_string();
        self.matches = find_matches(query, lines);

        self.current = if self.matches.is_empty() {
            None
        } else {
            let idx = anchor
                .and_then(|pos| self.matches.iter().position(|m| (m.line, m.start) >= pos))
                .unwrap_or(0);
            Some(idx)
        };
    }

    /// Re-run the current query after the text changed
    pub fn refresh(&mut self, lines: &[String]) {
        let query = self.query.clone();
        self.update(&query, lines);
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.current.and_then(|i| self.matches.get(i))
    }

    /// Advance to the next match, wrapping to the first
    pub fn next_match(&mut self) -> Option<&SearchMatch> {
        let count = self.matches.len();
        if count == 0 {
            return None;
        }
        let next = self.current.map_or(0, |i| (i + 1) % count);
        self.current = Some(next);
        self.matches.get(next)
    }

    /// Step back to the previous match, wrapping to the last
    pub fn prev_match(&mut self) -> Option<&SearchMatch> {
        let count = self.matches.len();
        if count == 0 {
            return None;
        }
        let prev = match self.current {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        };
        self.current = Some(prev);
        self.matches.get(prev)
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            SearchMode::Highlight => SearchMode::Filter,
            SearchMode::Filter => SearchMode::Highlight,
        };
    }

    /// Indices of lines that contain at least one match, in order
    pub fn matching_lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self.matches.iter().map(|m| m.line).collect();
        lines.dedup();
        lines
    }

    /// Row of the current match in the view for `mode`.
    ///
    /// In highlight mode that is the transcript line; in filter mode it is the
    /// position of that line among the matching lines.
    pub fn current_row(&self, mode: SearchMode) -> Option<usize> {
        let current = self.current_match()?;
        match mode {
            SearchMode::Highlight => Some(current.line),
            SearchMode::Filter => self
                .matching_lines()
                .iter()
                .position(|&line| line == current.line),
        }
    }
}

/// Case-insensitive, non-overlapping occurrences of `query`
pub fn find_matches(query: &str, lines: &[String]) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }
    let Ok(pattern) = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };

    lines
        .iter()
        .enumerate()
        .flat_map(|(line, text)| {
            pattern.find_iter(text).map(move |m| SearchMatch {
                line,
                start: m.start(),
                end: m.end(),
                text: m.as_str().to_string(),
            })
        })
        .collect()
}
