//! Transcript panel with search highlighting or filtering

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::studio::layout;
use crate::studio::search::{SearchMatch, SearchMode};
use crate::studio::state::{
    INTERRUPTED_MARKER, REVIEWER_HEADER, SessionState, StudioState, USER_HEADER,
};
use crate::studio::theme;

pub fn render(frame: &mut Frame, area: Rect, state: &StudioState) {
    let title = match &state.state {
        SessionState::Loading => format!(" {} Reviewing… ", state.spinner_char()),
        SessionState::Error(message) => format!(" ✗ {message} (Esc to dismiss) "),
        _ => " Review ".to_string(),
    };
    let border = match state.state {
        SessionState::Error(_) => theme::error(),
        SessionState::Reviewing | SessionState::Searching => theme::border_focused(),
        _ => theme::border(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border);

    let height = usize::from(area.height.saturating_sub(2));
    let lines = transcript_view(state, height);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// The styled rows currently in view
pub fn transcript_view(state: &StudioState, height: usize) -> Vec<Line<'static>> {
    let lines = state.transcript_lines();
    let mode = state.view_mode();

    let rows: Vec<usize> = match mode {
        SearchMode::Highlight => (0..lines.len()).collect(),
        SearchMode::Filter => state.search.matching_lines(),
    };

    if rows.is_empty() {
        let placeholder = match (&state.state, mode) {
            (_, SearchMode::Filter) => "No matching lines",
            (SessionState::Loading, _) => "Waiting for the first words of the review…",
            _ => "",
        };
        return vec![Line::from(Span::styled(placeholder, theme::dimmed()))];
    }

    let scroll = state.chat.scroll.min(layout::max_scroll(rows.len(), height));
    let current = state.search.current_match();

    rows.iter()
        .skip(scroll)
        .take(height)
        .filter_map(|&row| {
            let text = lines.get(row)?;
            let row_matches: Vec<&SearchMatch> = state
                .search
                .matches()
                .iter()
                .filter(|m| m.line == row)
                .collect();
            Some(styled_line(text, &row_matches, current))
        })
        .collect()
}

fn base_style(text: &str) -> Style {
    match text {
        USER_HEADER => theme::user_header(),
        REVIEWER_HEADER => theme::keyword(),
        INTERRUPTED_MARKER => theme::warning(),
        _ => theme::text(),
    }
}

/// Split a line into spans around its matches
fn styled_line(text: &str, matches: &[&SearchMatch], current: Option<&SearchMatch>) -> Line<'static> {
    let base = base_style(text);
    if matches.is_empty() {
        return Line::from(Span::styled(text.to_string(), base));
    }

    let mut spans = Vec::new();
    let mut pos = 0;
    for m in matches {
        let (Some(before), Some(hit)) = (text.get(pos..m.start), text.get(m.start..m.end)) else {
            continue;
        };
        if !before.is_empty() {
            spans.push(Span::styled(before.to_string(), base));
        }
        let style = if current == Some(*m) {
            theme::search_current()
        } else {
            theme::search_match()
        };
        spans.push(Span::styled(hit.to_string(), style));
        pos = m.end;
    }
    if let Some(rest) = text.get(pos..)
        && !rest.is_empty()
    {
        spans.push(Span::styled(rest.to_string(), base));
    }
    Line::from(spans)
}
