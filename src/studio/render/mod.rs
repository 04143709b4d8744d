//! Rendering for the review studio
//!
//! Draws from state only; nothing here mutates it.

mod files;
mod help;
mod status;
mod transcript;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::layout::{calculate_layout, centered_rect};
use super::state::{SessionState, StudioState};
use super::theme;
use super::utils::{gap_between, truncate_width};

pub use transcript::transcript_view;

/// Draw one frame
pub fn render(frame: &mut Frame, state: &StudioState) {
    let areas = calculate_layout(frame.area(), state.shows_input());

    render_header(frame, areas.header, state);

    match state.state {
        SessionState::FileList => files::render(frame, areas.body, state),
        _ => transcript::render(frame, areas.body, state),
    }

    if let Some(input) = areas.input {
        render_input(frame, input, state);
    }
    status::render(frame, areas.status, state);

    if state.state == SessionState::Help {
        let popup = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, popup);
        let interrupted = state.previous.as_ref().unwrap_or(&SessionState::Reviewing);
        help::render(frame, popup, interrupted);
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &StudioState) {
    let width = usize::from(area.width);
    let left = format!(" revu ◆ {} {}", state.preset.emoji, state.preset.name);
    let right = format!("{} ", state.model);
    let left = truncate_width(&left, width.saturating_sub(right.len() + 1));
    let gap = gap_between(&left, &right, width);

    let line = Line::from(vec![
        Span::styled(left, theme::keyword()),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(frame: &mut Frame, area: Rect, state: &StudioState) {
    let (title, text) = match state.state {
        SessionState::Searching => (
            format!(
                " Search [{}] {} ",
                state.search.mode.label(),
                match_position(state)
            ),
            state.search.query.as_str(),
        ),
        _ if state.is_streaming() => (" Ask (waiting for response) ".to_string(), state.input.as_str()),
        _ => (" Ask ".to_string(), state.input.as_str()),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::border_focused());
    let inner_width = usize::from(area.width.saturating_sub(3));
    // Keep the end of long input visible
    let shown: String = {
        let chars: Vec<char> = text.chars().collect();
        let skip = chars.len().saturating_sub(inner_width);
        chars[skip..].iter().collect()
    };
    let line = Line::from(vec![
        Span::styled(shown, theme::text()),
        Span::styled("█", theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn match_position(state: &StudioState) -> String {
    match (state.search.current_index(), state.search.match_count()) {
        (_, 0) if state.search.is_active() => "no matches".to_string(),
        (Some(i), n) => format!("{}/{n}", i + 1),
        _ => String::new(),
    }
}
