//! Screen layout and viewport sizing for the studio.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Terminal size as last reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 100,
            height: 30,
        }
    }
}

/// Calculated layout areas
#[derive(Debug, Clone)]
pub struct StudioLayout {
    pub header: Rect,
    pub body: Rect,
    /// Single-line input box, present in text-input states
    pub input: Option<Rect>,
    pub status: Rect,
}

const HEADER_HEIGHT: u16 = 1;
const STATUS_HEIGHT: u16 = 1;
const INPUT_HEIGHT: u16 = 3;
/// Border rows and columns around the transcript block
const BORDER: u16 = 2;

pub fn calculate_layout(area: Rect, show_input: bool) -> StudioLayout {
    let mut constraints = vec![Constraint::Length(HEADER_HEIGHT), Constraint::Min(3)];
    if show_input {
        constraints.push(Constraint::Length(INPUT_HEIGHT));
    }
    constraints.push(Constraint::Length(STATUS_HEIGHT));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let status = chunks[chunks.len() - 1];
    StudioLayout {
        header: chunks[0],
        body: chunks[1],
        input: show_input.then(|| chunks[2]),
        status,
    }
}

/// Columns available to transcript text
pub fn transcript_width(viewport: Viewport) -> usize {
    usize::from(viewport.width.saturating_sub(BORDER).max(1))
}

/// Rows available to transcript text
pub fn transcript_height(viewport: Viewport, show_input: bool) -> usize {
    let chrome = HEADER_HEIGHT + STATUS_HEIGHT + BORDER + if show_input { INPUT_HEIGHT } else { 0 };
    usize::from(viewport.height.saturating_sub(chrome).max(1))
}

/// Largest scroll offset that still fills the view
pub fn max_scroll(total_lines: usize, height: usize) -> usize {
    total_lines.saturating_sub(height)
}

/// Apply a signed scroll delta, clamped to the content
pub fn scroll_by(offset: usize, delta: isize, total_lines: usize, height: usize) -> usize {
    offset
        .saturating_add_signed(delta)
        .min(max_scroll(total_lines, height))
}

/// Lines moved by PageUp/PageDown
pub fn page_size(height: usize) -> usize {
    height.saturating_sub(2).max(1)
}

/// Offset that puts `row` roughly in the middle of the view
pub fn center_on(row: usize, total_lines: usize, height: usize) -> usize {
    row.saturating_sub(height / 2).min(max_scroll(total_lines, height))
}

/// Centered popup covering the given percentages of `area`
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
