//! File list panel

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::studio::state::{ListItem, StudioState};
use crate::studio::theme;
use crate::studio::utils::truncate_width;

pub fn render(frame: &mut Frame, area: Rect, state: &StudioState) {
    let items = state.file_items();
    let visible = state.file_list.visible(&items);

    let mut title = format!(
        " Files ({} pruned, {} in flight) ",
        state.context.pruned().len(),
        state.pruning.len()
    );
    if state.file_list.filtering || !state.file_list.filter.is_empty() {
        title = format!(" Files / {} ", state.file_list.filter);
    }
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::border_focused());

    let width = usize::from(area.width.saturating_sub(2));
    let height = usize::from(area.height.saturating_sub(2)).max(1);
    // Two rows per file; keep the selection on screen
    let per_page = (height / 2).max(1);
    let first = state.file_list.selected.saturating_sub(per_page - 1);

    let mut lines = Vec::new();
    if visible.is_empty() {
        lines.push(Line::from(Span::styled("No files", theme::dimmed())));
    }
    for (idx, item) in visible.iter().enumerate().skip(first).take(per_page) {
        let selected = idx == state.file_list.selected;
        let marker = if item.pruning {
            state.spinner_char()
        } else if item.summary.is_some() {
            '✓'
        } else {
            ' '
        };
        let title_style = if selected {
            theme::selected().fg(theme::NEON_CYAN)
        } else {
            theme::file_path()
        };
        let desc_style = if item.summary.is_some() {
            theme::success()
        } else {
            theme::dimmed()
        };

        lines.push(Line::from(vec![
            Span::styled(if selected { "▸" } else { " " }, theme::keyword()),
            Span::styled(format!("{marker} "), theme::warning()),
            Span::styled(truncate_width(&item.title(), width.saturating_sub(3)), title_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("    {}", truncate_width(&item.description(), width.saturating_sub(4))),
            desc_style,
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
