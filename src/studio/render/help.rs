//! Help overlay

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::studio::handlers::get_keybindings;
use crate::studio::state::SessionState;
use crate::studio::theme;

/// Keys for the state the overlay interrupted
pub fn render(frame: &mut Frame, area: Rect, interrupted: &SessionState) {
    let block = Block::default()
        .title(format!(" Help: {} ", interrupted.name()))
        .borders(Borders::ALL)
        .border_style(theme::keyword());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = get_keybindings(interrupted)
        .into_iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("  {keys:<12}"), theme::file_path()),
                Span::styled(action, theme::text()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to close",
        theme::dimmed(),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}
