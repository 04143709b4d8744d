//! Status line

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::studio::state::{NotificationLevel, SessionState, StudioState};
use crate::studio::theme;
use crate::studio::utils::{gap_between, truncate_width};

pub fn render(frame: &mut Frame, area: Rect, state: &StudioState) {
    let width = usize::from(area.width);

    let mode = Span::styled(format!(" {} ", state.state.name()), mode_style(&state.state));

    let mut right = String::new();
    if state.is_busy() {
        right.push(state.spinner_char());
        right.push(' ');
    }
    if state.yank.is_armed() {
        right.push_str("y… ");
    }
    right.push_str(&format!("~{} tok", state.context.token_estimate()));
    let pruned = state.context.pruned().len();
    if pruned > 0 || !state.pruning.is_empty() {
        right.push_str(&format!(" │ {pruned} pruned"));
        if !state.pruning.is_empty() {
            right.push_str(&format!(", {} pruning", state.pruning.len()));
        }
    }
    right.push(' ');

    let (message, style) = match state.current_notification() {
        Some(n) => (n.message.clone(), notification_style(n.level)),
        None => ("[?] help  [Ctrl+X] cancel  [q] quit".to_string(), theme::dimmed()),
    };
    let room = width.saturating_sub(mode.content.len() + right.len() + 2);
    let message = format!(" {}", truncate_width(&message, room));
    let left_width = mode.content.len() + message.len();
    let gap = gap_between(&" ".repeat(left_width), &right, width);

    let line = Line::from(vec![
        mode,
        Span::styled(message, style),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn mode_style(session: &SessionState) -> Style {
    match session {
        SessionState::Error(_) => theme::error(),
        SessionState::Loading => theme::warning(),
        _ => theme::selected().fg(theme::ELECTRIC_PURPLE),
    }
}

fn notification_style(level: NotificationLevel) -> Style {
    match level {
        NotificationLevel::Info => theme::dimmed(),
        NotificationLevel::Success => theme::success(),
        NotificationLevel::Warning => theme::warning(),
        NotificationLevel::Error => theme::error(),
    }
}
