//! Colors and styles for the review studio.

use ratatui::style::{Color, Modifier, Style};

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

/// Electric Purple #e135ff - headers, active state
pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255);

/// Neon Cyan #80ffea - paths, user turns, focus
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234);

/// Electric Yellow #f1fa8c - warnings, search matches
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140);

/// Success Green #50fa7b - pruned files, confirmations
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123);

/// Error Red #ff6363 - errors, cancellation
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99);

pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54);

pub const TEXT_PRIMARY: Color = Color::Rgb(248, 248, 242);

pub const TEXT_DIM: Color = Color::Rgb(98, 114, 164);

/// Braille spinner frames
pub const SPINNER_BRAILLE: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

// ═══════════════════════════════════════════════════════════════════════════════
// Semantic Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn text() -> Style {
    Style::default().fg(TEXT_PRIMARY)
}

pub fn dimmed() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn keyword() -> Style {
    Style::default()
        .fg(ELECTRIC_PURPLE)
        .add_modifier(Modifier::BOLD)
}

pub fn user_header() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}

pub fn file_path() -> Style {
    Style::default().fg(NEON_CYAN)
}

pub fn success() -> Style {
    Style::default().fg(SUCCESS_GREEN)
}

pub fn warning() -> Style {
    Style::default().fg(ELECTRIC_YELLOW)
}

pub fn error() -> Style {
    Style::default().fg(ERROR_RED).add_modifier(Modifier::BOLD)
}

pub fn selected() -> Style {
    Style::default().bg(BG_HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Any search match
pub fn search_match() -> Style {
    Style::default().fg(Color::Black).bg(ELECTRIC_YELLOW)
}

/// The match the cursor is on
pub fn search_current() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ELECTRIC_PURPLE)
        .add_modifier(Modifier::BOLD)
}

pub fn border() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn border_focused() -> Style {
    Style::default().fg(ELECTRIC_PURPLE)
}
