//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

use wsprobe_core::connection::ConnectionState;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Open connection indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning notice and connecting indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error notice and failed connection indicator color.
pub const ERROR: Color = Color::Red;

/// Indicator color when there is no connection.
pub const INACTIVE: Color = Color::DarkGray;

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (hints, metadata).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused panel borders, active tab).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Selected item style (in lists).
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Style for line numbers in the editor gutter.
#[must_use]
pub fn line_number() -> Style {
    Style::default().fg(Color::Rgb(120, 120, 120))
}

/// Style for the error notice line.
#[must_use]
pub fn error_notice() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

/// Style for the warning notice line.
#[must_use]
pub fn warning_notice() -> Style {
    Style::default().fg(WARNING)
}

/// Style for the status bar background (dark background with white foreground).
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Indicator color for a connection state.
#[must_use]
pub const fn connection_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => SUCCESS,
        ConnectionState::Connecting => WARNING,
        ConnectionState::Errored => ERROR,
        ConnectionState::Absent | ConnectionState::Closed => INACTIVE,
    }
}
