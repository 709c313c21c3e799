//! Terminal UI rendering.

pub mod editor_panel;
pub mod header;
pub mod popup;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

use wsprobe_core::store::KeyValueStore;
use wsprobe_core::transport::Connector;

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw<S: KeyValueStore, C: Connector>(frame: &mut Frame, app: &App<S, C>) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    if app.session.is_fullscreen() {
        editor_panel::render(frame, content_area, app);
    } else {
        let notices = header::notice_lines(app.session.notices());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),       // Address bar
                Constraint::Length(notices), // Error / warning
                Constraint::Length(1),       // View tabs
                Constraint::Min(3),          // Active buffer
            ])
            .split(content_area);

        header::render_address(frame, chunks[0], app);
        header::render_notices(frame, chunks[1], app.session.notices());
        header::render_tabs(frame, chunks[2], app);
        editor_panel::render(frame, chunks[3], app);
    }

    status_bar::render(frame, status_area, app);

    if let Some(add_tab) = &app.add_tab {
        popup::render_add_tab(frame, add_tab);
    } else if let Some(reason) = app.session.pending_raw() {
        popup::render_confirm_raw(frame, reason);
    }
}

/// A `width` x `height` rectangle centered in `area`, clamped to fit.
#[must_use]
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Clamp a character count into a terminal coordinate.
#[must_use]
pub fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
