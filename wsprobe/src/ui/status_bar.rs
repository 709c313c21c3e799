//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use wsprobe_core::store::KeyValueStore;
use wsprobe_core::transport::Connector;

use super::theme;
use crate::app::{App, Focus};

/// Render the status bar at the bottom of the screen.
pub fn render<S: KeyValueStore, C: Connector>(frame: &mut Frame, area: Rect, app: &App<S, C>) {
    let state = app.session.connection_state();
    let status_text = match app.session.connected_address() {
        Some(address) if state.is_live() => format!(" {state} ({address})"),
        _ => format!(" {state}"),
    };

    let affordances = app.session.affordances();
    let mut hints = Vec::new();
    if app.focus == Focus::Address {
        hints.push("Enter: connect");
    }
    if affordances.connect {
        hints.push("F2: connect");
    }
    if affordances.disconnect {
        hints.push("F3: disconnect");
    }
    if affordances.send {
        hints.push("^S: send");
    }
    hints.extend([
        "^L: address",
        "^N: new tab",
        "^W: save",
        "Tab: switch view",
        "F11: fullscreen",
        "^Q: quit",
    ]);

    let status_line = Line::from(vec![
        Span::styled(
            concat!("wsprobe v", env!("CARGO_PKG_VERSION")),
            theme::bold(),
        ),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(theme::connection_color(state))),
        Span::raw(status_text),
        Span::raw(" | "),
        Span::styled(hints.join(" | "), theme::dimmed()),
    ]);

    let paragraph = Paragraph::new(status_line).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
