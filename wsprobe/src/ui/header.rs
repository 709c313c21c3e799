//! Address bar, notices and the view tab strip.

use ratatui::{
    Frame,
    layout::{Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};

use wsprobe_core::session::{Notices, View};
use wsprobe_core::store::KeyValueStore;
use wsprobe_core::transport::Connector;

use super::{theme, to_u16};
use crate::app::{App, Focus};
use crate::editor::line_col;

/// Number of lines the notices take.
#[must_use]
pub fn notice_lines(notices: &Notices) -> u16 {
    u16::from(notices.error.is_some()) + u16::from(notices.warning.is_some())
}

/// Render the address bar, with the cursor when it is focused.
pub fn render_address<S: KeyValueStore, C: Connector>(
    frame: &mut Frame,
    area: Rect,
    app: &App<S, C>,
) {
    let is_focused = app.focus == Focus::Address && app.add_tab.is_none();
    let address = app.session.address();

    let block = Block::default()
        .title("Address")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });
    let inner = block.inner(area);

    let (_, column) = line_col(address, app.address_cursor);
    let width = usize::from(inner.width);
    let left = column.saturating_sub(width.saturating_sub(1));

    let line = if address.is_empty() && !is_focused {
        Line::from(Span::styled("ws://host:port/path  (Ctrl+L to edit)", theme::dimmed()))
    } else {
        Line::from(Span::styled(
            address.chars().skip(left).collect::<String>(),
            theme::normal(),
        ))
    };
    frame.render_widget(Paragraph::new(line).block(block), area);

    if is_focused {
        let x = inner.x.saturating_add(to_u16(column - left));
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

/// Render the error and warning lines.
pub fn render_notices(frame: &mut Frame, area: Rect, notices: &Notices) {
    let mut lines = Vec::new();
    if let Some(error) = &notices.error {
        lines.push(Line::from(vec![
            Span::styled("✗ ", theme::error_notice()),
            Span::styled(error.as_str(), theme::error_notice()),
            Span::styled("  (Esc to dismiss)", theme::dimmed()),
        ]));
    }
    if let Some(warning) = &notices.warning {
        lines.push(Line::from(vec![
            Span::styled("! ", theme::warning_notice()),
            Span::styled(warning.as_str(), theme::warning_notice()),
            Span::styled("  (Esc to dismiss)", theme::dimmed()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

/// Render the strip of views: `Input`, `Output`, then user tabs.
pub fn render_tabs<S: KeyValueStore, C: Connector>(
    frame: &mut Frame,
    area: Rect,
    app: &App<S, C>,
) {
    let views = app.session.views();
    let titles: Vec<Line> = views
        .iter()
        .map(|view| match view {
            View::Input => Line::from("Input"),
            View::Output => Line::from("Output"),
            View::Tab(id) => Line::from(
                app.session
                    .tabs()
                    .get(id)
                    .map_or_else(|| id.to_string(), |t| t.display_name.clone()),
            ),
        })
        .collect();
    let selected = views
        .iter()
        .position(|v| v == app.session.view())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme::dimmed())
        .highlight_style(theme::highlighted())
        .divider("|");
    frame.render_widget(tabs, area);
}
