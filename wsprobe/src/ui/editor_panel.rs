//! The active buffer: draft, output log or a user tab, with line numbers.

use ratatui::{
    Frame,
    layout::{Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use wsprobe_core::session::View;
use wsprobe_core::store::KeyValueStore;
use wsprobe_core::tabs::EditorRole;
use wsprobe_core::transport::Connector;

use super::{theme, to_u16};
use crate::app::{App, Focus};
use crate::editor::line_col;

/// Render the buffer of the active view.
pub fn render<S: KeyValueStore, C: Connector>(frame: &mut Frame, area: Rect, app: &App<S, C>) {
    let view = app.session.view();
    let role = view.role();
    let text = app.session.editor(&role).unwrap_or_default();
    let is_focused = app.focus == Focus::Editor && app.add_tab.is_none();

    let block = Block::default()
        .title(title(app, view))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });
    let inner = block.inner(area);

    let lines: Vec<&str> = text.split('\n').collect();
    let height = usize::from(inner.height);
    let gutter = lines.len().to_string().len();
    let text_width = usize::from(inner.width).saturating_sub(gutter + 1);

    // Rows scrolled off the top, columns scrolled off the left, and the
    // cursor for editable buffers.
    let (top, left, cursor) = if role == EditorRole::Receiver {
        let max_top = lines.len().saturating_sub(height);
        (max_top - app.output_scroll.min(max_top), 0, None)
    } else {
        let (line, column) = line_col(text, app.cursor(&role));
        let top = line.saturating_sub(height.saturating_sub(1));
        let left = column.saturating_sub(text_width.saturating_sub(1));
        (top, left, Some((line, column)))
    };

    let rendered: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(top)
        .take(height)
        .map(|(i, line)| {
            Line::from(vec![
                Span::styled(format!("{:>gutter$} ", i + 1), theme::line_number()),
                Span::styled(line.chars().skip(left).collect::<String>(), theme::normal()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(rendered).block(block), area);

    if is_focused && let Some((line, column)) = cursor {
        let x = inner
            .x
            .saturating_add(to_u16(gutter + 1))
            .saturating_add(to_u16(column - left));
        let y = inner.y.saturating_add(to_u16(line - top));
        frame.set_cursor_position(Position::new(x, y));
    }
}

fn title<S: KeyValueStore, C: Connector>(app: &App<S, C>, view: &View) -> String {
    match view {
        View::Input => "Input (Ctrl+S to send)".to_string(),
        View::Output => {
            if app.output_scroll == 0 {
                "Output".to_string()
            } else {
                "Output (scrolled, End to follow)".to_string()
            }
        }
        View::Tab(id) => {
            let name = app
                .session
                .tabs()
                .get(id)
                .map_or_else(|| id.to_string(), |t| t.display_name.clone());
            format!("{name} ({})", id.placeholder())
        }
    }
}
