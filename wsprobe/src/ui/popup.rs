//! Modal popups drawn over the main layout.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::{centered_rect, theme, to_u16};
use crate::app::AddTabPopup;

/// Render the add-tab popup: a name field over the saved tab names.
pub fn render_add_tab(frame: &mut Frame, popup: &AddTabPopup) {
    let rows = to_u16(popup.suggestions.len().clamp(1, 8));
    let area = centered_rect(50, rows + 6, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title("New tab (Enter to create, Esc to cancel)")
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    let name_block = Block::default().title("Name").borders(Borders::ALL);
    let name_inner = name_block.inner(chunks[0]);
    frame.render_widget(
        Paragraph::new(popup.name.as_str())
            .style(theme::normal())
            .block(name_block),
        chunks[0],
    );

    let items: Vec<ListItem> = if popup.suggestions.is_empty() {
        vec![ListItem::new(Span::styled("No saved tabs", theme::dimmed()))]
    } else {
        popup
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let style = if popup.selected == Some(i) {
                    theme::selected()
                } else {
                    theme::normal()
                };
                ListItem::new(name.as_str()).style(style)
            })
            .collect()
    };
    let list = List::new(items).block(
        Block::default()
            .title("Saved tabs (↑↓)")
            .title_style(theme::dimmed()),
    );
    frame.render_widget(list, chunks[1]);

    if popup.selected.is_none() {
        let x = name_inner
            .x
            .saturating_add(to_u16(popup.name.chars().count()));
        frame.set_cursor_position(Position::new(x, name_inner.y));
    }
}

/// Render the raw-send confirmation for a draft that is not JSON.
pub fn render_confirm_raw(frame: &mut Frame, reason: &str) {
    let area = centered_rect(60, 9, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            "The draft is not valid JSON:",
            theme::warning_notice(),
        )),
        Line::from(Span::styled(reason, theme::dimmed())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Send raw text anyway? ", theme::bold()),
            Span::styled("(y/n)", theme::highlighted()),
        ]),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Send raw?")
                .borders(Borders::ALL)
                .border_style(theme::highlighted()),
        );
    frame.render_widget(paragraph, area);
}
