//! Popups: the add/edit form and the delete confirmation.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::theme;
use crate::app::{FormField, TaskForm};

/// Render the add/edit form centered over `area`.
pub fn render_form(frame: &mut Frame, area: Rect, form: &TaskForm, max_title_len: usize) {
    let popup = centered(area, 60, 9);
    frame.render_widget(Clear, popup);

    let verb = if form.editing.is_some() { "Edit" } else { "New" };
    let mut title = format!(" {verb} {} task ", form.category.label());
    if form.submitting.is_some() {
        title.push_str("(saving…) ");
    }
    let block = Block::default()
        .title(Span::styled(
            title,
            theme::panel_title(theme::category_color(form.category)),
        ))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let count = form.title.chars().count();
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Title ", theme::bold()),
            Span::styled(format!("{count}/{max_title_len}"), theme::dimmed()),
        ])),
        rows[0],
    );
    frame.render_widget(field(&form.title, form.field == FormField::Title), rows[1]);
    frame.render_widget(
        Paragraph::new(Span::styled("Description (optional)", theme::bold())),
        rows[2],
    );
    frame.render_widget(
        field(&form.description, form.field == FormField::Description),
        rows[3],
    );
}

/// Render the delete confirmation centered over `area`.
pub fn render_confirm_delete(frame: &mut Frame, area: Rect, title: &str) {
    let popup = centered(area, 50, 5);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(" Delete task? ", theme::panel_title(theme::ERROR)))
        .borders(Borders::ALL)
        .border_style(theme::normal().fg(theme::ERROR));
    let text = vec![
        Line::from(Span::styled(format!("\"{title}\""), theme::bold())),
        Line::from(Span::styled("y: delete   n: keep", theme::dimmed())),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        popup,
    );
}

fn field(text: &str, focused: bool) -> Paragraph<'_> {
    if focused {
        Paragraph::new(Line::from(vec![
            Span::styled(text, theme::normal()),
            Span::styled("▏", theme::highlighted()),
        ]))
    } else {
        Paragraph::new(Span::styled(text, theme::dimmed()))
    }
}

/// A `width`% wide, `height` rows tall rect centered in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(width)])
        .flex(Flex::Center)
        .areas(row);
    popup
}
