//! Category column rendering.

use std::fmt::Write as _;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use taskboard_proto::task::{Category, Task, TaskId, Timestamp};

use super::theme;
use crate::app::{App, Mode};

/// Render one category column: header, task list and error line.
pub fn render(frame: &mut Frame, area: Rect, app: &App, category: Category) {
    let state = &app.columns[category.index()];
    let is_focused = app.focus == category;

    let mut title = vec![
        Span::styled(
            format!(" {} {} ", category.icon(), category.label()),
            theme::panel_title(theme::category_color(category)),
        ),
        Span::styled(format!("({}) ", state.tasks.len()), theme::dimmed()),
    ];
    if state.is_loading() || app.is_busy(category) {
        title.push(Span::styled("⟳ ", theme::normal().fg(theme::WARNING)));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let error_height = if state.error.is_some() { 2 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(error_height)])
        .split(inner);

    let grab = match &app.mode {
        Mode::Grab { active, target, .. } if is_focused => Some((active, *target)),
        _ => None,
    };
    let rows = display_order(&state.tasks, grab);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|task| {
            let carried = grab.is_some_and(|(active, _)| &task.id == active);
            task_item(task, carried, &app.timestamp_format)
        })
        .collect();

    if items.is_empty() {
        let hint = if state.is_loading() {
            "loading…"
        } else {
            "no tasks yet, press a to add one"
        };
        frame.render_widget(Paragraph::new(hint).style(theme::dimmed()), chunks[0]);
    } else {
        let mut list_state = ListState::default();
        if is_focused {
            list_state.select(Some(app.selected[category.index()]));
        }
        let highlight = if grab.is_some() {
            theme::grabbed()
        } else {
            theme::selected()
        };
        let list = List::new(items).highlight_style(highlight);
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
    }

    if let Some(error) = &state.error {
        let paragraph = Paragraph::new(format!("⚠ {error}"))
            .style(theme::error_line())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, chunks[1]);
    }
}

/// The list as shown, with a carried task previewed at its drop position.
fn display_order<'a>(tasks: &'a [Task], grab: Option<(&TaskId, usize)>) -> Vec<&'a Task> {
    let mut rows: Vec<&Task> = tasks.iter().collect();
    let Some((active, target)) = grab else {
        return rows;
    };
    if let Some(from) = rows.iter().position(|t| &t.id == active) {
        let carried = rows.remove(from);
        rows.insert(target.min(rows.len()), carried);
    }
    rows
}

fn task_item<'a>(task: &'a Task, carried: bool, timestamp_format: &str) -> ListItem<'a> {
    let marker = if carried { "≡ " } else { "• " };
    let mut lines = vec![Line::from(vec![
        Span::raw(marker),
        Span::styled(task.title.as_str(), theme::normal()),
    ])];
    if let Some(description) = &task.description {
        lines.push(Line::from(Span::styled(
            format!("  {description}"),
            theme::dimmed(),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("  {}", format_timestamp(task.updated_at, timestamp_format)),
        theme::timestamp(),
    )));
    ListItem::new(lines)
}

/// Formats a store timestamp in local time, falling back to raw milliseconds.
fn format_timestamp(ts: Timestamp, format: &str) -> String {
    let millis = i64::try_from(ts.as_millis()).unwrap_or(i64::MAX);
    let Some(utc) = chrono::DateTime::from_timestamp_millis(millis) else {
        return ts.as_millis().to_string();
    };
    let local = utc.with_timezone(&chrono::Local);
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_err() {
        return ts.as_millis().to_string();
    }
    out
}
