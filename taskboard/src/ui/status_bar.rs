//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Mode};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.mode {
        Mode::Browse => {
            "←→: column | ↑↓/jk: select | a: add | e: edit | d: delete | space: move | r/R: refresh | q: quit"
        }
        Mode::Form(_) => "Tab: switch field | Enter: save | Esc: cancel",
        Mode::ConfirmDelete { .. } => "y: delete | n/Esc: keep",
        Mode::Grab { .. } => "↑↓: place | Enter/space: drop | Esc: cancel",
    };

    let busy = app.pending.iter().sum::<usize>();
    let (dot_color, activity) = if busy > 0 {
        (theme::WARNING, format!("{busy} saving"))
    } else {
        (theme::SUCCESS, "idle".to_string())
    };

    let mut spans = vec![
        Span::styled("Taskboard", theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {activity}")),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::raw(status.as_str()));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
