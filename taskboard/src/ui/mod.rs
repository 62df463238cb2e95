//! Terminal UI rendering.

pub mod column;
pub mod form;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};
use taskboard_proto::task::Category;

use crate::app::{App, Mode};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Create main layout with status bar at bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    // One column per category
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(content_area);

    for category in Category::ALL {
        column::render(frame, columns[category.index()], app, category);
    }

    match &app.mode {
        Mode::Form(task_form) => {
            form::render_form(frame, content_area, task_form, app.max_title_len);
        }
        Mode::ConfirmDelete { title, .. } => {
            form::render_confirm_delete(frame, content_area, title);
        }
        Mode::Browse | Mode::Grab { .. } => {}
    }

    status_bar::render(frame, status_area, app);
}
