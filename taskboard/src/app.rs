//! Application state and event handling.
//!
//! [`App`] is purely synchronous: key presses turn into [`BoardCommand`]s for
//! the caller to dispatch, and finished operations come back as
//! [`BoardEvent`]s. The column contents are copied in from the managers'
//! snapshots on every tick.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskboard_proto::task::{Category, Task, TaskFormData, TaskId};

use crate::board::{BoardAction, BoardCommand, BoardEvent};
use crate::tasks::CategoryState;

/// Which form field receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// The title line.
    Title,
    /// The description line.
    Description,
}

/// An open add/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    /// Category the task goes into.
    pub category: Category,
    /// `Some` when editing an existing task.
    pub editing: Option<TaskId>,
    /// Title being typed.
    pub title: String,
    /// Description being typed.
    pub description: String,
    /// Focused field.
    pub field: FormField,
    /// Ticket of the submission waiting for the store, if any.
    pub submitting: Option<u64>,
}

impl TaskForm {
    fn new(category: Category) -> Self {
        Self {
            category,
            editing: None,
            title: String::new(),
            description: String::new(),
            field: FormField::Title,
            submitting: None,
        }
    }

    fn edit(task: &Task) -> Self {
        Self {
            category: task.category,
            editing: Some(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            field: FormField::Title,
            submitting: None,
        }
    }

    const fn input_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
        }
    }

    fn to_form_data(&self) -> TaskFormData {
        TaskFormData::new(self.title.clone(), Some(self.description.clone()))
    }
}

/// What the keyboard currently drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Moving around the columns.
    Browse,
    /// Editing a task form.
    Form(TaskForm),
    /// Waiting for a yes/no on deleting a task.
    ConfirmDelete {
        /// Task to delete.
        id: TaskId,
        /// Its title, for the prompt.
        title: String,
    },
    /// A task has been picked up and is being moved with the arrow keys.
    Grab {
        /// The carried task.
        active: TaskId,
        /// Position it was picked up from.
        origin: usize,
        /// Position it would be dropped on.
        target: usize,
    },
}

/// Main application state.
pub struct App {
    /// Focused column.
    pub focus: Category,
    /// Selected row per column.
    pub selected: [usize; 3],
    /// Last snapshot per column.
    pub columns: [CategoryState; 3],
    /// Dispatched operations not yet reported back, per column.
    pub pending: [usize; 3],
    /// Current input mode.
    pub mode: Mode,
    /// Message for the status bar.
    pub status: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Longest title the form accepts.
    pub max_title_len: usize,
    /// chrono format for task timestamps.
    pub timestamp_format: String,
    next_ticket: u64,
}

impl App {
    /// Create an app with empty columns and the first column focused.
    #[must_use]
    pub fn new(max_title_len: usize, timestamp_format: impl Into<String>) -> Self {
        Self {
            focus: Category::Work,
            selected: [0; 3],
            columns: Default::default(),
            pending: [0; 3],
            mode: Mode::Browse,
            status: None,
            should_quit: false,
            max_title_len,
            timestamp_format: timestamp_format.into(),
            next_ticket: 0,
        }
    }

    /// Whether `category` has an operation in flight.
    #[must_use]
    pub const fn is_busy(&self, category: Category) -> bool {
        self.pending[category.index()] > 0
    }

    /// Tasks currently shown in `category`.
    #[must_use]
    pub fn tasks(&self, category: Category) -> &[Task] {
        &self.columns[category.index()].tasks
    }

    /// The task under the cursor in the focused column.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks(self.focus).get(self.selected[self.focus.index()])
    }

    /// Command that reloads every column, counted as in flight.
    pub fn refresh_all(&mut self) -> BoardCommand {
        self.issue(BoardCommand::RefreshAll)
    }

    /// Replace a column's snapshot, keeping the cursor in range.
    pub fn sync(&mut self, category: Category, state: CategoryState) {
        let idx = category.index();
        let len = state.tasks.len();
        self.columns[idx] = state;
        self.selected[idx] = self.selected[idx].min(len.saturating_sub(1));

        let lost_grab = match &self.mode {
            Mode::Grab { active, .. } => {
                category == self.focus && !self.columns[idx].tasks.iter().any(|t| &t.id == active)
            }
            _ => false,
        };
        if lost_grab {
            self.mode = Mode::Browse;
            self.status = Some("moved task disappeared".to_string());
        }
    }

    /// Record the outcome of a dispatched operation.
    pub fn apply_event(&mut self, event: &BoardEvent) {
        let idx = event.category.index();
        self.pending[idx] = self.pending[idx].saturating_sub(1);

        // A form abandoned with Esc may still report; only its own ticket
        // settles the open form.
        let form_waiting = event.ticket.is_some()
            && matches!(&self.mode, Mode::Form(form) if form.submitting == event.ticket);

        match &event.outcome {
            Ok(()) => {
                self.status = Some(format!(
                    "{}: task {}",
                    event.category.label(),
                    event.action.done_label()
                ));
                if form_waiting {
                    self.mode = Mode::Browse;
                }
            }
            Err(message) => {
                self.status = Some(format!("{}: {message}", event.category.label()));
                match &mut self.mode {
                    Mode::Form(form) if form_waiting => form.submitting = None,
                    _ => {}
                }
            }
        }
    }

    /// Handle a key event, returning a command to dispatch if any.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Form(_) => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
            Mode::Grab { .. } => self.handle_grab_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => {
                self.focus = prev_category(self.focus);
                None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                self.focus = next_category(self.focus);
                None
            }
            KeyCode::Up if shift => self.nudge_selected(-1),
            KeyCode::Down if shift => self.nudge_selected(1),
            KeyCode::Char('K') => self.nudge_selected(-1),
            KeyCode::Char('J') => self.nudge_selected(1),
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(-1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(1);
                None
            }
            KeyCode::Char('a' | 'n') => {
                self.mode = Mode::Form(TaskForm::new(self.focus));
                None
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(task) = self.selected_task() {
                    self.mode = Mode::Form(TaskForm::edit(task));
                }
                None
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    self.mode = Mode::ConfirmDelete {
                        id: task.id.clone(),
                        title: task.title.clone(),
                    };
                }
                None
            }
            KeyCode::Char(' ' | 'g') => {
                let origin = self.selected[self.focus.index()];
                if let Some(task) = self.selected_task() {
                    self.mode = Mode::Grab {
                        active: task.id.clone(),
                        origin,
                        target: origin,
                    };
                    self.status =
                        Some("moving: arrows to place, enter to drop, esc to cancel".into());
                }
                None
            }
            KeyCode::Char('r') => Some(self.issue(BoardCommand::Refresh(self.focus))),
            KeyCode::Char('R') => Some(self.refresh_all()),
            _ => None,
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let max_title_len = self.max_title_len;
        let Mode::Form(form) = &mut self.mode else {
            return None;
        };
        if form.submitting.is_some() {
            if key.code == KeyCode::Esc {
                self.status = Some("still saving, the result will show when it finishes".into());
                self.mode = Mode::Browse;
            }
            return None;
        }

        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                None
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.field = match form.field {
                    FormField::Title => FormField::Description,
                    FormField::Description => FormField::Title,
                };
                None
            }
            KeyCode::Backspace => {
                form.input_mut().pop();
                None
            }
            KeyCode::Char(c) => {
                if form.field == FormField::Title && form.title.chars().count() >= max_title_len {
                    return None;
                }
                form.input_mut().push(c);
                None
            }
            KeyCode::Enter => {
                if form.title.trim().is_empty() {
                    self.status = Some("title is required".into());
                    return None;
                }
                self.next_ticket += 1;
                let ticket = self.next_ticket;
                form.submitting = Some(ticket);
                let category = form.category;
                let data = form.to_form_data();
                let command = match form.editing.clone() {
                    Some(id) => BoardCommand::Update {
                        category,
                        id,
                        form: data,
                        ticket,
                    },
                    None => BoardCommand::Add {
                        category,
                        form: data,
                        ticket,
                    },
                };
                Some(self.issue(command))
            }
            _ => None,
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                let Mode::ConfirmDelete { id, .. } = std::mem::replace(&mut self.mode, Mode::Browse)
                else {
                    return None;
                };
                Some(self.issue(BoardCommand::Delete {
                    category: self.focus,
                    id,
                }))
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                self.mode = Mode::Browse;
                None
            }
            _ => None,
        }
    }

    fn handle_grab_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let len = self.tasks(self.focus).len();
        let Mode::Grab { target, origin, .. } = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                *target = target.saturating_sub(1);
                self.selected[self.focus.index()] = *target;
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                *target = (*target + 1).min(len.saturating_sub(1));
                self.selected[self.focus.index()] = *target;
                None
            }
            KeyCode::Esc => {
                self.selected[self.focus.index()] = *origin;
                self.mode = Mode::Browse;
                self.status = None;
                None
            }
            KeyCode::Enter | KeyCode::Char(' ' | 'g') => {
                let previous = std::mem::replace(&mut self.mode, Mode::Browse);
                let Mode::Grab { active, target, .. } = previous else {
                    return None;
                };
                self.status = None;
                let over = self.tasks(self.focus).get(target)?.id.clone();
                if over == active {
                    return None;
                }
                Some(self.issue(BoardCommand::Move {
                    category: self.focus,
                    active,
                    over,
                }))
            }
            _ => None,
        }
    }

    /// Move the selected task one row up or down right away.
    fn nudge_selected(&mut self, delta: isize) -> Option<BoardCommand> {
        let idx = self.focus.index();
        let from = self.selected[idx];
        let to = from.checked_add_signed(delta)?;
        let tasks = self.tasks(self.focus);
        let active = tasks.get(from)?.id.clone();
        let over = tasks.get(to)?.id.clone();
        self.selected[idx] = to;
        Some(self.issue(BoardCommand::Move {
            category: self.focus,
            active,
            over,
        }))
    }

    fn move_cursor(&mut self, delta: isize) {
        let idx = self.focus.index();
        let len = self.columns[idx].tasks.len();
        let next = self.selected[idx].saturating_add_signed(delta);
        self.selected[idx] = next.min(len.saturating_sub(1));
    }

    /// Count `command` as in flight for the categories it touches.
    fn issue(&mut self, command: BoardCommand) -> BoardCommand {
        match &command {
            BoardCommand::RefreshAll => {
                for pending in &mut self.pending {
                    *pending += 1;
                }
            }
            BoardCommand::Refresh(category)
            | BoardCommand::Add { category, .. }
            | BoardCommand::Update { category, .. }
            | BoardCommand::Delete { category, .. }
            | BoardCommand::Move { category, .. }
            | BoardCommand::Reorder { category, .. } => self.pending[category.index()] += 1,
        }
        command
    }
}

const fn next_category(category: Category) -> Category {
    match category {
        Category::Work => Category::Study,
        Category::Study => Category::Life,
        Category::Life => Category::Work,
    }
}

const fn prev_category(category: Category) -> Category {
    match category {
        Category::Work => Category::Life,
        Category::Study => Category::Work,
        Category::Life => Category::Study,
    }
}
