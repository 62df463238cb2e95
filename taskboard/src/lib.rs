//! `Taskboard`: personal task board with work, study and life columns.

pub mod app;
pub mod board;
pub mod config;
pub mod store;
pub mod tasks;
pub mod ui;
