//! Shared data model and store wire protocol for `Taskboard`.

pub mod codec;
pub mod store;
pub mod table;
pub mod task;
