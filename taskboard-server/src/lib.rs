//! `Taskboard` store server library.
//!
//! Exposes the store server for use in tests and embedding. The server
//! accepts WebSocket connections and answers task store requests against a
//! shared in-memory table, optionally mirrored to a JSON snapshot file.

pub mod config;
pub mod server;
pub mod store;
