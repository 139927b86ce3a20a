//! Persistence layer for the mission planner.
//!
//! SQLite-backed storage for missions and their ordered points. The
//! in-memory `AppState` cache writes through to it.

pub mod db;
pub mod missions;

pub use db::{init_database, Database};
