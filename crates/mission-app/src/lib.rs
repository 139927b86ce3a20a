//! Shared library surface for the mission planner binary and its tests.

pub mod config;
pub mod console_map;
pub mod persistence;
pub mod session;
pub mod state;
