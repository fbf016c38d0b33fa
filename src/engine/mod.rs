//! Caller-side engine: decides *when* the planner runs.

pub mod watcher;

pub use watcher::RoundWatcher;
