//! Background daemon for the orchestrator.
//!
//! Wires the persistent store, worktree engine, and domain services
//! (phase engine, queue, tasks, tickets, agents, validation) together and
//! runs the background queue-sweep loop.

pub mod daemon;
pub mod tool_executor;

pub use daemon::{Daemon, DaemonError};
