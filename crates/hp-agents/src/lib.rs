//! Agent execution, orchestration, and lifecycle management for Hephaestus.
//!
//! This crate provides the agent layer that coordinates CLI coding agents
//! (Claude, Codex, Gemini, and GLM-family models reached through the Claude
//! CLI): spawning them into isolated worktrees, delivering their initial
//! prompts, relaying broadcast/direct messages between them, restarting
//! stuck agents, and iterating task/workflow-result validation with a
//! validator agent before work is merged.

pub mod agent_manager;
pub mod state_machine;
pub mod validation_engine;

pub use agent_manager::{AgentManager, AgentManagerError};
pub use validation_engine::{TaskValidationOutcome, ValidationEngine, ValidationError};
