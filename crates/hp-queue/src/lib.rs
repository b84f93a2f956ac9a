//! Phase materialization, queue admission, and task creation for Hephaestus.
//!
//! PhaseEngine owns workflow-definition registration and phase resolution;
//! QueueService enforces the `max_concurrent_agents` admission policy;
//! TaskService runs the create-task pipeline over both plus the
//! intelligence and vector-store seams. Spawning the resulting agent and
//! iterating its validation are out of scope here — see `hp-agents`.

pub mod phase_engine;
pub mod queue_service;
pub mod task_service;

pub use phase_engine::{PhaseEngine, PhaseEngineError, PhaseResolutionRequest};
pub use queue_service::{AdmissionDecision, QueueService, QueueServiceError};
pub use task_service::{CreateTaskOutcome, CreateTaskRequest, TaskService, TaskServiceError};
