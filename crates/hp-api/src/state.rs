//! Shared application state for the HTTP API router.
//!
//! Holds `Arc` handles to every domain service plus the event bus that
//! fans broadcast events out to SSE/WebSocket subscribers. Constructed
//! once by the daemon binary from its `Daemon` and cloned cheaply into
//! every request.

use std::sync::Arc;

use hp_agents::{AgentManager, ValidationEngine};
use hp_core::store::Store;
use hp_core::worktree_manager::WorktreeManager;
use hp_queue::phase_engine::PhaseEngine;
use hp_queue::queue_service::QueueService;
use hp_queue::task_service::TaskService;
use hp_tickets::ticket_service::TicketService;

use crate::event_bus::EventBus;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
    pub worktree: Arc<WorktreeManager>,
    pub phase_engine: Arc<PhaseEngine>,
    pub queue: Arc<QueueService>,
    pub tasks: Arc<TaskService>,
    pub tickets: Arc<TicketService>,
    pub agents: Arc<AgentManager>,
    pub validation: Arc<ValidationEngine>,
    pub events: EventBus,
}

impl ApiState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        worktree: Arc<WorktreeManager>,
        phase_engine: Arc<PhaseEngine>,
        queue: Arc<QueueService>,
        tasks: Arc<TaskService>,
        tickets: Arc<TicketService>,
        agents: Arc<AgentManager>,
        validation: Arc<ValidationEngine>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            worktree,
            phase_engine,
            queue,
            tasks,
            tickets,
            agents,
            validation,
            events,
        }
    }
}
