//! Daemon: owns every domain service and runs the background queue-sweep
//! loop.
//!
//! The loop wakes every `queue_sweep_secs` (default 60s) and admits the
//! next queued task if the concurrency limit allows it. On shutdown it
//! waits up to 5 seconds for the current sweep to finish before the
//! process exits.

use std::sync::Arc;
use std::time::Duration;

use hp_agents::{AgentManager, ValidationEngine};
use hp_bridge::event_bus::EventBus;
use hp_bridge::protocol::BroadcastEvent;
use hp_bridge::state::ApiState;
use hp_core::config::Config;
use hp_core::store::Store;
use hp_core::worktree_manager::WorktreeManager;
use hp_harness::rate_limiter::{MultiKeyRateLimiter, RateLimitConfig};
use hp_harness::shutdown::ShutdownSignal;
use hp_intelligence::capability::{DeterministicProvider, IntelligenceProvider};
use hp_intelligence::vector_store::{InMemoryVectorStore, VectorStore};
use hp_queue::phase_engine::{PhaseEngine, PhaseResolutionRequest};
use hp_queue::queue_service::QueueService;
use hp_queue::task_service::TaskService;
use hp_session::pty_pool::PtyPool;
use hp_tickets::ticket_service::TicketService;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_QUEUE_SWEEP_SECS: u64 = 60;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("queue service error: {0}")]
    Queue(#[from] hp_queue::queue_service::QueueServiceError),
    #[error("phase engine error: {0}")]
    PhaseEngine(#[from] hp_queue::phase_engine::PhaseEngineError),
    #[error("agent manager error: {0}")]
    Agent(#[from] hp_agents::agent_manager::AgentManagerError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

/// Every long-lived component the daemon and the API layer share.
pub struct Daemon {
    pub config: Config,
    pub store: Arc<Store>,
    pub worktree: Arc<WorktreeManager>,
    pub phase_engine: Arc<PhaseEngine>,
    pub queue: Arc<QueueService>,
    pub tasks: Arc<TaskService>,
    pub tickets: Arc<TicketService>,
    pub agents: Arc<AgentManager>,
    pub validation: Arc<ValidationEngine>,
    pub events: EventBus,
    pub shutdown: ShutdownSignal,
}

impl Daemon {
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(Store::new_in_memory().await?);
        Ok(Self::with_store(config, store))
    }

    pub async fn open(config: Config, db_path: impl AsRef<std::path::Path>) -> Result<Self> {
        let store = Arc::new(Store::new(db_path).await?);
        Ok(Self::with_store(config, store))
    }

    fn with_store(config: Config, store: Arc<Store>) -> Self {
        let worktree = Arc::new(WorktreeManager::new(
            config.repo.main_repo_path.clone(),
            config.repo.worktree_base_path.clone(),
            config.repo.worktree_branch_prefix.clone(),
            config.repo.base_branch.clone(),
            store.clone(),
        ));
        let phase_engine = Arc::new(PhaseEngine::new(store.clone()));
        let queue = Arc::new(QueueService::new(store.clone(), config.agents.max_concurrent_agents));
        let intelligence: Arc<dyn IntelligenceProvider> = Arc::new(DeterministicProvider);
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let tasks = Arc::new(TaskService::new(
            store.clone(),
            phase_engine.clone(),
            queue.clone(),
            intelligence.clone(),
            vector_store.clone(),
            config.tasks.clone(),
            5,
        ));
        let tickets = Arc::new(TicketService::new(store.clone(), intelligence.clone(), vector_store.clone()));
        let pty_pool = Arc::new(PtyPool::new(config.agents.max_concurrent_agents as usize));
        let agents = Arc::new(AgentManager::new(
            store.clone(),
            worktree.clone(),
            pty_pool,
            intelligence,
            config.agents.clone(),
        ));
        let validation = Arc::new(ValidationEngine::new(store.clone(), worktree.clone(), agents.clone()));

        Self {
            config,
            store,
            worktree,
            phase_engine,
            queue,
            tasks,
            tickets,
            agents,
            validation,
            events: EventBus::new(),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Build the `ApiState` handed to the HTTP router, sharing every
    /// service `Arc` this daemon already owns.
    pub fn api_state(&self) -> ApiState {
        ApiState::new(
            self.store.clone(),
            self.worktree.clone(),
            self.phase_engine.clone(),
            self.queue.clone(),
            self.tasks.clone(),
            self.tickets.clone(),
            self.agents.clone(),
            self.validation.clone(),
            self.events.clone(),
        )
    }

    /// Build the complete HTTP router (authenticated routes plus
    /// `/health`, `/sse`, `/ws`), layered with the configured rate limits
    /// and API key.
    pub fn api_router(&self) -> axum::Router {
        let rate_limiter = Arc::new(MultiKeyRateLimiter::new(
            RateLimitConfig::per_minute(self.config.http.rate_limit_global_per_minute as u64),
            RateLimitConfig::per_minute(self.config.http.rate_limit_per_user_per_minute as u64),
            RateLimitConfig::per_minute(self.config.http.rate_limit_per_endpoint_per_minute as u64),
        ));
        hp_bridge::routes::full_router(self.api_state(), self.config.http.api_key.clone(), rate_limiter)
    }

    /// The background queue-sweep loop: every sweep interval, admit the
    /// next admissible queued task if one exists.
    /// Exits within [`SHUTDOWN_GRACE`] of a shutdown signal.
    pub async fn run_background_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(DEFAULT_QUEUE_SWEEP_SECS));
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep_once().await {
                        warn!(%err, "queue sweep failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("background loop received shutdown, draining");
                    tokio::time::timeout(SHUTDOWN_GRACE, self.sweep_once()).await.ok();
                    break;
                }
            }
        }
        info!("background loop stopped");
    }

    async fn sweep_once(&self) -> Result<()> {
        if let Some(mut task) = self.queue.next_admissible().await? {
            task.status = hp_core::types::TaskStatus::Assigned;
            task.priority_boosted = false;
            task.updated_at = chrono::Utc::now();
            self.store.upsert_task(&task).await?;

            let phase = self
                .phase_engine
                .resolve_phase(&PhaseResolutionRequest {
                    workflow_id: task.workflow_id,
                    phase_id: task.phase_id,
                    order: None,
                    requesting_agent_current_task_phase_id: None,
                })
                .await?;
            let cli_overrides = phase.as_ref().map(|p| p.cli_overrides.clone()).unwrap_or_default();
            let working_directory_hint = phase.as_ref().and_then(|p| p.working_directory.as_deref());

            let agent = self
                .agents
                .spawn_phase_agent(&task, phase.as_ref(), &cli_overrides, None, working_directory_hint)
                .await?;

            self.events.publish(BroadcastEvent::TaskDequeued { task_id: task.id });
            info!(task_id = %task.id, agent_id = %agent.id, "dequeued task from sweep, spawned agent");
        }
        Ok(())
    }
}
