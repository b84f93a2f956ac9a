//! TaskService: the create-task pipeline. Each step is async and
//! independently observable; the pipeline stops early on ticket-blocking
//! and deduplication outcomes.

use std::sync::Arc;

use hp_core::config::{DedupScope, TasksConfig};
use hp_core::store::Store;
use hp_core::types::{Phase, Task, TaskStatus, Ticket, TicketHistory};
use hp_intelligence::capability::{IntelligenceProvider, PromptContext};
use hp_intelligence::vector_store::VectorStore;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::phase_engine::{PhaseEngine, PhaseEngineError, PhaseResolutionRequest};
use crate::queue_service::{AdmissionDecision, QueueService, QueueServiceError};

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("phase engine error: {0}")]
    PhaseEngine(#[from] PhaseEngineError),
    #[error("queue service error: {0}")]
    QueueService(#[from] QueueServiceError),
    #[error("intelligence error: {0}")]
    Intelligence(#[from] hp_intelligence::capability::CapabilityError),
    #[error("ticket tracking is enabled; a ticket_id is required for non-root callers")]
    TicketRequired,
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, TaskServiceError>;

/// Caller-supplied parameters for creating a task.
#[derive(Debug, Clone, Default)]
pub struct CreateTaskRequest {
    pub workflow_id: Uuid,
    pub raw_description: String,
    pub done_definition: String,
    pub ticket_id: Option<Uuid>,
    pub phase_id: Option<Uuid>,
    pub order: Option<i64>,
    pub working_directory: Option<String>,
    pub created_by_agent_id: Option<Uuid>,
    /// SDK/root agents are exempt from the mandatory-ticket rule.
    pub is_root_caller: bool,
}

/// Outcome of the create-task pipeline, reported at whichever step it
/// stopped.
#[derive(Debug, Clone)]
pub enum CreateTaskOutcome {
    Blocked(Task),
    Duplicated(Task),
    Queued(Task),
    ReadyToSpawn { task: Task, phase: Option<Phase>, working_directory: Option<String> },
}

pub struct TaskService {
    store: Arc<Store>,
    phase_engine: Arc<PhaseEngine>,
    queue: Arc<QueueService>,
    intelligence: Arc<dyn IntelligenceProvider>,
    vector_store: Arc<dyn VectorStore>,
    config: TasksConfig,
    memory_top_k: usize,
}

impl TaskService {
    pub fn new(
        store: Arc<Store>,
        phase_engine: Arc<PhaseEngine>,
        queue: Arc<QueueService>,
        intelligence: Arc<dyn IntelligenceProvider>,
        vector_store: Arc<dyn VectorStore>,
        config: TasksConfig,
        memory_top_k: usize,
    ) -> Self {
        Self { store, phase_engine, queue, intelligence, vector_store, config, memory_top_k }
    }

    /// Walk the transitive `blocked_by_ticket_ids` graph, returns true if
    /// any ancestor is unresolved or not ready for task creation.
    async fn ticket_is_blocked(&self, ticket: &Ticket) -> Result<bool> {
        if !ticket.is_ready_for_task_creation() {
            return Ok(true);
        }
        let mut frontier = ticket.blocked_by_ticket_ids.clone();
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = frontier.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(blocker) = self.store.get_ticket(id).await? {
                if !blocker.is_resolved {
                    return Ok(true);
                }
                frontier.extend(blocker.blocked_by_ticket_ids.clone());
            }
        }
        Ok(false)
    }

    pub async fn create_task(&self, req: CreateTaskRequest) -> Result<CreateTaskOutcome> {
        // (1) Insert placeholder row.
        let mut task = Task::new(req.workflow_id, req.raw_description.clone(), req.done_definition.clone());
        task.ticket_id = req.ticket_id;
        task.created_by_agent_id = req.created_by_agent_id;
        self.store.upsert_task(&task).await?;

        // (2) Ticket tracking enforcement.
        if self.store.any_board_config_exists().await? && !req.is_root_caller && req.ticket_id.is_none() {
            return Err(TaskServiceError::TicketRequired);
        }

        // (3) Ticket-blocking check.
        if let Some(ticket_id) = req.ticket_id {
            if let Some(ticket) = self.store.get_ticket(ticket_id).await? {
                if self.ticket_is_blocked(&ticket).await? {
                    task.status = TaskStatus::Blocked;
                    task.updated_at = chrono::Utc::now();
                    self.store.upsert_task(&task).await?;
                    info!(task_id = %task.id, %ticket_id, "task blocked by ticket");
                    return Ok(CreateTaskOutcome::Blocked(task));
                }
            }
        }

        // (4) Resolve phase; working directory precedence request > phase > server default.
        let phase = self
            .phase_engine
            .resolve_phase(&PhaseResolutionRequest {
                workflow_id: req.workflow_id,
                phase_id: req.phase_id,
                order: req.order,
                requesting_agent_current_task_phase_id: None,
            })
            .await?;
        task.phase_id = phase.as_ref().map(|p| p.id);

        let working_directory = req
            .working_directory
            .clone()
            .or_else(|| phase.as_ref().and_then(|p| p.working_directory.clone()));

        // (5) Memory retrieval + task enrichment.
        let memories = self.store.list_recent_memories(self.memory_top_k as i64).await?;
        let mut ctx = PromptContext::default();
        ctx.memory_snippets = memories.into_iter().map(|m| m.content).collect();
        let enrichment = self.intelligence.enrich_task(&task, phase.as_ref(), &ctx).await?;
        task.enriched_description = enrichment.enriched_description;
        task.estimated_complexity = Some(enrichment.estimated_complexity);

        // (6) Deduplication.
        if self.config.task_dedup_enabled {
            let embedding = self.intelligence.generate_embedding(&task.enriched_description).await?;
            let scope = match self.config.dedup_scope {
                DedupScope::Workflow => req.workflow_id.to_string(),
                DedupScope::Phase => phase
                    .as_ref()
                    .map(|p| p.id.to_string())
                    .unwrap_or_else(|| req.workflow_id.to_string()),
            };
            let matches = self.vector_store.search(&scope, &embedding, 5).await;
            if let Some(best) = matches.first() {
                if best.score >= self.config.dedup_similarity_threshold {
                    task.status = TaskStatus::Duplicated;
                    task.duplicate_of_task_id = Some(best.id);
                    task.similarity_score = Some(best.score);
                    task.updated_at = chrono::Utc::now();
                    self.store.upsert_task(&task).await?;
                    info!(task_id = %task.id, duplicate_of = %best.id, score = best.score, "task deduplicated");
                    return Ok(CreateTaskOutcome::Duplicated(task));
                }
            }
            task.embedding = Some(embedding.clone());
            self.vector_store.upsert(task.id, &scope, embedding).await;
        }

        // (7) Persist enriched fields + inherited validation_enabled.
        task.validation_enabled = phase.as_ref().and_then(|p| p.validation.as_ref()).map(|v| v.enabled).unwrap_or(false);
        task.updated_at = chrono::Utc::now();
        self.store.upsert_task(&task).await?;

        // (8) Queue admission.
        match self.queue.admit_or_queue(&mut task).await? {
            AdmissionDecision::Queue => Ok(CreateTaskOutcome::Queued(task)),
            AdmissionDecision::Admit => Ok(CreateTaskOutcome::ReadyToSpawn { task, phase, working_directory }),
        }
    }

    /// Restarting a `done`/`failed` task clears completion data and either
    /// queues or spawns.
    pub async fn restart_task(&self, task_id: Uuid) -> Result<CreateTaskOutcome> {
        let mut task = self.store.get_task(task_id).await?.ok_or(TaskServiceError::TaskNotFound(task_id))?;
        task.reset_for_restart();
        self.store.upsert_task(&task).await?;

        let phase = match task.phase_id {
            Some(phase_id) => self
                .phase_engine
                .resolve_phase(&PhaseResolutionRequest { workflow_id: task.workflow_id, phase_id: Some(phase_id), order: None, requesting_agent_current_task_phase_id: None })
                .await?,
            None => None,
        };

        let working_directory = phase.as_ref().and_then(|p| p.working_directory.clone());

        match self.queue.admit_or_queue(&mut task).await? {
            AdmissionDecision::Queue => Ok(CreateTaskOutcome::Queued(task)),
            AdmissionDecision::Admit => Ok(CreateTaskOutcome::ReadyToSpawn { task, phase, working_directory }),
        }
    }

    /// Record a ticket's field/status transitions in its audit log — used
    /// by callers wiring task-blocking sync.
    pub async fn record_ticket_history(&self, entry: TicketHistory) -> Result<()> {
        self.store.insert_ticket_history(&entry).await?;
        Ok(())
    }
}
