//! QueueService: admission control over concurrently-running phase agents.

use std::sync::Arc;

use hp_core::store::Store;
use hp_core::types::{Task, TaskStatus};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueServiceError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    #[error("task {0} is not queued")]
    NotQueued(Uuid),
}

pub type Result<T> = std::result::Result<T, QueueServiceError>;

/// Whether a task-ready-to-run should queue or be admitted immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Queue,
}

pub struct QueueService {
    store: Arc<Store>,
    max_concurrent_agents: u32,
}

impl QueueService {
    pub fn new(store: Arc<Store>, max_concurrent_agents: u32) -> Self {
        Self { store, max_concurrent_agents }
    }

    async fn active_phase_agent_count(&self) -> Result<u32> {
        use hp_core::types::{AgentKind, AgentStatus};
        let agents = self.store.list_active_agents().await?;
        Ok(agents
            .iter()
            .filter(|a| matches!(a.agent_type, AgentKind::Phase) && !matches!(a.status, AgentStatus::Terminated))
            .count() as u32)
    }

    pub fn max_concurrent_agents(&self) -> u32 {
        self.max_concurrent_agents
    }

    /// Number of currently active (non-terminated) phase agents.
    pub async fn active_agent_count(&self) -> Result<u32> {
        self.active_phase_agent_count().await
    }

    /// On task-ready-to-run: queue if the concurrency limit is reached and
    /// the task is not priority-boosted, otherwise mark it assigned so the
    /// caller can proceed to spawn.
    pub async fn admit_or_queue(&self, task: &mut Task) -> Result<AdmissionDecision> {
        let active = self.active_phase_agent_count().await?;
        if active >= self.max_concurrent_agents && !task.priority_boosted {
            task.status = TaskStatus::Queued;
            task.queued_at = Some(chrono::Utc::now());
            self.store.upsert_task(task).await?;
            info!(task_id = %task.id, active, limit = self.max_concurrent_agents, "task queued");
            Ok(AdmissionDecision::Queue)
        } else {
            task.status = TaskStatus::Assigned;
            self.store.upsert_task(task).await?;
            Ok(AdmissionDecision::Admit)
        }
    }

    /// Bump a queued task so it dequeues regardless of the concurrency
    /// limit (manual operator action).
    pub async fn bump(&self, task_id: Uuid) -> Result<Task> {
        let mut task = self.store.get_task(task_id).await?.ok_or(QueueServiceError::TaskNotFound(task_id))?;
        if task.status != TaskStatus::Queued {
            return Err(QueueServiceError::NotQueued(task_id));
        }
        task.priority_boosted = true;
        task.updated_at = chrono::Utc::now();
        self.store.upsert_task(&task).await?;
        info!(task_id = %task_id, "task bumped");
        Ok(task)
    }

    /// Cancel a queued task: mark it failed with a fixed reason string.
    pub async fn cancel(&self, task_id: Uuid) -> Result<Task> {
        let mut task = self.store.get_task(task_id).await?.ok_or(QueueServiceError::TaskNotFound(task_id))?;
        if task.status != TaskStatus::Queued {
            return Err(QueueServiceError::NotQueued(task_id));
        }
        task.status = TaskStatus::Failed;
        task.failure_reason = Some("Cancelled by user from queue".to_string());
        task.updated_at = chrono::Utc::now();
        self.store.upsert_task(&task).await?;
        info!(task_id = %task_id, "queued task cancelled");
        Ok(task)
    }

    /// The next admissible queued task, ordered `priority_boosted desc,
    /// priority desc, queued_at asc` (FIFO within each priority tier).
    pub async fn next_admissible(&self) -> Result<Option<Task>> {
        let active = self.active_phase_agent_count().await?;
        let queued = self.store.list_queued_tasks_by_priority().await?;
        if queued.is_empty() {
            return Ok(None);
        }
        if active < self.max_concurrent_agents {
            return Ok(Some(queued[0].clone()));
        }
        Ok(queued.into_iter().find(|t| t.priority_boosted))
    }

    pub async fn list_queued(&self) -> Result<Vec<Task>> {
        Ok(self.store.list_queued_tasks_by_priority().await?)
    }
}
