//! ValidationEngine (S8 / C5): task- and workflow-result-level validation
//! iteration loops, built around the Task/AgentResult/WorkflowResult model.

use std::sync::Arc;

use hp_core::store::Store;
use hp_core::types::{
    AgentKind, AgentStatus, CliOverrides, OnResultFound, ResultValidationStatus, Task, TaskStatus, ValidationReview,
    WorkflowExecutionStatus,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::agent_manager::AgentManager;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("worktree error: {0}")]
    Worktree(#[from] hp_core::worktree_manager::WorktreeManagerError),
    #[error("agent manager error: {0}")]
    AgentManager(#[from] crate::agent_manager::AgentManagerError),
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    #[error("task {0} is not under review")]
    NotUnderReview(Uuid),
    #[error("agent {0} has no associated worktree")]
    NoWorktree(Uuid),
    #[error("workflow execution {0} not found")]
    ExecutionNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Outcome of a passed task validation, for the caller to act on (queue
/// processing and follow-up task creation live in `hp-queue`, which this
/// crate does not depend on).
#[derive(Debug, Clone, Default)]
pub struct TaskValidationOutcome {
    pub task: Task,
    pub passed: bool,
    /// Follow-up task descriptions recommended by the validator; the
    /// caller is responsible for routing these through TaskService.
    pub recommended_follow_ups: Vec<String>,
    pub merge_commit_sha: Option<String>,
}

pub struct ValidationEngine {
    store: Arc<Store>,
    worktree: Arc<hp_core::worktree_manager::WorktreeManager>,
    agents: Arc<AgentManager>,
}

impl ValidationEngine {
    pub fn new(store: Arc<Store>, worktree: Arc<hp_core::worktree_manager::WorktreeManager>, agents: Arc<AgentManager>) -> Self {
        Self { store, worktree, agents }
    }

    /// Begin task validation after an agent reports `status=done` on a
    /// `validation_enabled` task.
    pub async fn start_task_validation(&self, task_id: Uuid, original_agent_id: Uuid, cli_overrides: &CliOverrides) -> Result<()> {
        let mut task = self.store.get_task(task_id).await?.ok_or(ValidationError::TaskNotFound(task_id))?;
        task.status = TaskStatus::UnderReview;
        task.validation_iteration += 1;
        task.updated_at = chrono::Utc::now();
        self.store.upsert_task(&task).await?;

        let mut agent = self.store.get_agent(original_agent_id).await?.ok_or(ValidationError::NoWorktree(original_agent_id))?;
        agent.kept_alive_for_validation = true;
        self.store.upsert_agent(&agent).await?;

        let commit = self.worktree.commit_for_validation(original_agent_id, task.validation_iteration, None).await?;

        let worktree = self.store.get_agent_worktree(original_agent_id).await?.ok_or(ValidationError::NoWorktree(original_agent_id))?;

        self.agents
            .spawn_validator_agent(task_id, &worktree.worktree_path, AgentKind::Validator, cli_overrides, None)
            .await?;

        task.status = TaskStatus::ValidationInProgress;
        task.updated_at = chrono::Utc::now();
        self.store.upsert_task(&task).await?;

        info!(%task_id, %original_agent_id, commit_sha = %commit.commit_sha, "task validation started");
        Ok(())
    }

    /// Validator submits a verdict on a task.
    pub async fn submit_task_review(
        &self,
        task_id: Uuid,
        validator_agent_id: Uuid,
        original_agent_id: Uuid,
        passed: bool,
        feedback: &str,
        recommended_follow_ups: Vec<String>,
    ) -> Result<TaskValidationOutcome> {
        let mut task = self.store.get_task(task_id).await?.ok_or(ValidationError::TaskNotFound(task_id))?;
        if task.status != TaskStatus::ValidationInProgress {
            return Err(ValidationError::NotUnderReview(task_id));
        }

        self.store
            .insert_validation_review(&ValidationReview {
                id: Uuid::new_v4(),
                task_id,
                validator_agent_id,
                iteration: task.validation_iteration,
                passed,
                feedback: feedback.to_string(),
                created_at: chrono::Utc::now(),
            })
            .await?;

        if passed {
            task.status = TaskStatus::Done;
            task.completed_at = Some(chrono::Utc::now());
            task.updated_at = chrono::Utc::now();
            self.store.upsert_task(&task).await?;

            for result in self.results_for_task(task_id).await? {
                self.store.update_agent_result_status(result.id, ResultValidationStatus::Verified, None).await?;
            }

            let merge = self.worktree.merge_to_parent(original_agent_id).await?;
            if let Some(ticket_id) = task.ticket_id {
                if let Some(sha) = &merge.merge_commit_sha {
                    self.store
                        .insert_ticket_commit(&hp_core::types::TicketCommit { id: Uuid::new_v4(), ticket_id, commit_sha: sha.clone(), created_at: chrono::Utc::now() })
                        .await?;
                }
            }

            self.agents.terminate_agent(original_agent_id).await?;
            self.agents.terminate_agent(validator_agent_id).await?;

            Ok(TaskValidationOutcome { task, passed: true, recommended_follow_ups, merge_commit_sha: merge.merge_commit_sha })
        } else {
            task.status = TaskStatus::NeedsWork;
            task.last_validation_feedback = Some(feedback.to_string());
            task.updated_at = chrono::Utc::now();
            self.store.upsert_task(&task).await?;

            self.agents.forward_feedback(original_agent_id, feedback).await?;
            self.agents.terminate_agent(validator_agent_id).await?;

            Ok(TaskValidationOutcome { task, passed: false, recommended_follow_ups: Vec::new(), merge_commit_sha: None })
        }
    }

    async fn results_for_task(&self, task_id: Uuid) -> Result<Vec<hp_core::types::AgentResult>> {
        Ok(self.store.list_agent_results_for_task(task_id).await?)
    }

    /// Workflow result validation has the same shape but operates on
    /// `WorkflowResult`/`result_criteria`.
    pub async fn submit_result_review(
        &self,
        workflow_id: Uuid,
        result_agent_id: Uuid,
        validator_agent_id: Uuid,
        passed: bool,
        feedback: &str,
        on_result_found: OnResultFound,
    ) -> Result<bool> {
        let mut execution = self.store.get_workflow_execution(workflow_id).await?.ok_or(ValidationError::ExecutionNotFound(workflow_id))?;

        if !passed {
            self.agents.forward_feedback(result_agent_id, feedback).await?;
            self.agents.terminate_agent(validator_agent_id).await?;
            return Ok(false);
        }

        execution.result_found = true;
        execution.updated_at = chrono::Utc::now();

        let should_stop = matches!(on_result_found, OnResultFound::StopAll);
        if should_stop {
            execution.status = WorkflowExecutionStatus::Completed;
            execution.completed_by_result = true;

            for task in self.store.list_queued_tasks_by_priority().await? {
                if task.workflow_id == workflow_id {
                    let mut t = task;
                    t.status = TaskStatus::Failed;
                    t.failure_reason = Some("Workflow completed by result".into());
                    self.store.upsert_task(&t).await?;
                }
            }
            for agent in self.store.list_active_agents().await? {
                if agent.status != AgentStatus::Terminated {
                    self.agents.terminate_agent(agent.id).await?;
                }
            }
        }

        self.store.upsert_workflow_execution(&execution).await?;
        self.agents.terminate_agent(validator_agent_id).await?;
        info!(%workflow_id, stop_all = should_stop, "workflow result validated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_default_has_no_follow_ups() {
        let outcome = TaskValidationOutcome::default();
        assert!(outcome.recommended_follow_ups.is_empty());
        assert!(!outcome.passed);
    }
}
