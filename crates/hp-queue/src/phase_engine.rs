//! PhaseEngine: workflow-definition registry, per-execution phase
//! materialization, and phase resolution for incoming tasks.

use std::sync::Arc;

use hp_core::store::Store;
use hp_core::types::{
    substitute_placeholders, Phase, PhaseExecution, PhaseExecutionStatus, PhaseTemplate, WorkflowConfig,
    WorkflowDefinition, WorkflowExecution, WorkflowExecutionStatus,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PhaseEngineError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("invalid workflow config: {0}")]
    InvalidConfig(String),
    #[error("workflow definition {0} not found")]
    DefinitionNotFound(String),
    #[error("workflow execution {0} not found")]
    ExecutionNotFound(Uuid),
    #[error("no phase could be resolved for the request")]
    NoPhaseResolved,
}

pub type Result<T> = std::result::Result<T, PhaseEngineError>;

/// Input for resolving the phase of an incoming task, mirroring the
/// 4-step priority rule `resolve_phase` applies.
#[derive(Debug, Clone, Default)]
pub struct PhaseResolutionRequest {
    pub workflow_id: Uuid,
    pub phase_id: Option<Uuid>,
    pub order: Option<i64>,
    pub requesting_agent_current_task_phase_id: Option<Uuid>,
}

pub struct PhaseEngine {
    store: Arc<Store>,
}

impl PhaseEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Idempotent-by-id: re-registering with the same id updates the
    /// definition's textual fields in place.
    pub async fn register_definition(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        phases_config: Vec<PhaseTemplate>,
        workflow_config: WorkflowConfig,
    ) -> Result<WorkflowDefinition> {
        workflow_config.validate().map_err(PhaseEngineError::InvalidConfig)?;

        let id = id.into();
        let now = chrono::Utc::now();
        let definition = match self.store.get_workflow_definition(&id).await? {
            Some(mut existing) => {
                existing.name = name.into();
                existing.description = description.into();
                existing.phases_config = phases_config;
                existing.workflow_config = workflow_config;
                existing.updated_at = now;
                existing
            }
            None => WorkflowDefinition {
                id,
                name: name.into(),
                description: description.into(),
                phases_config,
                workflow_config,
                created_at: now,
                updated_at: now,
            },
        };
        self.store.upsert_workflow_definition(&definition).await?;
        Ok(definition)
    }

    /// Create a `WorkflowExecution` and materialize one `Phase` plus one
    /// `pending` `PhaseExecution` per entry of `phases_config`, substituting
    /// `{key}` placeholders from `launch_params`.
    pub async fn start_execution(
        &self,
        definition_id: &str,
        description: impl Into<String>,
        working_directory: impl Into<String>,
        launch_params: HashMap<String, String>,
    ) -> Result<WorkflowExecution> {
        let definition = self
            .store
            .get_workflow_definition(definition_id)
            .await?
            .ok_or_else(|| PhaseEngineError::DefinitionNotFound(definition_id.to_string()))?;

        let execution = WorkflowExecution::new(definition_id, description, working_directory, launch_params.clone());
        self.store.upsert_workflow_execution(&execution).await?;

        let mut ordered = definition.phases_config.clone();
        ordered.sort_by_key(|p| p.order);

        for (idx, template) in ordered.iter().enumerate() {
            let phase = Phase {
                id: Uuid::new_v4(),
                workflow_id: execution.id,
                order: template.order,
                name: substitute_placeholders(&template.name, &launch_params),
                description: substitute_placeholders(&template.description, &launch_params),
                done_definitions: template.done_definitions.iter().map(|d| substitute_placeholders(d, &launch_params)).collect(),
                additional_notes: substitute_placeholders(&template.additional_notes, &launch_params),
                outputs: template.outputs.iter().map(|o| substitute_placeholders(o, &launch_params)).collect(),
                next_steps: template.next_steps.iter().map(|s| substitute_placeholders(s, &launch_params)).collect(),
                working_directory: template.working_directory.as_ref().map(|d| substitute_placeholders(d, &launch_params)),
                validation: template.validation.clone(),
                cli_overrides: template.cli_overrides.clone(),
                execution_status: if idx == 0 { PhaseExecutionStatus::InProgress } else { PhaseExecutionStatus::Pending },
                created_at: chrono::Utc::now(),
            };
            self.store.insert_phase(&phase).await?;

            let phase_execution = PhaseExecution {
                id: Uuid::new_v4(),
                phase_id: phase.id,
                workflow_id: execution.id,
                order: phase.order,
                status: phase.execution_status,
                created_at: chrono::Utc::now(),
                started_at: if idx == 0 { Some(chrono::Utc::now()) } else { None },
                completed_at: None,
            };
            self.store.insert_phase_execution(&phase_execution).await?;
        }

        info!(workflow_id = %execution.id, definition_id, "workflow execution started");
        Ok(execution)
    }

    /// Resolve the phase for an incoming task per a 4-step priority rule.
    /// Requests carrying `workflow_id` always take precedence over any
    /// implicit "current workflow" state — there is no such singleton
    /// here by construction.
    pub async fn resolve_phase(&self, req: &PhaseResolutionRequest) -> Result<Option<Phase>> {
        if let Some(phase_id) = req.phase_id {
            let phases = self.store.list_phases_for_workflow(req.workflow_id).await?;
            return Ok(phases.into_iter().find(|p| p.id == phase_id));
        }
        if let Some(order) = req.order {
            if order > 0 {
                return Ok(self.store.get_phase_by_workflow_and_order(req.workflow_id, order).await?);
            }
        }
        if let Some(current_phase_id) = req.requesting_agent_current_task_phase_id {
            let phases = self.store.list_phases_for_workflow(req.workflow_id).await?;
            if let Some(phase) = phases.into_iter().find(|p| p.id == current_phase_id) {
                return Ok(Some(phase));
            }
        }
        Ok(self.store.lowest_pending_phase(req.workflow_id).await?)
    }

    /// Declare a phase complete: no task in it is incomplete and at least
    /// one completed. Transitions the next `pending` phase to `in_progress`.
    pub async fn maybe_complete_phase(&self, phase: &Phase) -> Result<bool> {
        let tasks = self.store.list_tasks_by_phase(phase.id).await?;
        if tasks.is_empty() {
            return Ok(false);
        }
        let any_completed = tasks.iter().any(|t| matches!(t.status, hp_core::types::TaskStatus::Done));
        let none_incomplete = tasks.iter().all(|t| {
            !matches!(
                t.status,
                hp_core::types::TaskStatus::Pending
                    | hp_core::types::TaskStatus::Queued
                    | hp_core::types::TaskStatus::Blocked
                    | hp_core::types::TaskStatus::Assigned
                    | hp_core::types::TaskStatus::InProgress
                    | hp_core::types::TaskStatus::UnderReview
                    | hp_core::types::TaskStatus::ValidationInProgress
                    | hp_core::types::TaskStatus::NeedsWork
            )
        });
        if !(any_completed && none_incomplete) {
            return Ok(false);
        }

        self.store.update_phase_status(phase.id, PhaseExecutionStatus::Completed).await?;

        if let Some(next) = self.store.lowest_pending_phase(phase.workflow_id).await? {
            self.store.update_phase_status(next.id, PhaseExecutionStatus::InProgress).await?;
        }
        info!(phase_id = %phase.id, "phase completed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::types::OnResultFound;

    fn sample_config() -> WorkflowConfig {
        WorkflowConfig { has_result: false, result_criteria: Vec::new(), on_result_found: OnResultFound::StopAll, enable_tickets: false, board_config: None }
    }

    #[tokio::test]
    async fn registering_twice_updates_in_place() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let engine = PhaseEngine::new(store);
        let templates = vec![PhaseTemplate {
            order: 1,
            name: "Build".into(),
            description: "build it".into(),
            done_definitions: vec![],
            additional_notes: String::new(),
            outputs: vec![],
            next_steps: vec![],
            working_directory: None,
            validation: None,
            cli_overrides: Default::default(),
        }];
        engine.register_definition("wf-1", "First", "desc", templates.clone(), sample_config()).await.unwrap();
        let updated = engine.register_definition("wf-1", "Renamed", "desc2", templates, sample_config()).await.unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn has_result_without_criteria_is_rejected() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let engine = PhaseEngine::new(store);
        let bad_config = WorkflowConfig { has_result: true, result_criteria: vec![], on_result_found: OnResultFound::StopAll, enable_tickets: false, board_config: None };
        let err = engine.register_definition("wf-2", "X", "Y", vec![], bad_config).await.unwrap_err();
        assert!(matches!(err, PhaseEngineError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn placeholder_substitution_fills_in_launch_params() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let engine = PhaseEngine::new(store.clone());
        let templates = vec![PhaseTemplate {
            order: 1,
            name: "Phase for {target}".into(),
            description: "work on {target}".into(),
            done_definitions: vec![],
            additional_notes: String::new(),
            outputs: vec![],
            next_steps: vec![],
            working_directory: None,
            validation: None,
            cli_overrides: Default::default(),
        }];
        engine.register_definition("wf-3", "W", "D", templates, sample_config()).await.unwrap();
        let mut params = HashMap::new();
        params.insert("target".to_string(), "auth-service".to_string());
        let execution = engine.start_execution("wf-3", "run", ".", params).await.unwrap();
        let phases = store.list_phases_for_workflow(execution.id).await.unwrap();
        assert_eq!(phases[0].name, "Phase for auth-service");
    }
}
