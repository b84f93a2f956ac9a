//! Wires `hp_harness::builtin_tools::ToolExecutor` to the daemon's own
//! services, so agent sessions that call a built-in MCP tool reach the same
//! `TaskService`/`Store`/`AgentManager` code path the HTTP API uses.

use async_trait::async_trait;
use hp_core::types::{CliOverrides, Memory, MemoryType, TaskStatus};
use hp_harness::builtin_tools::{
    CreateTaskArgs, SaveMemoryArgs, SubmitResultArgs, ToolError, UpdateTaskStatusArgs,
};
use hp_queue::task_service::CreateTaskRequest;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::Daemon;

#[async_trait]
impl hp_harness::builtin_tools::ToolExecutor for Daemon {
    async fn update_task_status(
        &self,
        caller_agent_id: Uuid,
        args: UpdateTaskStatusArgs,
    ) -> Result<serde_json::Value, ToolError> {
        let mut task = self
            .store
            .get_task(args.task_id)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?
            .ok_or_else(|| ToolError::NotFound(format!("task {}", args.task_id)))?;

        if let Some(ref learnings) = args.key_learnings {
            let memory = Memory {
                id: Uuid::new_v4(),
                agent_id: caller_agent_id,
                content: learnings.clone(),
                memory_type: MemoryType::Learning,
                embedding_id: None,
                tags: vec!["task_completion".to_string()],
                related_files: vec![],
                created_at: chrono::Utc::now(),
            };
            self.store
                .insert_memory(&memory)
                .await
                .map_err(|e| ToolError::Other(e.to_string()))?;
        }

        match args.status.as_str() {
            "done" if task.validation_enabled => {
                self.validation
                    .start_task_validation(task.id, caller_agent_id, &CliOverrides::default())
                    .await
                    .map_err(|e| ToolError::Other(e.to_string()))?;
            }
            "done" => {
                task.status = TaskStatus::Done;
                task.completion_notes = Some(args.summary.clone());
                task.completed_at = Some(chrono::Utc::now());
                task.updated_at = chrono::Utc::now();
                self.store
                    .upsert_task(&task)
                    .await
                    .map_err(|e| ToolError::Other(e.to_string()))?;
            }
            "failed" => {
                task.status = TaskStatus::Failed;
                task.failure_reason = Some(args.summary.clone());
                task.updated_at = chrono::Utc::now();
                self.store
                    .upsert_task(&task)
                    .await
                    .map_err(|e| ToolError::Other(e.to_string()))?;
            }
            other => return Err(ToolError::InvalidParam("status", other.to_string())),
        }

        Ok(json!({ "task_id": task.id, "status": args.status }))
    }

    async fn save_memory(
        &self,
        caller_agent_id: Uuid,
        args: SaveMemoryArgs,
    ) -> Result<serde_json::Value, ToolError> {
        let memory_type: MemoryType = serde_json::from_value(json!(args.memory_type))
            .map_err(|_| ToolError::InvalidParam("memory_type", args.memory_type.clone()))?;

        let memory = Memory {
            id: Uuid::new_v4(),
            agent_id: caller_agent_id,
            content: args.memory_content,
            memory_type,
            embedding_id: None,
            tags: args.tags,
            related_files: args.related_files,
            created_at: chrono::Utc::now(),
        };
        self.store
            .insert_memory(&memory)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;

        Ok(json!({ "memory_id": memory.id, "saved": true }))
    }

    async fn create_task(
        &self,
        caller_agent_id: Uuid,
        args: CreateTaskArgs,
    ) -> Result<serde_json::Value, ToolError> {
        let outcome = self
            .tasks
            .create_task(CreateTaskRequest {
                workflow_id: args.workflow_id,
                raw_description: args.task_description,
                done_definition: args.done_definition,
                ticket_id: args.ticket_id,
                phase_id: None,
                order: None,
                working_directory: None,
                created_by_agent_id: Some(caller_agent_id),
                is_root_caller: false,
            })
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;

        let task = match &outcome {
            hp_queue::task_service::CreateTaskOutcome::Blocked(t)
            | hp_queue::task_service::CreateTaskOutcome::Duplicated(t)
            | hp_queue::task_service::CreateTaskOutcome::Queued(t) => t,
            hp_queue::task_service::CreateTaskOutcome::ReadyToSpawn { task, .. } => task,
        };

        Ok(json!({ "task_id": task.id, "status": task.status }))
    }

    async fn get_tasks(
        &self,
        workflow_id: Uuid,
        phase_id: Option<Uuid>,
    ) -> Result<serde_json::Value, ToolError> {
        let tasks = self
            .store
            .list_tasks_by_workflow(workflow_id, phase_id)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;
        Ok(json!({ "tasks": tasks }))
    }

    async fn broadcast_message(
        &self,
        caller_agent_id: Uuid,
        message: String,
    ) -> Result<serde_json::Value, ToolError> {
        self.agents
            .broadcast_message(caller_agent_id, &message)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;
        Ok(json!({ "delivered": true }))
    }

    async fn send_message(
        &self,
        caller_agent_id: Uuid,
        recipient_agent_id: Uuid,
        message: String,
    ) -> Result<serde_json::Value, ToolError> {
        self.agents
            .send_message(caller_agent_id, recipient_agent_id, &message)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;
        Ok(json!({ "delivered": true }))
    }

    async fn submit_result(
        &self,
        caller_agent_id: Uuid,
        args: SubmitResultArgs,
    ) -> Result<serde_json::Value, ToolError> {
        let memory = Memory {
            id: Uuid::new_v4(),
            agent_id: caller_agent_id,
            content: args.explanation,
            memory_type: MemoryType::Discovery,
            embedding_id: None,
            tags: vec!["submit_result".to_string()],
            related_files: vec![args.markdown_file_path],
            created_at: chrono::Utc::now(),
        };
        self.store
            .insert_memory(&memory)
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;

        warn!(agent_id = %caller_agent_id, memory_id = %memory.id, "workflow result submitted, awaiting validator review");
        Ok(json!({ "result_id": memory.id }))
    }
}
