//! Request/response DTOs for the HTTP API surface, shared between the
//! API layer and any thin client (e.g. the CLI).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskBody {
    pub task_description: String,
    pub done_definition: String,
    pub ai_agent_id: Option<Uuid>,
    pub workflow_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub phase_id: Option<Uuid>,
    pub order: Option<i64>,
    pub working_directory: Option<String>,
    #[serde(default)]
    pub is_root_caller: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusBody {
    pub task_id: Uuid,
    pub status: String,
    pub summary: String,
    #[serde(default)]
    pub key_learnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMemoryBody {
    pub ai_agent_id: Uuid,
    pub memory_content: String,
    pub memory_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResultsBody {
    pub task_id: Uuid,
    pub markdown_file_path: String,
    pub result_type: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultBody {
    pub workflow_id: Uuid,
    pub markdown_file_path: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiveValidationReviewBody {
    pub task_id: Uuid,
    pub validator_agent_id: Uuid,
    pub validation_passed: bool,
    pub feedback: String,
    /// Follow-up task descriptions the validator recommends creating once
    /// this task is marked done.
    #[serde(default)]
    pub recommended_follow_ups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultValidationBody {
    pub result_id: Uuid,
    pub validation_passed: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastMessageBody {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageBody {
    pub recipient_agent_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketBody {
    pub workflow_id: Uuid,
    pub title: String,
    pub description: String,
    pub ticket_type: String,
    pub priority: String,
    #[serde(default)]
    pub parent_ticket_id: Option<Uuid>,
    #[serde(default)]
    pub blocked_by_ticket_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTicketStatusBody {
    pub ticket_id: Uuid,
    pub new_status: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentTicketBody {
    pub ticket_id: Uuid,
    pub comment_text: String,
    #[serde(default)]
    pub author_agent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveTicketBody {
    pub ticket_id: Uuid,
    pub resolution_comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCommitBody {
    pub ticket_id: Uuid,
    pub commit_sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTicketsBody {
    pub workflow_id: Uuid,
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestClarificationBody {
    pub ticket_id: Uuid,
    pub conflict_description: String,
    #[serde(default)]
    pub potential_solutions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectTicketBody {
    pub ticket_id: Uuid,
    pub rejection_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketIdBody {
    pub ticket_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdBody {
    pub task_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateAgentBody {
    pub agent_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusResponse {
    pub max_concurrent_agents: u32,
    pub active_phase_agents: u32,
    pub queued_task_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowDefinitionBody {
    pub id: String,
    pub name: String,
    pub description: String,
    pub phases_config: Vec<serde_json::Value>,
    pub workflow_config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkflowExecutionBody {
    pub definition_id: String,
    pub description: String,
    pub working_directory: String,
    #[serde(default)]
    pub launch_params: std::collections::HashMap<String, String>,
}
