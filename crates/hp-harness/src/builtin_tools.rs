//! The initial-prompt tool contract every phase/validator agent is told it
//! has: `update_task_status`, `save_memory`, `create_task`, `get_tasks`,
//! `broadcast_message`, `send_message`, `submit_result`.
//!
//! Tool *definitions* (JSON Schema + MCP annotations) live here since they
//! are pure data; `hp-harness` sits below `hp-queue`/`hp-tickets`/`hp-agents`
//! in the dependency graph, so the actual business logic backing each tool
//! is reached through the [`ToolExecutor`] trait rather than a direct
//! dependency — the concrete impl lives in `hp-agents`, wired to
//! `TaskService`/`QueueService`/`AgentManager` at daemon startup. This keeps
//! dynamic dispatch over tool variants behind a tagged variant + registry
//! rather than a direct call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::mcp::{McpTool, ToolAnnotations, ToolCallRequest, ToolCallResult};

/// Server name used when registering built-in tools with an MCP tool
/// registry.
pub const BUILTIN_SERVER_NAME: &str = "hephaestus-tools";

/// Return the complete list of built-in MCP tool definitions handed to
/// every spawned agent.
pub fn builtin_tool_definitions() -> Vec<McpTool> {
    vec![
        update_task_status_tool(),
        save_memory_tool(),
        create_task_tool(),
        get_tasks_tool(),
        broadcast_message_tool(),
        send_message_tool(),
        submit_result_tool(),
    ]
}

fn update_task_status_tool() -> McpTool {
    McpTool {
        name: "update_task_status".to_string(),
        description: "Report a task as done or failed, with a summary and key learnings."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "task_id": { "type": "string", "format": "uuid" },
                "status": { "type": "string", "enum": ["done", "failed"] },
                "summary": { "type": "string" },
                "key_learnings": { "type": "string" }
            },
            "required": ["task_id", "status", "summary"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

fn save_memory_tool() -> McpTool {
    McpTool {
        name: "save_memory".to_string(),
        description: "Record a discovery, decision, or learning for future agents to retrieve."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "memory_content": { "type": "string" },
                "memory_type": {
                    "type": "string",
                    "enum": ["error_fix", "discovery", "decision", "learning", "warning", "codebase_knowledge"]
                },
                "tags": { "type": "array", "items": { "type": "string" } },
                "related_files": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["memory_content", "memory_type"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

fn create_task_tool() -> McpTool {
    McpTool {
        name: "create_task".to_string(),
        description: "Create a new task in the current workflow's admission queue."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "task_description": { "type": "string" },
                "done_definition": { "type": "string" },
                "workflow_id": { "type": "string", "format": "uuid" },
                "ticket_id": { "type": "string", "format": "uuid" },
                "priority": { "type": "string", "enum": ["low", "medium", "high"] }
            },
            "required": ["task_description", "done_definition", "workflow_id"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

fn get_tasks_tool() -> McpTool {
    McpTool {
        name: "get_tasks".to_string(),
        description: "List tasks in the current workflow, optionally filtered by phase."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "workflow_id": { "type": "string", "format": "uuid" },
                "phase_id": { "type": "string", "format": "uuid" }
            },
            "required": ["workflow_id"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(false),
        }),
    }
}

fn broadcast_message_tool() -> McpTool {
    McpTool {
        name: "broadcast_message".to_string(),
        description: "Send a message to every other non-terminated agent.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

fn send_message_tool() -> McpTool {
    McpTool {
        name: "send_message".to_string(),
        description: "Send a direct message to one other agent.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "recipient_agent_id": { "type": "string", "format": "uuid" },
                "message": { "type": "string" }
            },
            "required": ["recipient_agent_id", "message"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

fn submit_result_tool() -> McpTool {
    McpTool {
        name: "submit_result".to_string(),
        description: "Submit the workflow-level deliverable for result validation."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "markdown_file_path": { "type": "string" },
                "explanation": { "type": "string" }
            },
            "required": ["markdown_file_path", "explanation"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

// ---------------------------------------------------------------------------
// ToolExecutor — the seam implemented by `hp-agents` at daemon startup
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
    #[error("invalid parameter {0}: {1}")]
    InvalidParam(&'static str, String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusArgs {
    pub task_id: Uuid,
    pub status: String,
    pub summary: String,
    #[serde(default)]
    pub key_learnings: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMemoryArgs {
    pub memory_content: String,
    pub memory_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskArgs {
    pub task_description: String,
    pub done_definition: String,
    pub workflow_id: Uuid,
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultArgs {
    pub markdown_file_path: String,
    pub explanation: String,
}

/// Implemented by whatever owns `TaskService`/`QueueService`/`AgentManager`
/// (the daemon's wiring code in `hp-agents`/`hp-api`). Each method mirrors
/// one of the REST endpoints an agent can reach without going through HTTP.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn update_task_status(&self, caller_agent_id: Uuid, args: UpdateTaskStatusArgs) -> Result<serde_json::Value, ToolError>;
    async fn save_memory(&self, caller_agent_id: Uuid, args: SaveMemoryArgs) -> Result<serde_json::Value, ToolError>;
    async fn create_task(&self, caller_agent_id: Uuid, args: CreateTaskArgs) -> Result<serde_json::Value, ToolError>;
    async fn get_tasks(&self, workflow_id: Uuid, phase_id: Option<Uuid>) -> Result<serde_json::Value, ToolError>;
    async fn broadcast_message(&self, caller_agent_id: Uuid, message: String) -> Result<serde_json::Value, ToolError>;
    async fn send_message(&self, caller_agent_id: Uuid, recipient_agent_id: Uuid, message: String) -> Result<serde_json::Value, ToolError>;
    async fn submit_result(&self, caller_agent_id: Uuid, args: SubmitResultArgs) -> Result<serde_json::Value, ToolError>;
}

/// Dispatch a raw MCP tool call against a [`ToolExecutor`]. Returns `None`
/// if `request.name` is not one of the seven built-in tools.
pub async fn execute_builtin_tool(
    executor: &dyn ToolExecutor,
    caller_agent_id: Uuid,
    request: &ToolCallRequest,
) -> Option<ToolCallResult> {
    let result = match request.name.as_str() {
        "update_task_status" => Some(match parse_args(&request.arguments) {
            Ok(args) => dispatch(executor.update_task_status(caller_agent_id, args).await),
            Err(e) => e,
        }),
        "save_memory" => Some(match parse_args(&request.arguments) {
            Ok(args) => dispatch(executor.save_memory(caller_agent_id, args).await),
            Err(e) => e,
        }),
        "create_task" => Some(match parse_args(&request.arguments) {
            Ok(args) => dispatch(executor.create_task(caller_agent_id, args).await),
            Err(e) => e,
        }),
        "get_tasks" => Some(dispatch_get_tasks(executor, &request.arguments).await),
        "broadcast_message" => Some(dispatch_broadcast(executor, caller_agent_id, &request.arguments).await),
        "send_message" => Some(dispatch_send(executor, caller_agent_id, &request.arguments).await),
        "submit_result" => Some(match parse_args(&request.arguments) {
            Ok(args) => dispatch(executor.submit_result(caller_agent_id, args).await),
            Err(e) => e,
        }),
        _ => None,
    };
    if let Some(ref r) = result {
        info!(tool = %request.name, agent_id = %caller_agent_id, is_error = r.is_error, "executed built-in tool");
    }
    result
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &serde_json::Value) -> Result<T, ToolCallResult> {
    serde_json::from_value(args.clone())
        .map_err(|e| ToolCallResult::error(format!("invalid arguments: {e}")))
}

fn dispatch(result: Result<serde_json::Value, ToolError>) -> ToolCallResult {
    match result {
        Ok(v) => ToolCallResult::text(v.to_string()),
        Err(e) => ToolCallResult::error(e.to_string()),
    }
}

async fn dispatch_get_tasks(executor: &dyn ToolExecutor, args: &serde_json::Value) -> ToolCallResult {
    let Some(workflow_id) = args.get("workflow_id").and_then(|v| v.as_str()).and_then(|s| s.parse::<Uuid>().ok()) else {
        return ToolCallResult::error("missing or invalid required parameter: workflow_id");
    };
    let phase_id = args.get("phase_id").and_then(|v| v.as_str()).and_then(|s| s.parse::<Uuid>().ok());
    dispatch(executor.get_tasks(workflow_id, phase_id).await)
}

async fn dispatch_broadcast(executor: &dyn ToolExecutor, caller_agent_id: Uuid, args: &serde_json::Value) -> ToolCallResult {
    let Some(message) = args.get("message").and_then(|v| v.as_str()) else {
        return ToolCallResult::error("missing required parameter: message");
    };
    dispatch(executor.broadcast_message(caller_agent_id, message.to_string()).await)
}

async fn dispatch_send(executor: &dyn ToolExecutor, caller_agent_id: Uuid, args: &serde_json::Value) -> ToolCallResult {
    let Some(recipient) = args.get("recipient_agent_id").and_then(|v| v.as_str()).and_then(|s| s.parse::<Uuid>().ok()) else {
        return ToolCallResult::error("missing or invalid required parameter: recipient_agent_id");
    };
    let Some(message) = args.get("message").and_then(|v| v.as_str()) else {
        return ToolCallResult::error("missing required parameter: message");
    };
    dispatch(executor.send_message(caller_agent_id, recipient, message.to_string()).await)
}
