//! Core data model: workflows, phases, tasks, agents, worktrees, tickets and
//! their auxiliary entities. All entities persist in the [`crate::store::Store`]
//! and are exchanged across crate boundaries as plain serde types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// WorkflowDefinition / WorkflowExecution / Phase
// ---------------------------------------------------------------------------

/// A reusable template for a workflow. Registration is idempotent by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub phases_config: Vec<PhaseTemplate>,
    pub workflow_config: WorkflowConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of `WorkflowDefinition::phases_config`, prior to placeholder
/// substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTemplate {
    pub order: i64,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub done_definitions: Vec<String>,
    #[serde(default)]
    pub additional_notes: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub validation: Option<PhaseValidationConfig>,
    #[serde(default)]
    pub cli_overrides: CliOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseValidationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// Per-phase CLI overrides, propagated PhaseEngine -> TaskService ->
/// AgentManager without ever reaching back into a global config at spawn
/// time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliOverrides {
    pub cli_tool: Option<CliType>,
    pub cli_model: Option<String>,
    pub glm_api_token_env: Option<String>,
}

/// Feature flags and launch template for a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub has_result: bool,
    #[serde(default)]
    pub result_criteria: Vec<String>,
    #[serde(default = "default_on_result_found")]
    pub on_result_found: OnResultFound,
    #[serde(default)]
    pub enable_tickets: bool,
    #[serde(default)]
    pub board_config: Option<BoardConfig>,
}

impl WorkflowConfig {
    /// Validates the invariant that `has_result=true` requires a
    /// non-empty `result_criteria`.
    pub fn validate(&self) -> Result<(), String> {
        if self.has_result && self.result_criteria.is_empty() {
            return Err("workflow_config.result_criteria must be non-empty when has_result is true".into());
        }
        Ok(())
    }
}

fn default_on_result_found() -> OnResultFound {
    OnResultFound::StopAll
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnResultFound {
    StopAll,
    DoNothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowExecutionStatus {
    Active,
    Paused,
    Completed,
    Failed,
}

/// One run of a [`WorkflowDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub definition_id: String,
    pub description: String,
    pub working_directory: String,
    pub launch_params: HashMap<String, String>,
    pub status: WorkflowExecutionStatus,
    pub result_found: bool,
    pub result_id: Option<Uuid>,
    pub completed_by_result: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowExecution {
    pub fn new(
        definition_id: impl Into<String>,
        description: impl Into<String>,
        working_directory: impl Into<String>,
        launch_params: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            definition_id: definition_id.into(),
            description: description.into(),
            working_directory: working_directory.into(),
            launch_params,
            status: WorkflowExecutionStatus::Active,
            result_found: false,
            result_id: None,
            completed_by_result: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseExecutionStatus {
    Pending,
    InProgress,
    Completed,
}

/// A concrete phase instance belonging to one execution, after placeholder
/// substitution of `launch_params` into the definition's template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub order: i64,
    pub name: String,
    pub description: String,
    pub done_definitions: Vec<String>,
    pub additional_notes: String,
    pub outputs: Vec<String>,
    pub next_steps: Vec<String>,
    pub working_directory: Option<String>,
    pub validation: Option<PhaseValidationConfig>,
    pub cli_overrides: CliOverrides,
    pub execution_status: PhaseExecutionStatus,
    pub created_at: DateTime<Utc>,
}

/// Substitute `{key}` placeholders in `text` with `launch_params[key]`;
/// missing keys become the empty string.
pub fn substitute_placeholders(text: &str, launch_params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = text[i + 1..].find('}') {
                let key = &text[i + 1..i + 1 + end];
                let value = launch_params.get(key).cloned().unwrap_or_default();
                out.push_str(&value);
                i += end + 2;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

pub fn substitute_placeholders_list(items: &[String], launch_params: &HashMap<String, String>) -> Vec<String> {
    items.iter().map(|s| substitute_placeholders(s, launch_params)).collect()
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Queued,
    Blocked,
    Assigned,
    InProgress,
    UnderReview,
    ValidationInProgress,
    NeedsWork,
    Done,
    Failed,
    Duplicated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// Who is making a request against the API: ticket tracking is only
/// required for non-SDK (MCP) callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerKind {
    Sdk,
    Mcp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub raw_description: String,
    pub enriched_description: String,
    pub done_definition: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub priority_boosted: bool,
    pub assigned_agent_id: Option<Uuid>,
    pub created_by_agent_id: Option<Uuid>,
    pub parent_task_id: Option<Uuid>,
    pub phase_id: Option<Uuid>,
    pub workflow_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub validation_enabled: bool,
    pub validation_iteration: i64,
    pub last_validation_feedback: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub duplicate_of_task_id: Option<Uuid>,
    pub similarity_score: Option<f32>,
    pub queued_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub completion_notes: Option<String>,
    pub estimated_complexity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(workflow_id: Uuid, raw_description: impl Into<String>, done_definition: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            raw_description: raw_description.into(),
            enriched_description: String::new(),
            done_definition: done_definition.into(),
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            priority_boosted: false,
            assigned_agent_id: None,
            created_by_agent_id: None,
            parent_task_id: None,
            phase_id: None,
            workflow_id,
            ticket_id: None,
            validation_enabled: false,
            validation_iteration: 0,
            last_validation_feedback: None,
            embedding: None,
            duplicate_of_task_id: None,
            similarity_score: None,
            queued_at: None,
            completed_at: None,
            failure_reason: None,
            completion_notes: None,
            estimated_complexity: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restarting a done/failed task clears completion data (P9).
    pub fn reset_for_restart(&mut self) {
        self.completed_at = None;
        self.failure_reason = None;
        self.completion_notes = None;
        self.status = TaskStatus::Pending;
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    Stuck,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Phase,
    Validator,
    ResultValidator,
    Monitor,
    Diagnostic,
}

/// Tagged CLI-agent variant: a closed set of supported CLI tools dispatched
/// through a registry rather than dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliType {
    Claude,
    Codex,
    Gemini,
    Glm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub system_prompt: String,
    pub status: AgentStatus,
    pub cli_type: CliType,
    pub cli_model: Option<String>,
    pub tmux_session_name: String,
    pub current_task_id: Option<Uuid>,
    pub agent_type: AgentKind,
    pub kept_alive_for_validation: bool,
    pub last_activity: DateTime<Utc>,
    pub health_check_failures: i32,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(cli_type: CliType, tmux_session_name: impl Into<String>, agent_type: AgentKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            system_prompt: String::new(),
            status: AgentStatus::Idle,
            cli_type,
            cli_model: None,
            tmux_session_name: tmux_session_name.into(),
            current_task_id: None,
            agent_type,
            kept_alive_for_validation: false,
            last_activity: now,
            health_check_failures: 0,
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentWorktree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Active,
    Merged,
    Abandoned,
    Cleaned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWorktree {
    pub agent_id: Uuid,
    pub worktree_path: String,
    pub branch_name: String,
    pub parent_agent_id: Option<Uuid>,
    pub parent_commit_sha: Option<String>,
    pub base_commit_sha: String,
    pub merge_status: MergeStatus,
    pub merge_commit_sha: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit row for a single file's conflict resolution during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionChoice {
    Parent,
    Child,
    TieChild,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConflictResolution {
    pub id: Uuid,
    pub agent_id: String,
    pub file_path: String,
    pub parent_modified_at: DateTime<Utc>,
    pub child_modified_at: DateTime<Utc>,
    pub resolution_choice: ResolutionChoice,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    AutoApproved,
    PendingReview,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub title: String,
    pub description: String,
    pub ticket_type: String,
    pub priority: TaskPriority,
    pub status: String,
    pub approval_status: ApprovalStatus,
    pub parent_ticket_id: Option<Uuid>,
    pub blocked_by_ticket_ids: Vec<Uuid>,
    pub is_resolved: bool,
    pub created_by_agent_id: Option<Uuid>,
    pub assigned_agent_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        workflow_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        ticket_type: impl Into<String>,
        priority: TaskPriority,
        initial_status: impl Into<String>,
        human_review: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            title: title.into(),
            description: description.into(),
            ticket_type: ticket_type.into(),
            priority,
            status: initial_status.into(),
            approval_status: if human_review { ApprovalStatus::PendingReview } else { ApprovalStatus::AutoApproved },
            parent_ticket_id: None,
            blocked_by_ticket_ids: Vec::new(),
            is_resolved: false,
            created_by_agent_id: None,
            assigned_agent_id: None,
            tags: Vec::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a task naming this ticket may proceed.
    pub fn is_ready_for_task_creation(&self) -> bool {
        matches!(self.approval_status, ApprovalStatus::Approved | ApprovalStatus::AutoApproved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_agent_id: Option<Uuid>,
    pub comment_text: String,
    pub comment_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketHistory {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub change_type: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCommit {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub commit_sha: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub workflow_id: Uuid,
    pub columns: Vec<String>,
    pub allowed_types: Vec<String>,
    pub initial_status: String,
    pub ticket_human_review: bool,
    pub approval_timeout_seconds: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            workflow_id: Uuid::nil(),
            columns: vec!["backlog".into(), "in_progress".into(), "review".into(), "done".into()],
            allowed_types: vec!["feature".into(), "bug".into(), "chore".into()],
            initial_status: "backlog".into(),
            ticket_human_review: false,
            approval_timeout_seconds: 1800,
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ErrorFix,
    Discovery,
    Decision,
    Learning,
    Warning,
    CodebaseKnowledge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub content: String,
    pub memory_type: MemoryType,
    pub embedding_id: Option<String>,
    pub tags: Vec<String>,
    pub related_files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValidationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: Uuid,
    pub task_id: Uuid,
    pub agent_id: Uuid,
    pub markdown_file_path: String,
    pub result_type: String,
    pub summary: String,
    pub extra_files: Vec<String>,
    pub validation_status: ResultValidationStatus,
    pub validation_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub agent_id: Uuid,
    pub markdown_file_path: String,
    pub explanation: String,
    pub validation_status: ResultValidationStatus,
    pub validation_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Validation entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReview {
    pub id: Uuid,
    pub task_id: Uuid,
    pub validator_agent_id: Uuid,
    pub iteration: i64,
    pub passed: bool,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseExecution {
    pub id: Uuid,
    pub phase_id: Uuid,
    pub workflow_id: Uuid,
    pub order: i64,
    pub status: PhaseExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteeringIntervention {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub task_id: Uuid,
    pub reason: String,
    pub action_taken: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianAnalysis {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub verdict: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConductorAnalysis {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Agent log
// ---------------------------------------------------------------------------

/// Append-only per-agent log line, used for broadcast/send audit trails and
/// final-output capture on termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub line: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_fills_known_keys() {
        let mut params = HashMap::new();
        params.insert("name".to_string(), "world".to_string());
        assert_eq!(substitute_placeholders("hello {name}!", &params), "hello world!");
    }

    #[test]
    fn substitute_missing_key_becomes_empty() {
        let params = HashMap::new();
        assert_eq!(substitute_placeholders("hello {name}!", &params), "hello !");
    }

    #[test]
    fn workflow_config_requires_criteria_when_has_result() {
        let cfg = WorkflowConfig {
            has_result: true,
            result_criteria: vec![],
            on_result_found: OnResultFound::StopAll,
            enable_tickets: false,
            board_config: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn task_restart_clears_completion_data() {
        let mut task = Task::new(Uuid::new_v4(), "do it", "done when X");
        task.status = TaskStatus::Done;
        task.completed_at = Some(Utc::now());
        task.failure_reason = Some("oops".into());
        task.completion_notes = Some("notes".into());
        task.reset_for_restart();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
        assert!(task.failure_reason.is_none());
        assert!(task.completion_notes.is_none());
    }

    #[test]
    fn ticket_pending_review_not_ready() {
        let ticket = Ticket::new(Uuid::new_v4(), "t", "desc desc", "feature", TaskPriority::Medium, "backlog", true);
        assert_eq!(ticket.approval_status, ApprovalStatus::PendingReview);
        assert!(!ticket.is_ready_for_task_creation());
    }
}
