//! Broadcast event shapes fanned out to SSE/WebSocket clients:
//! `{type, ...payload}`, one variant per event name.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    TaskCreated { task_id: Uuid, workflow_id: Uuid },
    TaskQueued { task_id: Uuid },
    TaskDequeued { task_id: Uuid },
    TaskBlocked { task_id: Uuid, ticket_id: Option<Uuid> },
    TaskCompleted { task_id: Uuid, status: String },
    TaskCancelled { task_id: Uuid, reason: String },
    TaskRestarted { task_id: Uuid },
    AgentBroadcast { sender_agent_id: Uuid, message: String },
    AgentDirectMessage { sender_agent_id: Uuid, recipient_agent_id: Uuid, message: String },
    AgentTerminatedManually { agent_id: Uuid },
    ValidationStarted { task_id: Uuid },
    ValidationPassed { task_id: Uuid },
    ValidationFailed { task_id: Uuid, feedback: String },
    ResultSubmitted { task_id: Option<Uuid>, result_id: Uuid },
    ResultValidationCompleted { result_id: Uuid, passed: bool },
    TicketCreated { ticket_id: Uuid, workflow_id: Uuid },
    TicketUpdated { ticket_id: Uuid },
    TicketStatusChanged { ticket_id: Uuid, new_status: String },
    TicketCommentAdded { ticket_id: Uuid },
    TicketApproved { ticket_id: Uuid },
    TicketRejected { ticket_id: Uuid, reason: String },
    TicketClarificationRequested { ticket_id: Uuid },
    TicketResolved { ticket_id: Uuid },
    CommitLinked { ticket_id: Uuid, commit_sha: String },
    TicketCommitLinked { ticket_id: Uuid, commit_sha: String },
}
