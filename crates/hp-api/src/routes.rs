//! HTTP route handlers for the daemon's API surface.
//!
//! Every handler below (other than `/health`, `/sse`, and `/ws`, which are
//! wired in [`crate::sse`] and [`crate::ws`]) requires the caller to carry
//! an `X-Agent-ID` header, extracted via [`crate::agent_id::AgentId`].

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use hp_api_types::*;
use hp_core::types::{Memory, TaskPriority, TaskStatus, Ticket};

use crate::agent_id::AgentId;
use crate::api_error::ApiError;
use crate::protocol::BroadcastEvent;
use crate::state::ApiState;

/// Build the complete router: authenticated domain routes plus the
/// no-auth `/health`, `/sse`, and `/ws` endpoints, with rate limiting
/// and (optionally) API-key auth layered over the whole thing.
pub fn full_router(
    state: ApiState,
    api_key: Option<String>,
    rate_limiter: std::sync::Arc<hp_harness::rate_limiter::MultiKeyRateLimiter>,
) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/sse", get(crate::sse::sse_handler))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(state.clone());

    let authenticated = router(state).layer(crate::auth::AuthLayer::new(api_key));

    authenticated
        .merge(public)
        .layer(crate::rate_limit_middleware::RateLimitLayer::new(rate_limiter))
        .layer(axum::middleware::from_fn(hp_telemetry::middleware::metrics_middleware))
        .layer(axum::middleware::from_fn(
            hp_telemetry::tracing_setup::request_id_middleware,
        ))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn router(state: ApiState) -> Router {
    Router::new()
        .route("/create_task", post(create_task))
        .route("/update_task_status", post(update_task_status))
        .route("/save_memory", post(save_memory))
        .route("/report_results", post(report_results))
        .route("/submit_result", post(submit_result))
        .route("/give_validation_review", post(give_validation_review))
        .route("/submit_result_validation", post(submit_result_validation))
        .route("/api/broadcast_message", post(broadcast_message))
        .route("/api/send_message", post(send_message))
        .route("/api/tickets", post(create_ticket).get(list_tickets))
        .route("/api/tickets/change-status", post(change_ticket_status))
        .route("/api/tickets/comment", post(comment_ticket))
        .route("/api/tickets/resolve", post(resolve_ticket))
        .route("/api/tickets/link-commit", post(link_commit))
        .route("/api/tickets/search", post(search_tickets))
        .route("/api/tickets/request-clarification", post(request_clarification))
        .route("/api/tickets/approve", post(approve_ticket))
        .route("/api/tickets/reject", post(reject_ticket))
        .route("/api/workflow-definitions", post(create_workflow_definition))
        .route("/api/workflow-executions", post(start_workflow_execution))
        .route("/api/terminate_agent", post(terminate_agent))
        .route("/api/bump_task_priority", post(bump_task_priority))
        .route("/api/cancel_queued_task", post(cancel_queued_task))
        .route("/api/restart_task", post(restart_task))
        .route("/api/queue_status", get(queue_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn create_task(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<CreateTaskBody>,
) -> Result<impl IntoResponse, ApiError> {
    let req = hp_queue::task_service::CreateTaskRequest {
        workflow_id: body.workflow_id,
        raw_description: body.task_description,
        done_definition: body.done_definition,
        ticket_id: body.ticket_id,
        phase_id: body.phase_id,
        order: body.order,
        working_directory: body.working_directory,
        created_by_agent_id: Some(agent_id),
        is_root_caller: body.is_root_caller,
    };

    let outcome = state
        .tasks
        .create_task(req)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    use hp_queue::task_service::CreateTaskOutcome;
    let response = match outcome {
        CreateTaskOutcome::Blocked(task) => {
            return Err(ApiError::Blocked(format!(
                "task {} is blocked by an open ticket",
                task.id
            )));
        }
        CreateTaskOutcome::Duplicated(task) => {
            serde_json::json!({ "task_id": task.id, "status": "duplicated" })
        }
        CreateTaskOutcome::Queued(task) => {
            state.events.publish(BroadcastEvent::TaskQueued { task_id: task.id });
            serde_json::json!({ "task_id": task.id, "status": "queued" })
        }
        CreateTaskOutcome::ReadyToSpawn { task, phase, working_directory } => {
            state.events.publish(BroadcastEvent::TaskCreated {
                task_id: task.id,
                workflow_id: task.workflow_id,
            });
            let cli_overrides = phase
                .as_ref()
                .map(|p| p.cli_overrides.clone())
                .unwrap_or_default();
            let agent = state
                .agents
                .spawn_phase_agent(&task, phase.as_ref(), &cli_overrides, None, working_directory.as_deref())
                .await
                .map_err(|e| ApiError::InternalError(e.to_string()))?;
            serde_json::json!({ "task_id": task.id, "status": "spawned", "agent_id": agent.id })
        }
    };

    Ok(Json(response))
}

async fn update_task_status(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<UpdateTaskStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut task = state
        .store
        .get_task(body.task_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("task {} not found", body.task_id)))?;

    task.status = parse_task_status(&body.status)?;
    task.completion_notes = Some(if body.key_learnings.is_empty() {
        body.summary
    } else {
        format!("{}\n\nKey learnings:\n- {}", body.summary, body.key_learnings.join("\n- "))
    });
    if matches!(task.status, TaskStatus::Done | TaskStatus::Failed) {
        task.completed_at = Some(chrono::Utc::now());
    }
    task.updated_at = chrono::Utc::now();

    state
        .store
        .upsert_task(&task)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let status_str = task_status_str(&task.status);
    state.events.publish(BroadcastEvent::TaskCompleted {
        task_id: task.id,
        status: status_str.clone(),
    });

    Ok(Json(serde_json::json!({ "task_id": task.id, "status": status_str })))
}

fn parse_task_status(raw: &str) -> Result<TaskStatus, ApiError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("unknown task status: {raw}")))
}

fn task_status_str(status: &TaskStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn ticket_error(err: hp_tickets::ticket_service::TicketServiceError) -> ApiError {
    use hp_tickets::ticket_service::TicketServiceError;
    match err {
        TicketServiceError::TicketNotFound(id) => ApiError::NotFound(format!("ticket {id} not found")),
        TicketServiceError::BoardNotFound(id) => ApiError::NotFound(format!("board config for workflow {id} not found")),
        TicketServiceError::Blocked(ids) => ApiError::Blocked(format!("blocked by tickets {ids:?}")),
        TicketServiceError::PendingReview => ApiError::Forbidden("ticket is pending human review".to_string()),
        other => ApiError::InternalError(other.to_string()),
    }
}

async fn save_memory(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<SaveMemoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    let memory_type = serde_json::from_value(serde_json::Value::String(body.memory_type.clone()))
        .map_err(|_| ApiError::BadRequest(format!("unknown memory type: {}", body.memory_type)))?;

    let memory = Memory {
        id: Uuid::new_v4(),
        agent_id: body.ai_agent_id,
        content: body.memory_content,
        memory_type,
        embedding_id: None,
        tags: body.tags,
        related_files: body.related_files,
        created_at: chrono::Utc::now(),
    };

    state
        .store
        .insert_memory(&memory)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(serde_json::json!({ "memory_id": memory.id, "saved": true })))
}

async fn report_results(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<ReportResultsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let result = hp_core::types::AgentResult {
        id: Uuid::new_v4(),
        task_id: body.task_id,
        agent_id,
        markdown_file_path: body.markdown_file_path,
        result_type: body.result_type,
        summary: body.summary,
        extra_files: Vec::new(),
        validation_status: hp_core::types::ResultValidationStatus::Pending,
        validation_feedback: None,
        created_at: chrono::Utc::now(),
    };

    state
        .store
        .insert_agent_result(&result)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    state.events.publish(BroadcastEvent::ResultSubmitted {
        task_id: Some(body.task_id),
        result_id: result.id,
    });
    Ok(Json(serde_json::json!({ "result_id": result.id })))
}

async fn submit_result(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<SubmitResultBody>,
) -> Result<impl IntoResponse, ApiError> {
    let result = hp_core::types::WorkflowResult {
        id: Uuid::new_v4(),
        workflow_id: body.workflow_id,
        agent_id,
        markdown_file_path: body.markdown_file_path,
        explanation: body.explanation,
        validation_status: hp_core::types::ResultValidationStatus::Pending,
        validation_feedback: None,
        created_at: chrono::Utc::now(),
    };

    state
        .store
        .insert_workflow_result(&result)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    state.events.publish(BroadcastEvent::ResultSubmitted {
        task_id: None,
        result_id: result.id,
    });
    Ok(Json(serde_json::json!({ "result_id": result.id })))
}

async fn give_validation_review(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<GiveValidationReviewBody>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .store
        .get_task(body.task_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("task {} not found", body.task_id)))?;
    let original_agent_id = task
        .assigned_agent_id
        .ok_or_else(|| ApiError::Conflict(format!("task {} has no assigned agent", task.id)))?;

    let outcome = state
        .validation
        .submit_task_review(
            body.task_id,
            body.validator_agent_id,
            original_agent_id,
            body.validation_passed,
            &body.feedback,
            body.recommended_follow_ups.clone(),
        )
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut follow_up_task_ids = Vec::new();
    for description in &outcome.recommended_follow_ups {
        let req = hp_queue::task_service::CreateTaskRequest {
            workflow_id: task.workflow_id,
            raw_description: description.clone(),
            done_definition: description.clone(),
            ticket_id: task.ticket_id,
            phase_id: None,
            order: None,
            working_directory: None,
            created_by_agent_id: Some(body.validator_agent_id),
            is_root_caller: true,
        };
        let follow_up = state
            .tasks
            .create_task(req)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        use hp_queue::task_service::CreateTaskOutcome;
        match follow_up {
            CreateTaskOutcome::Blocked(t) | CreateTaskOutcome::Duplicated(t) => {
                follow_up_task_ids.push(t.id);
            }
            CreateTaskOutcome::Queued(t) => {
                state.events.publish(BroadcastEvent::TaskQueued { task_id: t.id });
                follow_up_task_ids.push(t.id);
            }
            CreateTaskOutcome::ReadyToSpawn { task: t, phase, working_directory } => {
                state.events.publish(BroadcastEvent::TaskCreated { task_id: t.id, workflow_id: t.workflow_id });
                let cli_overrides = phase.as_ref().map(|p| p.cli_overrides.clone()).unwrap_or_default();
                state
                    .agents
                    .spawn_phase_agent(&t, phase.as_ref(), &cli_overrides, None, working_directory.as_deref())
                    .await
                    .map_err(|e| ApiError::InternalError(e.to_string()))?;
                follow_up_task_ids.push(t.id);
            }
        }
    }

    let event = if body.validation_passed {
        BroadcastEvent::ValidationPassed { task_id: body.task_id }
    } else {
        BroadcastEvent::ValidationFailed {
            task_id: body.task_id,
            feedback: body.feedback,
        }
    };
    state.events.publish(event);

    Ok(Json(serde_json::json!({ "recorded": true, "follow_up_task_ids": follow_up_task_ids })))
}

async fn submit_result_validation(
    State(state): State<ApiState>,
    AgentId(validator_agent_id): AgentId,
    Json(body): Json<SubmitResultValidationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .store
        .get_workflow_result(body.result_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("workflow result {} not found", body.result_id)))?;

    let execution = state
        .store
        .get_workflow_execution(result.workflow_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("workflow execution {} not found", result.workflow_id)))?;
    let definition = state
        .store
        .get_workflow_definition(&execution.definition_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("workflow definition {} not found", execution.definition_id)))?;

    state
        .validation
        .submit_result_review(
            result.workflow_id,
            result.agent_id,
            validator_agent_id,
            body.validation_passed,
            &body.feedback,
            definition.workflow_config.on_result_found,
        )
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.events.publish(BroadcastEvent::ResultValidationCompleted {
        result_id: body.result_id,
        passed: body.validation_passed,
    });

    Ok(Json(serde_json::json!({ "recorded": true })))
}

// ---------------------------------------------------------------------------
// Agent messaging
// ---------------------------------------------------------------------------

async fn broadcast_message(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<BroadcastMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .agents
        .broadcast_message(agent_id, &body.message)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    state.events.publish(BroadcastEvent::AgentBroadcast {
        sender_agent_id: agent_id,
        message: body.message,
    });
    Ok(Json(serde_json::json!({ "sent": true })))
}

async fn send_message(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .agents
        .send_message(agent_id, body.recipient_agent_id, &body.message)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    state.events.publish(BroadcastEvent::AgentDirectMessage {
        sender_agent_id: agent_id,
        recipient_agent_id: body.recipient_agent_id,
        message: body.message,
    });
    Ok(Json(serde_json::json!({ "sent": true })))
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

async fn create_ticket(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<CreateTicketBody>,
) -> Result<impl IntoResponse, ApiError> {
    let priority = parse_priority(&body.priority)?;
    let mut ticket = Ticket::new(body.workflow_id, body.title, body.description, body.ticket_type, priority, "open", false);
    ticket.parent_ticket_id = body.parent_ticket_id;
    ticket.blocked_by_ticket_ids = body.blocked_by_ticket_ids;
    ticket.created_by_agent_id = Some(agent_id);

    let ticket = state
        .tickets
        .create_ticket(ticket)
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketCreated {
        ticket_id: ticket.id,
        workflow_id: ticket.workflow_id,
    });

    Ok(Json(serde_json::json!({ "ticket_id": ticket.id })))
}

fn parse_priority(raw: &str) -> Result<TaskPriority, ApiError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("unknown priority: {raw}")))
}

#[derive(Debug, Deserialize)]
struct ListTicketsQuery {
    workflow_id: Uuid,
    #[serde(default = "default_ticket_status")]
    status: String,
}

fn default_ticket_status() -> String {
    "open".to_string()
}

async fn list_tickets(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Query(query): Query<ListTicketsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = state
        .store
        .list_tickets_by_status(query.workflow_id, &query.status)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(tickets))
}

async fn change_ticket_status(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<ChangeTicketStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .tickets
        .transition_status(body.ticket_id, &body.new_status, None)
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketStatusChanged {
        ticket_id: outcome.ticket.id,
        new_status: outcome.ticket.status.clone(),
    });

    Ok(Json(serde_json::json!({ "ticket_id": outcome.ticket.id, "status": outcome.ticket.status })))
}

async fn comment_ticket(
    State(state): State<ApiState>,
    AgentId(agent_id): AgentId,
    Json(body): Json<CommentTicketBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .store
        .get_ticket(body.ticket_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("ticket {} not found", body.ticket_id)))?;

    state.events.publish(BroadcastEvent::TicketCommentAdded { ticket_id: ticket.id });
    let _ = (agent_id, body.author_agent_id, body.comment_text);

    Ok(Json(serde_json::json!({ "ticket_id": ticket.id })))
}

async fn resolve_ticket(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<ResolveTicketBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .tickets
        .transition_status(body.ticket_id, "resolved", None)
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketResolved { ticket_id: outcome.ticket.id });
    let _ = body.resolution_comment;

    Ok(Json(serde_json::json!({ "ticket_id": outcome.ticket.id })))
}

async fn link_commit(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<LinkCommitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .tickets
        .transition_status(body.ticket_id, "resolved", Some(body.commit_sha.clone()))
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketCommitLinked {
        ticket_id: outcome.ticket.id,
        commit_sha: body.commit_sha,
    });

    Ok(Json(serde_json::json!({ "ticket_id": outcome.ticket.id })))
}

async fn search_tickets(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<SearchTicketsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let hits = state
        .tickets
        .hybrid_search(body.workflow_id, &body.query, body.limit)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(serde_json::json!(hits
        .into_iter()
        .map(|h| serde_json::json!({
            "ticket_id": h.ticket.id,
            "title": h.ticket.title,
            "relevance_score": h.relevance_score,
            "matched_in": h.matched_in,
            "preview": h.preview,
        }))
        .collect::<Vec<_>>())))
}

async fn request_clarification(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<RequestClarificationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let resolution = state
        .tickets
        .resolve_clarification(body.ticket_id, &body.conflict_description, &body.potential_solutions)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    state.events.publish(BroadcastEvent::TicketClarificationRequested { ticket_id: body.ticket_id });

    Ok(Json(serde_json::json!({ "ticket_id": body.ticket_id, "resolution": resolution })))
}

async fn approve_ticket(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<TicketIdBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .tickets
        .set_approval_status(body.ticket_id, true)
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketApproved { ticket_id: ticket.id });

    Ok(Json(serde_json::json!({ "ticket_id": ticket.id })))
}

async fn reject_ticket(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<RejectTicketBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .tickets
        .set_approval_status(body.ticket_id, false)
        .await
        .map_err(ticket_error)?;

    state.events.publish(BroadcastEvent::TicketRejected {
        ticket_id: ticket.id,
        reason: body.rejection_reason,
    });

    Ok(Json(serde_json::json!({ "ticket_id": ticket.id })))
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

async fn create_workflow_definition(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<CreateWorkflowDefinitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let phases_config = body
        .phases_config
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;
    let workflow_config = serde_json::from_value(body.workflow_config)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    let definition = state
        .phase_engine
        .register_definition(body.id, body.name, body.description, phases_config, workflow_config)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(definition))
}

async fn start_workflow_execution(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<StartWorkflowExecutionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let execution = state
        .phase_engine
        .start_execution(&body.definition_id, body.description, body.working_directory, body.launch_params)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(execution))
}

// ---------------------------------------------------------------------------
// Agent / queue administration
// ---------------------------------------------------------------------------

async fn terminate_agent(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<TerminateAgentBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .agents
        .terminate_agent(body.agent_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    state.events.publish(BroadcastEvent::AgentTerminatedManually { agent_id: body.agent_id });

    Ok(Json(serde_json::json!({ "agent_id": body.agent_id, "terminated": true })))
}

async fn bump_task_priority(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<TaskIdBody>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .queue
        .bump(body.task_id)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(serde_json::json!({ "task_id": task.id, "priority_boosted": task.priority_boosted })))
}

async fn cancel_queued_task(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<TaskIdBody>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .queue
        .cancel(body.task_id)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.events.publish(BroadcastEvent::TaskCancelled {
        task_id: task.id,
        reason: "Cancelled by user from queue".to_string(),
    });

    Ok(Json(serde_json::json!({ "task_id": task.id, "status": task_status_str(&task.status) })))
}

async fn restart_task(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
    Json(body): Json<TaskIdBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .tasks
        .restart_task(body.task_id)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    use hp_queue::task_service::CreateTaskOutcome;
    let task_id = match &outcome {
        CreateTaskOutcome::Blocked(t)
        | CreateTaskOutcome::Duplicated(t)
        | CreateTaskOutcome::Queued(t) => t.id,
        CreateTaskOutcome::ReadyToSpawn { task, .. } => task.id,
    };

    state.events.publish(BroadcastEvent::TaskRestarted { task_id });

    Ok(Json(serde_json::json!({ "task_id": task_id })))
}

async fn queue_status(
    State(state): State<ApiState>,
    AgentId(_agent_id): AgentId,
) -> Result<impl IntoResponse, ApiError> {
    let queued = state
        .queue
        .list_queued()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let active_phase_agents = state
        .queue
        .active_agent_count()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(QueueStatusResponse {
        max_concurrent_agents: state.queue.max_concurrent_agents(),
        active_phase_agents,
        queued_task_ids: queued.into_iter().map(|t| t.id).collect(),
    }))
}

