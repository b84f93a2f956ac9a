use uuid::Uuid;

use super::{api_client, error_message, friendly_error};

pub struct CreateOptions {
    pub description: String,
    pub done_definition: String,
    pub workflow_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub phase_id: Option<Uuid>,
    pub working_directory: Option<String>,
}

/// `task create`: submit a new task into a workflow.
pub async fn create(api_url: &str, agent_id: Uuid, opts: CreateOptions) -> anyhow::Result<()> {
    let client = api_client();
    let body = hp_api_types::CreateTaskBody {
        task_description: opts.description,
        done_definition: opts.done_definition,
        ai_agent_id: None,
        workflow_id: opts.workflow_id,
        ticket_id: opts.ticket_id,
        phase_id: opts.phase_id,
        order: None,
        working_directory: opts.working_directory,
        is_root_caller: true,
    };

    let resp = client
        .post(format!("{api_url}/create_task"))
        .header("X-Agent-ID", agent_id.to_string())
        .json(&body)
        .send()
        .await
        .map_err(friendly_error)?;

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.map_err(friendly_error)?;

    if !status.is_success() {
        anyhow::bail!("failed to create task: {} (HTTP {status})", error_message(&body));
    }

    println!("task created: {}", body["task_id"]);
    println!("  status: {}", body["status"].as_str().unwrap_or("?"));
    if let Some(spawned_agent) = body["agent_id"].as_str() {
        println!("  agent:  {spawned_agent}");
    }
    Ok(())
}

/// `task status`: mark a task's completion status and attach a summary.
pub async fn set_status(
    api_url: &str,
    agent_id: Uuid,
    task_id: Uuid,
    status: &str,
    summary: &str,
) -> anyhow::Result<()> {
    let client = api_client();
    let body = hp_api_types::UpdateTaskStatusBody {
        task_id,
        status: status.to_string(),
        summary: summary.to_string(),
        key_learnings: Vec::new(),
    };

    let resp = client
        .post(format!("{api_url}/update_task_status"))
        .header("X-Agent-ID", agent_id.to_string())
        .json(&body)
        .send()
        .await
        .map_err(friendly_error)?;

    let status_code = resp.status();
    let body: serde_json::Value = resp.json().await.map_err(friendly_error)?;
    if !status_code.is_success() {
        anyhow::bail!("failed to update task {task_id}: {} (HTTP {status_code})", error_message(&body));
    }
    println!("task {task_id} updated.");
    Ok(())
}

async fn task_id_action(
    api_url: &str,
    agent_id: Uuid,
    path: &str,
    task_id: Uuid,
    verb: &str,
    past_tense: &str,
) -> anyhow::Result<()> {
    let client = api_client();
    let resp = client
        .post(format!("{api_url}{path}"))
        .header("X-Agent-ID", agent_id.to_string())
        .json(&hp_api_types::TaskIdBody { task_id })
        .send()
        .await
        .map_err(friendly_error)?;

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.map_err(friendly_error)?;
    if !status.is_success() {
        anyhow::bail!("failed to {verb} task {task_id}: {} (HTTP {status})", error_message(&body));
    }
    println!("task {task_id} {past_tense}.");
    Ok(())
}

/// `task bump`: boost a queued task's priority.
pub async fn bump(api_url: &str, agent_id: Uuid, task_id: Uuid) -> anyhow::Result<()> {
    task_id_action(api_url, agent_id, "/api/bump_task_priority", task_id, "bump", "bumped").await
}

/// `task cancel`: remove a queued task.
pub async fn cancel(api_url: &str, agent_id: Uuid, task_id: Uuid) -> anyhow::Result<()> {
    task_id_action(api_url, agent_id, "/api/cancel_queued_task", task_id, "cancel", "cancelled").await
}

/// `task restart`: requeue a failed or cancelled task.
pub async fn restart(api_url: &str, agent_id: Uuid, task_id: Uuid) -> anyhow::Result<()> {
    task_id_action(api_url, agent_id, "/api/restart_task", task_id, "restart", "restarted").await
}
