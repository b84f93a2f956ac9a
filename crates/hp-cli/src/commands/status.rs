use uuid::Uuid;

use super::{api_client, error_message, friendly_error};

/// Run the `status` subcommand: health-check the daemon and print the
/// queue snapshot.
pub async fn run(api_url: &str, agent_id: Uuid) -> anyhow::Result<()> {
    let client = api_client();

    let health = client
        .get(format!("{api_url}/health"))
        .send()
        .await
        .map_err(friendly_error)?;
    println!("hephaestus daemon  ({api_url})");
    println!("{}", "-".repeat(40));
    println!("health: {}", if health.status().is_success() { "ok" } else { "degraded" });

    let resp = client
        .get(format!("{api_url}/api/queue_status"))
        .header("X-Agent-ID", agent_id.to_string())
        .send()
        .await
        .map_err(friendly_error)?;

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.map_err(friendly_error)?;
    if !status.is_success() {
        anyhow::bail!("failed to read queue status: {} (HTTP {status})", error_message(&body));
    }

    let queue: hp_api_types::QueueStatusResponse = serde_json::from_value(body)?;
    println!("max concurrent agents: {}", queue.max_concurrent_agents);
    println!("active phase agents:   {}", queue.active_phase_agents);
    println!("queued tasks:           {}", queue.queued_task_ids.len());
    for id in &queue.queued_task_ids {
        println!("  - {id}");
    }

    Ok(())
}
