#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Operator CLI for the hephaestus daemon's HTTP surface.
#[derive(Parser)]
#[command(name = "hp", version, about)]
struct Cli {
    /// Base URL of the daemon's API.
    #[arg(short = 'u', long, global = true, default_value = "http://127.0.0.1:7890")]
    api_url: String,

    /// Agent identity to act as (defaults to the nil UUID for operator calls).
    #[arg(long, global = true)]
    agent_id: Option<Uuid>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health and queue status (default when no subcommand is given).
    Status,

    /// Connectivity and environment checks.
    Doctor {
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },

    /// Task submission and lifecycle management.
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Submit a new task into a workflow.
    Create {
        /// Free-text task description.
        #[arg(short = 'd', long)]
        description: String,
        /// Definition-of-done text.
        #[arg(long)]
        done_definition: String,
        /// Workflow execution this task belongs to.
        #[arg(long)]
        workflow_id: Uuid,
        /// Ticket this task is being created to address.
        #[arg(long)]
        ticket_id: Option<Uuid>,
        /// Phase this task belongs to.
        #[arg(long)]
        phase_id: Option<Uuid>,
        /// Working directory hint, if not taken from the phase template.
        #[arg(long)]
        working_directory: Option<String>,
    },

    /// Record a task's completion status and a summary.
    Status {
        task_id: Uuid,
        /// New status (e.g. completed, failed).
        #[arg(long)]
        status: String,
        /// Human-readable summary of what happened.
        #[arg(long)]
        summary: String,
    },

    /// Boost a queued task's priority.
    Bump { task_id: Uuid },

    /// Cancel a queued task.
    Cancel { task_id: Uuid },

    /// Requeue a failed or cancelled task.
    Restart { task_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hp_telemetry::logging::init_logging("hp-cli", "warn");

    let cli = Cli::parse();
    let api_url = cli.api_url.trim_end_matches('/').to_string();
    let agent_id = cli.agent_id.unwrap_or(Uuid::nil());
    tracing::debug!(%api_url, %agent_id, "dispatching command");

    match cli.command {
        None | Some(Commands::Status) => {
            commands::status::run(&api_url, agent_id).await?;
        }
        Some(Commands::Doctor { json }) => {
            commands::doctor::run(&api_url, json).await?;
        }
        Some(Commands::Task { command }) => match command {
            TaskCommands::Create {
                description,
                done_definition,
                workflow_id,
                ticket_id,
                phase_id,
                working_directory,
            } => {
                let opts = commands::task::CreateOptions {
                    description,
                    done_definition,
                    workflow_id,
                    ticket_id,
                    phase_id,
                    working_directory,
                };
                commands::task::create(&api_url, agent_id, opts).await?;
            }
            TaskCommands::Status { task_id, status, summary } => {
                commands::task::set_status(&api_url, agent_id, task_id, &status, &summary).await?;
            }
            TaskCommands::Bump { task_id } => {
                commands::task::bump(&api_url, agent_id, task_id).await?;
            }
            TaskCommands::Cancel { task_id } => {
                commands::task::cancel(&api_url, agent_id, task_id).await?;
            }
            TaskCommands::Restart { task_id } => {
                commands::task::restart(&api_url, agent_id, task_id).await?;
            }
        },
    }

    Ok(())
}
