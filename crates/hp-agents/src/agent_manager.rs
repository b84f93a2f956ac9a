//! AgentManager (S7 / C3): spawns, messages, restarts, and terminates phase
//! and validator agents. Wraps `hp-session`'s PTY pool the way
//! `hp-session::session` wraps `hp-session::pty_pool` one layer down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hp_core::config::AgentsConfig;
use hp_core::store::Store;
use hp_core::types::{Agent, AgentKind, AgentLogEntry, AgentStatus, BoardConfig, CliOverrides, CliType, Phase, Task};
use hp_core::worktree_manager::WorktreeManager;
use hp_intelligence::capability::{IntelligenceProvider, PromptContext};
use hp_session::pty_pool::PtyPool;
use hp_session::session::AgentSession;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

const INIT_WAIT: Duration = Duration::from_millis(1500);
const PROMPT_CHUNK_SIZE: usize = 2500;
const PROMPT_CHUNK_DELAY: Duration = Duration::from_millis(150);
const MAX_VERIFY_ATTEMPTS: u32 = 3;
const FINAL_OUTPUT_LINES: usize = 10_000;

#[derive(Debug, Error)]
pub enum AgentManagerError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("worktree error: {0}")]
    Worktree(#[from] hp_core::worktree_manager::WorktreeManagerError),
    #[error("pty error: {0}")]
    Pty(#[from] hp_session::pty_pool::PtyError),
    #[error("intelligence error: {0}")]
    Intelligence(#[from] hp_intelligence::capability::CapabilityError),
    #[error("session for agent {0} not found or no longer alive")]
    SessionGone(Uuid),
    #[error("agent {0} not found")]
    AgentNotFound(Uuid),
    #[error("initial prompt delivery to agent {0} could not be verified after {1} attempts")]
    PromptDeliveryFailed(Uuid, u32),
}

pub type Result<T> = std::result::Result<T, AgentManagerError>;

/// Spawn parameters resolved by the caller (TaskService) before invoking
/// [`AgentManager::spawn_phase_agent`] — phase overrides beat global
/// defaults.
pub fn resolve_cli_choice(defaults: &AgentsConfig, overrides: &CliOverrides) -> (CliType, Option<String>) {
    let cli_type = overrides.cli_tool.unwrap_or(defaults.default_cli_tool);
    let cli_model = overrides.cli_model.clone().or_else(|| defaults.cli_model.clone());
    (cli_type, cli_model)
}

pub struct AgentManager {
    store: Arc<Store>,
    worktree: Arc<WorktreeManager>,
    pty_pool: Arc<PtyPool>,
    intelligence: Arc<dyn IntelligenceProvider>,
    defaults: AgentsConfig,
    sessions: Mutex<HashMap<Uuid, AgentSession>>,
}

impl AgentManager {
    pub fn new(
        store: Arc<Store>,
        worktree: Arc<WorktreeManager>,
        pty_pool: Arc<PtyPool>,
        intelligence: Arc<dyn IntelligenceProvider>,
        defaults: AgentsConfig,
    ) -> Self {
        Self { store, worktree, pty_pool, intelligence, defaults, sessions: Mutex::new(HashMap::new()) }
    }

    fn session_name(&self, agent_id: Uuid) -> String {
        format!("{}{}", self.defaults.tmux_session_prefix, short_id(agent_id))
    }

    fn restart_session_name(&self, agent_id: Uuid) -> String {
        format!("{}{}_r", self.defaults.tmux_session_prefix, short_id(agent_id))
    }

    /// Assemble GLM/approval environment overrides.
    fn env_overrides(
        &self,
        cli_type: CliType,
        overrides: &CliOverrides,
        board: Option<&BoardConfig>,
    ) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if cli_type == CliType::Glm {
            if let Some(token_env) = overrides.glm_api_token_env.as_ref().or(self.defaults.glm_api_token_env.as_ref()) {
                if let Ok(token) = std::env::var(token_env) {
                    env.push(("ANTHROPIC_AUTH_TOKEN".to_string(), token));
                    env.push(("ANTHROPIC_BASE_URL".to_string(), "https://open.bigmodel.cn/api/anthropic".to_string()));
                }
            }
        }
        if let Some(board) = board {
            if board.ticket_human_review && matches!(cli_type, CliType::Claude | CliType::Glm) {
                env.push(("APPROVAL_TIMEOUT_MS".to_string(), (board.approval_timeout_seconds * 1000).to_string()));
            }
        }
        env
    }

    /// Spawn a phase agent for `task`.
    pub async fn spawn_phase_agent(
        &self,
        task: &Task,
        phase: Option<&Phase>,
        cli_overrides: &CliOverrides,
        board: Option<&BoardConfig>,
        working_directory_hint: Option<&str>,
    ) -> Result<Agent> {
        let agent_id = Uuid::new_v4();
        let (cli_type, cli_model) = resolve_cli_choice(&self.defaults, cli_overrides);

        let parent_agent_id = match task.parent_task_id {
            Some(parent_task_id) => self.store.get_task(parent_task_id).await?.and_then(|t| t.assigned_agent_id),
            None => None,
        };

        let worktree = self.worktree.create_agent_worktree(agent_id, parent_agent_id, None).await?;
        self.worktree.merge_main_into_branch(agent_id).await?;

        let mut ctx = PromptContext::default();
        if let Some(p) = phase {
            ctx.cross_phase_summaries = vec![format!("phase {} ({}): {}", p.order, p.name, p.description)];
        }
        let system_prompt = self.intelligence.generate_agent_prompt(task, phase, &ctx).await?;
        let system_prompt = system_prompt
            .replace("{agent_id}", &agent_id.to_string())
            .replace("{working_directory}", working_directory_hint.unwrap_or(&worktree.worktree_path));

        let extra_env = self.env_overrides(cli_type, cli_overrides, board);
        let extra_env_refs: Vec<(&str, &str)> = extra_env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let mut agent = Agent::new(cli_type, self.session_name(agent_id), AgentKind::Phase);
        agent.id = agent_id;
        agent.cli_model = cli_model;
        agent.system_prompt = system_prompt.clone();
        agent.current_task_id = Some(task.id);
        agent.status = AgentStatus::Working;

        let session = AgentSession::spawn_with_env(
            &self.pty_pool,
            agent_id,
            &cli_type,
            "",
            &worktree.worktree_path,
            &extra_env_refs,
        )
        .await?;

        tokio::time::sleep(INIT_WAIT).await;
        if !session.is_alive() {
            warn!(%agent_id, "agent session exited during initialization");
            let _ = self.worktree.cleanup_worktree(agent_id).await;
            return Err(AgentManagerError::SessionGone(agent_id));
        }

        self.deliver_initial_prompt(&session, &system_prompt, task.id).await?;

        self.store.upsert_agent(&agent).await?;
        self.sessions.lock().await.insert(agent_id, session);

        info!(%agent_id, task_id = %task.id, cli = ?cli_type, "spawned phase agent");
        Ok(agent)
    }

    /// Spawn a validator/result-validator agent against an existing,
    /// already-checked-out worktree path. Unlike
    /// [`spawn_phase_agent`](Self::spawn_phase_agent) this never creates a
    /// new worktree; it reuses the one named by `worktree_path` at whatever
    /// commit is currently checked out there.
    pub async fn spawn_validator_agent(
        &self,
        task_id: Uuid,
        worktree_path: &str,
        kind: AgentKind,
        cli_overrides: &CliOverrides,
        specialized_prompt: Option<String>,
    ) -> Result<Agent> {
        let agent_id = Uuid::new_v4();
        let (cli_type, cli_model) = resolve_cli_choice(&self.defaults, cli_overrides);
        let role = match kind {
            AgentKind::Validator => "validator",
            AgentKind::ResultValidator => "result validator",
            _ => "diagnostic",
        };
        let prompt = specialized_prompt.unwrap_or_else(|| hp_intelligence::prompt::render_role_fallback_prompt(role, task_id));

        let mut agent = Agent::new(cli_type, self.session_name(agent_id), kind);
        agent.id = agent_id;
        agent.cli_model = cli_model;
        agent.system_prompt = prompt.clone();
        agent.current_task_id = Some(task_id);
        agent.status = AgentStatus::Working;

        let session = AgentSession::spawn(&self.pty_pool, agent_id, &cli_type, "", worktree_path).await?;
        tokio::time::sleep(INIT_WAIT).await;
        if !session.is_alive() {
            return Err(AgentManagerError::SessionGone(agent_id));
        }
        self.deliver_initial_prompt(&session, &prompt, task_id).await?;

        self.store.upsert_agent(&agent).await?;
        self.sessions.lock().await.insert(agent_id, session);

        info!(%agent_id, %task_id, ?kind, "spawned validator agent");
        Ok(agent)
    }

    /// Forward validator feedback into the original agent's session on a
    /// failed review.
    pub async fn forward_feedback(&self, original_agent_id: Uuid, feedback: &str) -> Result<()> {
        let sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&original_agent_id) {
            let line = format!("[VALIDATION FEEDBACK]: {feedback}");
            session.send_raw(line.as_bytes())?;
            session.send_raw(b"\n")?;
        }
        Ok(())
    }

    /// Deliver the initial message in ~2500-char chunks with a short
    /// inter-chunk delay, finalized with a bare Enter, then optionally
    /// verify the Task ID marker appears in the session buffer.
    async fn deliver_initial_prompt(&self, session: &AgentSession, prompt: &str, task_id: Uuid) -> Result<()> {
        let bytes = prompt.as_bytes();
        let mut offset = 0;
        while offset < bytes.len() {
            let end = (offset + PROMPT_CHUNK_SIZE).min(bytes.len());
            session.send_raw(&bytes[offset..end])?;
            offset = end;
            if offset < bytes.len() {
                tokio::time::sleep(PROMPT_CHUNK_DELAY).await;
            }
        }
        session.send_raw(b"\n")?;

        let marker = task_id.to_string();
        for attempt in 1..=MAX_VERIFY_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let buffer = session.read_output();
            if String::from_utf8_lossy(&buffer).contains(&marker) {
                return Ok(());
            }
            if attempt < MAX_VERIFY_ATTEMPTS {
                session.send_raw(b"\n")?;
            }
        }
        warn!(agent_id = %session.agent_id, %task_id, "could not verify initial prompt delivery, proceeding anyway");
        Ok(())
    }

    /// Capture final output, kill the session, mark the agent terminated.
    pub async fn terminate_agent(&self, agent_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.remove(&agent_id) {
            let output = session.read_output();
            let text = String::from_utf8_lossy(&output);
            for line in text.lines().rev().take(FINAL_OUTPUT_LINES).collect::<Vec<_>>().into_iter().rev() {
                self.store
                    .append_agent_log(&AgentLogEntry { id: Uuid::new_v4(), agent_id, line: line.to_string(), created_at: chrono::Utc::now() })
                    .await?;
            }
            let _ = session.kill();
        }
        if let Some(mut agent) = self.store.get_agent(agent_id).await? {
            agent.status = AgentStatus::Terminated;
            self.store.upsert_agent(&agent).await?;
        }
        info!(%agent_id, "agent terminated");
        Ok(())
    }

    /// Restart an agent: kill the old session, rebuild env+session under a
    /// new session name, re-issue the launch command, send a task reminder.
    pub async fn restart_agent(&self, agent_id: Uuid, task: &Task, cli_overrides: &CliOverrides) -> Result<()> {
        let mut agent = self.store.get_agent(agent_id).await?.ok_or(AgentManagerError::AgentNotFound(agent_id))?;
        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or(AgentManagerError::AgentNotFound(agent_id))?;

        if let Some(mut session) = self.sessions.lock().await.remove(&agent_id) {
            let _ = session.kill();
        }

        let new_name = self.restart_session_name(agent_id);
        let (cli_type, _) = resolve_cli_choice(&self.defaults, cli_overrides);
        let extra_env = self.env_overrides(cli_type, cli_overrides, None);
        let extra_env_refs: Vec<(&str, &str)> = extra_env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let session = AgentSession::spawn_with_env(&self.pty_pool, agent_id, &cli_type, "", &worktree.worktree_path, &extra_env_refs).await?;
        tokio::time::sleep(INIT_WAIT).await;
        if !session.is_alive() {
            return Err(AgentManagerError::SessionGone(agent_id));
        }

        let reminder = format!("You were restarted. Resume task {}: {}", task.id, task.done_definition);
        session.send_raw(reminder.as_bytes())?;
        session.send_raw(b"\n")?;

        agent.tmux_session_name = new_name;
        agent.status = AgentStatus::Working;
        self.store.upsert_agent(&agent).await?;
        self.sessions.lock().await.insert(agent_id, session);

        info!(%agent_id, task_id = %task.id, "restarted agent");
        Ok(())
    }

    /// `[AGENT <src> BROADCAST]: ...` to every non-terminated agent except
    /// the sender; fire-and-forget, audited in the agent log.
    pub async fn broadcast_message(&self, sender_agent_id: Uuid, message: &str) -> Result<()> {
        let line = format!("[AGENT {sender_agent_id} BROADCAST]: {message}");
        let sessions = self.sessions.lock().await;
        for (&agent_id, session) in sessions.iter() {
            if agent_id == sender_agent_id {
                continue;
            }
            let _ = session.send_raw(line.as_bytes());
            let _ = session.send_raw(b"\n");
        }
        drop(sessions);
        self.store
            .append_agent_log(&AgentLogEntry { id: Uuid::new_v4(), agent_id: sender_agent_id, line, created_at: chrono::Utc::now() })
            .await?;
        Ok(())
    }

    /// `[AGENT <src> TO AGENT <dst>]: ...` direct message, audited.
    pub async fn send_message(&self, sender_agent_id: Uuid, recipient_agent_id: Uuid, message: &str) -> Result<()> {
        let line = format!("[AGENT {sender_agent_id} TO AGENT {recipient_agent_id}]: {message}");
        let sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&recipient_agent_id) {
            session.send_raw(line.as_bytes())?;
            session.send_raw(b"\n")?;
        }
        drop(sessions);
        self.store
            .append_agent_log(&AgentLogEntry { id: Uuid::new_v4(), agent_id: sender_agent_id, line, created_at: chrono::Utc::now() })
            .await?;
        Ok(())
    }

    pub async fn is_session_alive(&self, agent_id: Uuid) -> bool {
        self.sessions.lock().await.get(&agent_id).map(|s| s.is_alive()).unwrap_or(false)
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
