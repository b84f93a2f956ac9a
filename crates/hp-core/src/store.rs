//! Async SQLite-backed persistence for every entity in [`crate::types`].
//!
//! Reads for workflows, tasks, agents and tickets are plain indexed lookups;
//! ticket full-text search goes through an FTS5 virtual table kept in sync by
//! triggers, mirroring the trigger-maintained FTS table in the original
//! Python implementation's `database.py`.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::types::{
    Agent, AgentKind, AgentLogEntry, AgentResult, AgentStatus, AgentWorktree, ApprovalStatus,
    BoardConfig, CliOverrides, CliType, GuardianAnalysis, MemoryType, MergeConflictResolution,
    MergeStatus, Phase, PhaseExecution, PhaseExecutionStatus, PhaseTemplate, PhaseValidationConfig,
    ResolutionChoice, ResultValidationStatus, SteeringIntervention, Task, TaskPriority, TaskStatus,
    Ticket, TicketComment, TicketCommit, TicketHistory, WorkflowConfig, WorkflowDefinition,
    WorkflowExecution, WorkflowExecutionStatus, WorkflowResult,
};
use crate::types::Memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Async SQLite store backing every leaf component that reads or writes
/// orchestrator state.
pub struct Store {
    conn: Connection,
}

// ---------------------------------------------------------------------------
// enum <-> SQLite helpers
// ---------------------------------------------------------------------------

fn enum_to_sql<T: serde::Serialize>(val: &T) -> String {
    serde_json::to_string(val).expect("serialize enum").trim_matches('"').to_string()
}

fn enum_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    serde_json::from_str(&format!("\"{raw}\"")).expect("deserialize enum")
}

fn json_to_sql<T: serde::Serialize>(val: &T) -> String {
    serde_json::to_string(val).expect("serialize json")
}

fn json_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    serde_json::from_str(raw).expect("deserialize json")
}

fn dt_to_sql(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn dt_from_sql(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).expect("valid date").with_timezone(&Utc)
}

fn opt_dt_to_sql(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(dt_to_sql)
}

fn opt_dt_from_sql(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.map(|s| dt_from_sql(&s))
}

impl Store {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA cache_size = -64000;
                    PRAGMA mmap_size = 268435456;
                    PRAGMA temp_store = MEMORY;
                    PRAGMA busy_timeout = 5000;
                    PRAGMA foreign_keys = ON;

                    CREATE TABLE IF NOT EXISTS workflow_definitions (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        description TEXT NOT NULL,
                        phases_config TEXT NOT NULL,
                        workflow_config TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS workflow_executions (
                        id TEXT PRIMARY KEY,
                        definition_id TEXT NOT NULL,
                        description TEXT NOT NULL,
                        working_directory TEXT NOT NULL,
                        launch_params TEXT NOT NULL,
                        status TEXT NOT NULL,
                        result_found INTEGER NOT NULL,
                        result_id TEXT,
                        completed_by_result INTEGER NOT NULL,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_executions_definition ON workflow_executions(definition_id);

                    CREATE TABLE IF NOT EXISTS phases (
                        id TEXT PRIMARY KEY,
                        workflow_id TEXT NOT NULL,
                        \"order\" INTEGER NOT NULL,
                        name TEXT NOT NULL,
                        description TEXT NOT NULL,
                        done_definitions TEXT NOT NULL,
                        additional_notes TEXT NOT NULL,
                        outputs TEXT NOT NULL,
                        next_steps TEXT NOT NULL,
                        working_directory TEXT,
                        validation TEXT,
                        cli_overrides TEXT NOT NULL,
                        execution_status TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_phases_workflow_order ON phases(workflow_id, \"order\");

                    CREATE TABLE IF NOT EXISTS phase_executions (
                        id TEXT PRIMARY KEY,
                        phase_id TEXT NOT NULL,
                        workflow_id TEXT NOT NULL,
                        \"order\" INTEGER NOT NULL,
                        status TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        started_at TEXT,
                        completed_at TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_phase_exec_workflow ON phase_executions(workflow_id, \"order\");

                    CREATE TABLE IF NOT EXISTS tasks (
                        id TEXT PRIMARY KEY,
                        raw_description TEXT NOT NULL,
                        enriched_description TEXT NOT NULL,
                        done_definition TEXT NOT NULL,
                        status TEXT NOT NULL,
                        priority TEXT NOT NULL,
                        priority_boosted INTEGER NOT NULL,
                        assigned_agent_id TEXT,
                        created_by_agent_id TEXT,
                        parent_task_id TEXT,
                        phase_id TEXT,
                        workflow_id TEXT NOT NULL,
                        ticket_id TEXT,
                        validation_enabled INTEGER NOT NULL,
                        validation_iteration INTEGER NOT NULL,
                        last_validation_feedback TEXT,
                        embedding TEXT,
                        duplicate_of_task_id TEXT,
                        similarity_score REAL,
                        queued_at TEXT,
                        completed_at TEXT,
                        failure_reason TEXT,
                        completion_notes TEXT,
                        estimated_complexity INTEGER,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_tasks_status_priority
                        ON tasks(status, priority_boosted DESC, priority DESC, queued_at ASC);
                    CREATE INDEX IF NOT EXISTS idx_tasks_workflow ON tasks(workflow_id);
                    CREATE INDEX IF NOT EXISTS idx_tasks_phase ON tasks(phase_id);
                    CREATE INDEX IF NOT EXISTS idx_tasks_ticket ON tasks(ticket_id);

                    CREATE TABLE IF NOT EXISTS agents (
                        id TEXT PRIMARY KEY,
                        system_prompt TEXT NOT NULL,
                        status TEXT NOT NULL,
                        cli_type TEXT NOT NULL,
                        cli_model TEXT,
                        tmux_session_name TEXT NOT NULL,
                        current_task_id TEXT,
                        agent_type TEXT NOT NULL,
                        kept_alive_for_validation INTEGER NOT NULL,
                        last_activity TEXT NOT NULL,
                        health_check_failures INTEGER NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_agents_status ON agents(status);

                    CREATE TABLE IF NOT EXISTS agent_worktrees (
                        agent_id TEXT PRIMARY KEY,
                        worktree_path TEXT NOT NULL,
                        branch_name TEXT NOT NULL,
                        parent_agent_id TEXT,
                        parent_commit_sha TEXT,
                        base_commit_sha TEXT NOT NULL,
                        merge_status TEXT NOT NULL,
                        merge_commit_sha TEXT,
                        created_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS merge_conflict_resolutions (
                        id TEXT PRIMARY KEY,
                        agent_id TEXT NOT NULL,
                        file_path TEXT NOT NULL,
                        parent_modified_at TEXT NOT NULL,
                        child_modified_at TEXT NOT NULL,
                        resolution_choice TEXT NOT NULL,
                        recorded_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_merge_conflicts_agent ON merge_conflict_resolutions(agent_id);

                    CREATE TABLE IF NOT EXISTS tickets (
                        id TEXT PRIMARY KEY,
                        workflow_id TEXT NOT NULL,
                        title TEXT NOT NULL,
                        description TEXT NOT NULL,
                        ticket_type TEXT NOT NULL,
                        priority TEXT NOT NULL,
                        status TEXT NOT NULL,
                        approval_status TEXT NOT NULL,
                        parent_ticket_id TEXT,
                        blocked_by_ticket_ids TEXT NOT NULL,
                        is_resolved INTEGER NOT NULL,
                        created_by_agent_id TEXT,
                        assigned_agent_id TEXT,
                        tags TEXT NOT NULL,
                        embedding TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_tickets_workflow_status ON tickets(workflow_id, status);
                    CREATE INDEX IF NOT EXISTS idx_tickets_workflow_priority ON tickets(workflow_id, priority);
                    CREATE INDEX IF NOT EXISTS idx_tickets_assigned ON tickets(assigned_agent_id);

                    CREATE VIRTUAL TABLE IF NOT EXISTS tickets_fts USING fts5(
                        title, description, tags, content='tickets', content_rowid='rowid'
                    );
                    CREATE TRIGGER IF NOT EXISTS tickets_ai AFTER INSERT ON tickets BEGIN
                        INSERT INTO tickets_fts(rowid, title, description, tags)
                        VALUES (new.rowid, new.title, new.description, new.tags);
                    END;
                    CREATE TRIGGER IF NOT EXISTS tickets_ad AFTER DELETE ON tickets BEGIN
                        INSERT INTO tickets_fts(tickets_fts, rowid, title, description, tags)
                        VALUES ('delete', old.rowid, old.title, old.description, old.tags);
                    END;
                    CREATE TRIGGER IF NOT EXISTS tickets_au AFTER UPDATE ON tickets BEGIN
                        INSERT INTO tickets_fts(tickets_fts, rowid, title, description, tags)
                        VALUES ('delete', old.rowid, old.title, old.description, old.tags);
                        INSERT INTO tickets_fts(rowid, title, description, tags)
                        VALUES (new.rowid, new.title, new.description, new.tags);
                    END;

                    CREATE TABLE IF NOT EXISTS ticket_comments (
                        id TEXT PRIMARY KEY,
                        ticket_id TEXT NOT NULL,
                        author_agent_id TEXT,
                        comment_text TEXT NOT NULL,
                        comment_type TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_ticket_comments_ticket ON ticket_comments(ticket_id);

                    CREATE TABLE IF NOT EXISTS ticket_history (
                        id TEXT PRIMARY KEY,
                        ticket_id TEXT NOT NULL,
                        change_type TEXT NOT NULL,
                        old_value TEXT,
                        new_value TEXT,
                        description TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_ticket_history_ticket ON ticket_history(ticket_id);

                    CREATE TABLE IF NOT EXISTS ticket_commits (
                        id TEXT PRIMARY KEY,
                        ticket_id TEXT NOT NULL,
                        commit_sha TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_ticket_commits_ticket ON ticket_commits(ticket_id);
                    CREATE INDEX IF NOT EXISTS idx_ticket_commits_sha ON ticket_commits(commit_sha);

                    CREATE TABLE IF NOT EXISTS board_configs (
                        workflow_id TEXT PRIMARY KEY,
                        columns TEXT NOT NULL,
                        allowed_types TEXT NOT NULL,
                        initial_status TEXT NOT NULL,
                        ticket_human_review INTEGER NOT NULL,
                        approval_timeout_seconds INTEGER NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS memories (
                        id TEXT PRIMARY KEY,
                        agent_id TEXT NOT NULL,
                        content TEXT NOT NULL,
                        memory_type TEXT NOT NULL,
                        embedding_id TEXT,
                        tags TEXT NOT NULL,
                        related_files TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_id);

                    CREATE TABLE IF NOT EXISTS agent_results (
                        id TEXT PRIMARY KEY,
                        task_id TEXT NOT NULL,
                        agent_id TEXT NOT NULL,
                        markdown_file_path TEXT NOT NULL,
                        result_type TEXT NOT NULL,
                        summary TEXT NOT NULL,
                        extra_files TEXT NOT NULL,
                        validation_status TEXT NOT NULL,
                        validation_feedback TEXT,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_agent_results_task ON agent_results(task_id);

                    CREATE TABLE IF NOT EXISTS workflow_results (
                        id TEXT PRIMARY KEY,
                        workflow_id TEXT NOT NULL,
                        agent_id TEXT NOT NULL,
                        markdown_file_path TEXT NOT NULL,
                        explanation TEXT NOT NULL,
                        validation_status TEXT NOT NULL,
                        validation_feedback TEXT,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_workflow_results_workflow ON workflow_results(workflow_id);

                    CREATE TABLE IF NOT EXISTS validation_reviews (
                        id TEXT PRIMARY KEY,
                        task_id TEXT NOT NULL,
                        validator_agent_id TEXT NOT NULL,
                        iteration INTEGER NOT NULL,
                        passed INTEGER NOT NULL,
                        feedback TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_validation_reviews_task ON validation_reviews(task_id);

                    CREATE TABLE IF NOT EXISTS steering_interventions (
                        id TEXT PRIMARY KEY,
                        agent_id TEXT NOT NULL,
                        task_id TEXT NOT NULL,
                        reason TEXT NOT NULL,
                        action_taken TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS guardian_analyses (
                        id TEXT PRIMARY KEY,
                        agent_id TEXT NOT NULL,
                        verdict TEXT NOT NULL,
                        notes TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS conductor_analyses (
                        id TEXT PRIMARY KEY,
                        workflow_id TEXT NOT NULL,
                        notes TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS agent_log_entries (
                        id TEXT PRIMARY KEY,
                        agent_id TEXT NOT NULL,
                        line TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_agent_log_agent ON agent_log_entries(agent_id, created_at);
                    ",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // WorkflowDefinition
    // -----------------------------------------------------------------------

    pub async fn upsert_workflow_definition(&self, def: &WorkflowDefinition) -> Result<()> {
        let def = def.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_definitions (id, name, description, phases_config, workflow_config, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)
                     ON CONFLICT(id) DO UPDATE SET
                        name=excluded.name, description=excluded.description,
                        phases_config=excluded.phases_config, workflow_config=excluded.workflow_config,
                        updated_at=excluded.updated_at",
                    rusqlite::params![
                        def.id,
                        def.name,
                        def.description,
                        json_to_sql(&def.phases_config),
                        json_to_sql(&def.workflow_config),
                        dt_to_sql(&def.created_at),
                        dt_to_sql(&def.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_workflow_definition(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, description, phases_config, workflow_config, created_at, updated_at
                     FROM workflow_definitions WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(row.map(|(id, name, description, phases_config, workflow_config, created_at, updated_at)| {
            WorkflowDefinition {
                id,
                name,
                description,
                phases_config: json_from_sql::<Vec<PhaseTemplate>>(&phases_config),
                workflow_config: json_from_sql::<WorkflowConfig>(&workflow_config),
                created_at: dt_from_sql(&created_at),
                updated_at: dt_from_sql(&updated_at),
            }
        }))
    }

    // -----------------------------------------------------------------------
    // WorkflowExecution
    // -----------------------------------------------------------------------

    pub async fn upsert_workflow_execution(&self, exec: &WorkflowExecution) -> Result<()> {
        let exec = exec.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_executions
                        (id, definition_id, description, working_directory, launch_params, status,
                         result_found, result_id, completed_by_result, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
                     ON CONFLICT(id) DO UPDATE SET
                        status=excluded.status, result_found=excluded.result_found,
                        result_id=excluded.result_id, completed_by_result=excluded.completed_by_result,
                        updated_at=excluded.updated_at",
                    rusqlite::params![
                        exec.id.to_string(),
                        exec.definition_id,
                        exec.description,
                        exec.working_directory,
                        json_to_sql(&exec.launch_params),
                        enum_to_sql(&exec.status),
                        exec.result_found,
                        exec.result_id.map(|v| v.to_string()),
                        exec.completed_by_result,
                        dt_to_sql(&exec.created_at),
                        dt_to_sql(&exec.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_workflow_execution(&self, id: Uuid) -> Result<Option<WorkflowExecution>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, definition_id, description, working_directory, launch_params, status,
                            result_found, result_id, completed_by_result, created_at, updated_at
                     FROM workflow_executions WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_execution(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_active_workflow_executions(&self) -> Result<Vec<WorkflowExecution>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, definition_id, description, working_directory, launch_params, status,
                            result_found, result_id, completed_by_result, created_at, updated_at
                     FROM workflow_executions WHERE status = 'active'",
                )?;
                let rows = stmt.query_map([], row_to_execution)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    // -----------------------------------------------------------------------
    // Phase
    // -----------------------------------------------------------------------

    pub async fn insert_phase(&self, phase: &Phase) -> Result<()> {
        let phase = phase.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO phases
                        (id, workflow_id, \"order\", name, description, done_definitions,
                         additional_notes, outputs, next_steps, working_directory, validation,
                         cli_overrides, execution_status, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
                    rusqlite::params![
                        phase.id.to_string(),
                        phase.workflow_id.to_string(),
                        phase.order,
                        phase.name,
                        phase.description,
                        json_to_sql(&phase.done_definitions),
                        phase.additional_notes,
                        json_to_sql(&phase.outputs),
                        json_to_sql(&phase.next_steps),
                        phase.working_directory,
                        phase.validation.as_ref().map(json_to_sql),
                        json_to_sql(&phase.cli_overrides),
                        enum_to_sql(&phase.execution_status),
                        dt_to_sql(&phase.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn update_phase_status(&self, id: Uuid, status: PhaseExecutionStatus) -> Result<()> {
        let id = id.to_string();
        let status = enum_to_sql(&status);
        self.conn
            .call(move |conn| {
                conn.execute("UPDATE phases SET execution_status = ?1 WHERE id = ?2", rusqlite::params![status, id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_phases_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<Phase>> {
        let workflow_id = workflow_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, \"order\", name, description, done_definitions,
                            additional_notes, outputs, next_steps, working_directory, validation,
                            cli_overrides, execution_status, created_at
                     FROM phases WHERE workflow_id = ?1 ORDER BY \"order\" ASC",
                )?;
                let rows = stmt.query_map(rusqlite::params![workflow_id], row_to_phase)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn get_phase_by_workflow_and_order(&self, workflow_id: Uuid, order: i64) -> Result<Option<Phase>> {
        let workflow_id = workflow_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, \"order\", name, description, done_definitions,
                            additional_notes, outputs, next_steps, working_directory, validation,
                            cli_overrides, execution_status, created_at
                     FROM phases WHERE workflow_id = ?1 AND \"order\" = ?2",
                )?;
                let mut rows = stmt.query(rusqlite::params![workflow_id, order])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_phase(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn lowest_pending_phase(&self, workflow_id: Uuid) -> Result<Option<Phase>> {
        let workflow_id = workflow_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, \"order\", name, description, done_definitions,
                            additional_notes, outputs, next_steps, working_directory, validation,
                            cli_overrides, execution_status, created_at
                     FROM phases
                     WHERE workflow_id = ?1 AND execution_status IN ('pending', 'in_progress')
                     ORDER BY \"order\" ASC LIMIT 1",
                )?;
                let mut rows = stmt.query(rusqlite::params![workflow_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_phase(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    // -----------------------------------------------------------------------
    // Task
    // -----------------------------------------------------------------------

    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        let task = task.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tasks
                        (id, raw_description, enriched_description, done_definition, status, priority,
                         priority_boosted, assigned_agent_id, created_by_agent_id, parent_task_id,
                         phase_id, workflow_id, ticket_id, validation_enabled, validation_iteration,
                         last_validation_feedback, embedding, duplicate_of_task_id, similarity_score,
                         queued_at, completed_at, failure_reason, completion_notes,
                         estimated_complexity, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26)
                     ON CONFLICT(id) DO UPDATE SET
                        enriched_description=excluded.enriched_description, status=excluded.status,
                        priority=excluded.priority, priority_boosted=excluded.priority_boosted,
                        assigned_agent_id=excluded.assigned_agent_id, phase_id=excluded.phase_id,
                        ticket_id=excluded.ticket_id, validation_iteration=excluded.validation_iteration,
                        last_validation_feedback=excluded.last_validation_feedback,
                        embedding=excluded.embedding, duplicate_of_task_id=excluded.duplicate_of_task_id,
                        similarity_score=excluded.similarity_score, queued_at=excluded.queued_at,
                        completed_at=excluded.completed_at, failure_reason=excluded.failure_reason,
                        completion_notes=excluded.completion_notes,
                        estimated_complexity=excluded.estimated_complexity, updated_at=excluded.updated_at",
                    rusqlite::params![
                        task.id.to_string(),
                        task.raw_description,
                        task.enriched_description,
                        task.done_definition,
                        enum_to_sql(&task.status),
                        enum_to_sql(&task.priority),
                        task.priority_boosted,
                        task.assigned_agent_id.map(|v| v.to_string()),
                        task.created_by_agent_id.map(|v| v.to_string()),
                        task.parent_task_id.map(|v| v.to_string()),
                        task.phase_id.map(|v| v.to_string()),
                        task.workflow_id.to_string(),
                        task.ticket_id.map(|v| v.to_string()),
                        task.validation_enabled,
                        task.validation_iteration,
                        task.last_validation_feedback,
                        task.embedding.as_ref().map(json_to_sql),
                        task.duplicate_of_task_id.map(|v| v.to_string()),
                        task.similarity_score,
                        opt_dt_to_sql(&task.queued_at),
                        opt_dt_to_sql(&task.completed_at),
                        task.failure_reason,
                        task.completion_notes,
                        task.estimated_complexity,
                        dt_to_sql(&task.created_at),
                        dt_to_sql(&task.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_task(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    /// Admission-ordered queue view: FIFO within priority, bumped tasks first.
    pub async fn list_queued_tasks_by_priority(&self) -> Result<Vec<Task>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "{TASK_SELECT} WHERE status = 'queued'
                     ORDER BY priority_boosted DESC, priority DESC, queued_at ASC"
                ))?;
                let rows = stmt.query_map([], row_to_task)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_tasks_by_phase(&self, phase_id: Uuid) -> Result<Vec<Task>> {
        let phase_id = phase_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE phase_id = ?1"))?;
                let rows = stmt.query_map(rusqlite::params![phase_id], row_to_task)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_tasks_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<Task>> {
        let ticket_id = ticket_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE ticket_id = ?1"))?;
                let rows = stmt.query_map(rusqlite::params![ticket_id], row_to_task)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// List every task in a workflow, optionally narrowed to one phase.
    pub async fn list_tasks_by_workflow(&self, workflow_id: Uuid, phase_id: Option<Uuid>) -> Result<Vec<Task>> {
        let workflow_id = workflow_id.to_string();
        let phase_id = phase_id.map(|p| p.to_string());
        self.conn
            .call(move |conn| {
                match &phase_id {
                    Some(phase_id) => {
                        let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE workflow_id = ?1 AND phase_id = ?2"))?;
                        let rows = stmt.query_map(rusqlite::params![workflow_id, phase_id], row_to_task)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE workflow_id = ?1"))?;
                        let rows = stmt.query_map(rusqlite::params![workflow_id], row_to_task)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()
                    }
                }
            })
            .await
            .map_err(Into::into)
    }

    // -----------------------------------------------------------------------
    // Agent
    // -----------------------------------------------------------------------

    pub async fn upsert_agent(&self, agent: &Agent) -> Result<()> {
        let agent = agent.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO agents
                        (id, system_prompt, status, cli_type, cli_model, tmux_session_name,
                         current_task_id, agent_type, kept_alive_for_validation, last_activity,
                         health_check_failures, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
                     ON CONFLICT(id) DO UPDATE SET
                        status=excluded.status, current_task_id=excluded.current_task_id,
                        kept_alive_for_validation=excluded.kept_alive_for_validation,
                        last_activity=excluded.last_activity,
                        health_check_failures=excluded.health_check_failures",
                    rusqlite::params![
                        agent.id.to_string(),
                        agent.system_prompt,
                        enum_to_sql(&agent.status),
                        enum_to_sql(&agent.cli_type),
                        agent.cli_model,
                        agent.tmux_session_name,
                        agent.current_task_id.map(|v| v.to_string()),
                        enum_to_sql(&agent.agent_type),
                        agent.kept_alive_for_validation,
                        dt_to_sql(&agent.last_activity),
                        agent.health_check_failures,
                        dt_to_sql(&agent.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{AGENT_SELECT} WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_agent(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_active_agents(&self) -> Result<Vec<Agent>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{AGENT_SELECT} WHERE status != 'terminated'"))?;
                let rows = stmt.query_map([], row_to_agent)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn append_agent_log(&self, entry: &AgentLogEntry) -> Result<()> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO agent_log_entries (id, agent_id, line, created_at) VALUES (?1,?2,?3,?4)",
                    rusqlite::params![entry.id.to_string(), entry.agent_id.to_string(), entry.line, dt_to_sql(&entry.created_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn tail_agent_log(&self, agent_id: Uuid, limit: i64) -> Result<Vec<AgentLogEntry>> {
        let agent_id_s = agent_id.to_string();
        let mut rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, agent_id, line, created_at FROM agent_log_entries
                     WHERE agent_id = ?1 ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![agent_id_s, limit], |row| {
                    Ok(AgentLogEntry {
                        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
                        agent_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
                        line: row.get(2)?,
                        created_at: dt_from_sql(&row.get::<_, String>(3)?),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;
        rows.reverse();
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // AgentWorktree / MergeConflictResolution
    // -----------------------------------------------------------------------

    pub async fn upsert_agent_worktree(&self, wt: &AgentWorktree) -> Result<()> {
        let wt = wt.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO agent_worktrees
                        (agent_id, worktree_path, branch_name, parent_agent_id, parent_commit_sha,
                         base_commit_sha, merge_status, merge_commit_sha, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
                     ON CONFLICT(agent_id) DO UPDATE SET
                        merge_status=excluded.merge_status, merge_commit_sha=excluded.merge_commit_sha",
                    rusqlite::params![
                        wt.agent_id.to_string(),
                        wt.worktree_path,
                        wt.branch_name,
                        wt.parent_agent_id.map(|v| v.to_string()),
                        wt.parent_commit_sha,
                        wt.base_commit_sha,
                        enum_to_sql(&wt.merge_status),
                        wt.merge_commit_sha,
                        dt_to_sql(&wt.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_agent_worktree(&self, agent_id: Uuid) -> Result<Option<AgentWorktree>> {
        let agent_id = agent_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT agent_id, worktree_path, branch_name, parent_agent_id, parent_commit_sha,
                            base_commit_sha, merge_status, merge_commit_sha, created_at
                     FROM agent_worktrees WHERE agent_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![agent_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_worktree(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn record_merge_conflict_resolution(&self, res: &MergeConflictResolution) -> Result<()> {
        let res = res.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO merge_conflict_resolutions
                        (id, agent_id, file_path, parent_modified_at, child_modified_at,
                         resolution_choice, recorded_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)",
                    rusqlite::params![
                        res.id.to_string(),
                        res.agent_id,
                        res.file_path,
                        dt_to_sql(&res.parent_modified_at),
                        dt_to_sql(&res.child_modified_at),
                        enum_to_sql(&res.resolution_choice),
                        dt_to_sql(&res.recorded_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ticket
    // -----------------------------------------------------------------------

    pub async fn upsert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let ticket = ticket.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tickets
                        (id, workflow_id, title, description, ticket_type, priority, status,
                         approval_status, parent_ticket_id, blocked_by_ticket_ids, is_resolved,
                         created_by_agent_id, assigned_agent_id, tags, embedding, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
                     ON CONFLICT(id) DO UPDATE SET
                        title=excluded.title, description=excluded.description, status=excluded.status,
                        approval_status=excluded.approval_status, blocked_by_ticket_ids=excluded.blocked_by_ticket_ids,
                        is_resolved=excluded.is_resolved, assigned_agent_id=excluded.assigned_agent_id,
                        tags=excluded.tags, embedding=excluded.embedding, updated_at=excluded.updated_at",
                    rusqlite::params![
                        ticket.id.to_string(),
                        ticket.workflow_id.to_string(),
                        ticket.title,
                        ticket.description,
                        ticket.ticket_type,
                        enum_to_sql(&ticket.priority),
                        ticket.status,
                        enum_to_sql(&ticket.approval_status),
                        ticket.parent_ticket_id.map(|v| v.to_string()),
                        json_to_sql(&ticket.blocked_by_ticket_ids),
                        ticket.is_resolved,
                        ticket.created_by_agent_id.map(|v| v.to_string()),
                        ticket.assigned_agent_id.map(|v| v.to_string()),
                        json_to_sql(&ticket.tags),
                        ticket.embedding.as_ref().map(json_to_sql),
                        dt_to_sql(&ticket.created_at),
                        dt_to_sql(&ticket.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TICKET_SELECT} WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_ticket(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_tickets_by_status(&self, workflow_id: Uuid, status: &str) -> Result<Vec<Ticket>> {
        let workflow_id = workflow_id.to_string();
        let status = status.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TICKET_SELECT} WHERE workflow_id = ?1 AND status = ?2"))?;
                let rows = stmt.query_map(rusqlite::params![workflow_id, status], row_to_ticket)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// Most recently created tickets across all workflows (TicketService
    /// clarification arbitrator gathers up to 60).
    pub async fn list_recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TICKET_SELECT} ORDER BY created_at DESC LIMIT ?1"))?;
                let rows = stmt.query_map(rusqlite::params![limit], row_to_ticket)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// Fetch tickets by id, used to resolve `blocked_by_ticket_ids` chains.
    pub async fn get_tickets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Ticket>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.conn
            .call(move |conn| {
                let placeholders = id_strings.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!("{TICKET_SELECT} WHERE id IN ({placeholders})");
                let mut stmt = conn.prepare(&sql)?;
                let params: Vec<&dyn rusqlite::ToSql> = id_strings.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
                let rows = stmt.query_map(params.as_slice(), row_to_ticket)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// Whether any workflow has ticket tracking configured at all, i.e.
    /// whether the system has ticket tracking enabled globally.
    pub async fn any_board_config_exists(&self) -> Result<bool> {
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM board_configs", [], |row| row.get(0))?;
                Ok(count > 0)
            })
            .await
            .map_err(Into::into)
    }

    /// Most recently created tasks across all workflows (clarification
    /// arbitrator context).
    pub async fn list_recent_tasks(&self, limit: i64) -> Result<Vec<Task>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("{TASK_SELECT} ORDER BY created_at DESC LIMIT ?1"))?;
                let rows = stmt.query_map(rusqlite::params![limit], row_to_task)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// Full-text candidates via FTS5, ranked by `bm25`. Callers combine this
    /// with a semantic ranking pass to produce the hybrid score.
    pub async fn search_tickets_fulltext(&self, workflow_id: Uuid, query: &str, limit: i64) -> Result<Vec<(Ticket, f64)>> {
        let workflow_id = workflow_id.to_string();
        let query = query.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT t.id, t.workflow_id, t.title, t.description, t.ticket_type, t.priority,
                            t.status, t.approval_status, t.parent_ticket_id, t.blocked_by_ticket_ids,
                            t.is_resolved, t.created_by_agent_id, t.assigned_agent_id, t.tags,
                            t.embedding, t.created_at, t.updated_at, bm25(tickets_fts) as rank
                     FROM tickets t
                     JOIN tickets_fts ON tickets_fts.rowid = t.rowid
                     WHERE tickets_fts MATCH ?1 AND t.workflow_id = ?2
                     ORDER BY rank LIMIT ?3",
                )?;
                let rows = stmt.query_map(rusqlite::params![query, workflow_id, limit], |row| {
                    let ticket = row_to_ticket(row)?;
                    let rank: f64 = row.get(17)?;
                    Ok((ticket, rank))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn insert_ticket_comment(&self, comment: &TicketComment) -> Result<()> {
        let comment = comment.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO ticket_comments (id, ticket_id, author_agent_id, comment_text, comment_type, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    rusqlite::params![
                        comment.id.to_string(),
                        comment.ticket_id.to_string(),
                        comment.author_agent_id.map(|v| v.to_string()),
                        comment.comment_text,
                        comment.comment_type,
                        dt_to_sql(&comment.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_ticket_comments(&self, ticket_id: Uuid) -> Result<Vec<TicketComment>> {
        let ticket_id = ticket_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, ticket_id, author_agent_id, comment_text, comment_type, created_at
                     FROM ticket_comments WHERE ticket_id = ?1 ORDER BY created_at ASC",
                )?;
                let rows = stmt.query_map(rusqlite::params![ticket_id], |row| {
                    Ok(TicketComment {
                        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
                        ticket_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
                        author_agent_id: row.get::<_, Option<String>>(2)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
                        comment_text: row.get(3)?,
                        comment_type: row.get(4)?,
                        created_at: dt_from_sql(&row.get::<_, String>(5)?),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn insert_ticket_history(&self, entry: &TicketHistory) -> Result<()> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO ticket_history (id, ticket_id, change_type, old_value, new_value, description, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)",
                    rusqlite::params![
                        entry.id.to_string(),
                        entry.ticket_id.to_string(),
                        entry.change_type,
                        entry.old_value.as_ref().map(|v| v.to_string()),
                        entry.new_value.as_ref().map(|v| v.to_string()),
                        entry.description,
                        dt_to_sql(&entry.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_ticket_commit(&self, link: &TicketCommit) -> Result<()> {
        let link = link.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO ticket_commits (id, ticket_id, commit_sha, created_at) VALUES (?1,?2,?3,?4)",
                    rusqlite::params![link.id.to_string(), link.ticket_id.to_string(), link.commit_sha, dt_to_sql(&link.created_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn upsert_board_config(&self, cfg: &BoardConfig) -> Result<()> {
        let cfg = cfg.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO board_configs (workflow_id, columns, allowed_types, initial_status, ticket_human_review, approval_timeout_seconds)
                     VALUES (?1,?2,?3,?4,?5,?6)
                     ON CONFLICT(workflow_id) DO UPDATE SET
                        columns=excluded.columns, allowed_types=excluded.allowed_types,
                        initial_status=excluded.initial_status, ticket_human_review=excluded.ticket_human_review,
                        approval_timeout_seconds=excluded.approval_timeout_seconds",
                    rusqlite::params![
                        cfg.workflow_id.to_string(),
                        json_to_sql(&cfg.columns),
                        json_to_sql(&cfg.allowed_types),
                        cfg.initial_status,
                        cfg.ticket_human_review,
                        cfg.approval_timeout_seconds,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_board_config(&self, workflow_id: Uuid) -> Result<Option<BoardConfig>> {
        let workflow_id = workflow_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT workflow_id, columns, allowed_types, initial_status, ticket_human_review, approval_timeout_seconds
                     FROM board_configs WHERE workflow_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![workflow_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(BoardConfig {
                        workflow_id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
                        columns: json_from_sql(&row.get::<_, String>(1)?),
                        allowed_types: json_from_sql(&row.get::<_, String>(2)?),
                        initial_status: row.get(3)?,
                        ticket_human_review: row.get(4)?,
                        approval_timeout_seconds: row.get(5)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    // -----------------------------------------------------------------------
    // Memory
    // -----------------------------------------------------------------------

    pub async fn insert_memory(&self, memory: &Memory) -> Result<()> {
        let memory = memory.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memories (id, agent_id, content, memory_type, embedding_id, tags, related_files, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        memory.id.to_string(),
                        memory.agent_id.to_string(),
                        memory.content,
                        enum_to_sql(&memory.memory_type),
                        memory.embedding_id,
                        json_to_sql(&memory.tags),
                        json_to_sql(&memory.related_files),
                        dt_to_sql(&memory.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_memories_for_agent(&self, agent_id: Uuid) -> Result<Vec<Memory>> {
        let agent_id = agent_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, agent_id, content, memory_type, embedding_id, tags, related_files, created_at
                     FROM memories WHERE agent_id = ?1 ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map(rusqlite::params![agent_id], |row| {
                    Ok(Memory {
                        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
                        agent_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
                        content: row.get(2)?,
                        memory_type: enum_from_sql(&row.get::<_, String>(3)?),
                        embedding_id: row.get(4)?,
                        tags: json_from_sql(&row.get::<_, String>(5)?),
                        related_files: json_from_sql(&row.get::<_, String>(6)?),
                        created_at: dt_from_sql(&row.get::<_, String>(7)?),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    /// Most recent memories across all agents, newest first. Used by
    /// TaskService to assemble project context for task enrichment when no
    /// single agent scope applies.
    pub async fn list_recent_memories(&self, limit: i64) -> Result<Vec<Memory>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, agent_id, content, memory_type, embedding_id, tags, related_files, created_at
                     FROM memories ORDER BY created_at DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(rusqlite::params![limit], |row| {
                    Ok(Memory {
                        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
                        agent_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
                        content: row.get(2)?,
                        memory_type: enum_from_sql(&row.get::<_, String>(3)?),
                        embedding_id: row.get(4)?,
                        tags: json_from_sql(&row.get::<_, String>(5)?),
                        related_files: json_from_sql(&row.get::<_, String>(6)?),
                        created_at: dt_from_sql(&row.get::<_, String>(7)?),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    // -----------------------------------------------------------------------
    // Results, validation review, monitoring entities (insert + task/workflow lookup)
    // -----------------------------------------------------------------------

    pub async fn insert_agent_result(&self, result: &AgentResult) -> Result<()> {
        let result = result.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO agent_results
                        (id, task_id, agent_id, markdown_file_path, result_type, summary,
                         extra_files, validation_status, validation_feedback, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                    rusqlite::params![
                        result.id.to_string(),
                        result.task_id.to_string(),
                        result.agent_id.to_string(),
                        result.markdown_file_path,
                        result.result_type,
                        result.summary,
                        json_to_sql(&result.extra_files),
                        enum_to_sql(&result.validation_status),
                        result.validation_feedback,
                        dt_to_sql(&result.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_agent_result(&self, id: Uuid) -> Result<Option<AgentResult>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, task_id, agent_id, markdown_file_path, result_type, summary,
                            extra_files, validation_status, validation_feedback, created_at
                     FROM agent_results WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_agent_result(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn list_agent_results_for_task(&self, task_id: Uuid) -> Result<Vec<AgentResult>> {
        let task_id = task_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, task_id, agent_id, markdown_file_path, result_type, summary,
                            extra_files, validation_status, validation_feedback, created_at
                     FROM agent_results WHERE task_id = ?1",
                )?;
                let rows = stmt.query_map(rusqlite::params![task_id], row_to_agent_result)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(Into::into)
    }

    pub async fn update_agent_result_status(&self, id: Uuid, status: ResultValidationStatus, feedback: Option<String>) -> Result<()> {
        let id = id.to_string();
        let status = enum_to_sql(&status);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE agent_results SET validation_status = ?1, validation_feedback = ?2 WHERE id = ?3",
                    rusqlite::params![status, feedback, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_workflow_result(&self, result: &WorkflowResult) -> Result<()> {
        let result = result.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_results
                        (id, workflow_id, agent_id, markdown_file_path, explanation,
                         validation_status, validation_feedback, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        result.id.to_string(),
                        result.workflow_id.to_string(),
                        result.agent_id.to_string(),
                        result.markdown_file_path,
                        result.explanation,
                        enum_to_sql(&result.validation_status),
                        result.validation_feedback,
                        dt_to_sql(&result.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_workflow_result(&self, id: Uuid) -> Result<Option<WorkflowResult>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, agent_id, markdown_file_path, explanation,
                            validation_status, validation_feedback, created_at
                     FROM workflow_results WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_workflow_result(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Into::into)
    }

    pub async fn insert_validation_review(&self, review: &crate::types::ValidationReview) -> Result<()> {
        let review = review.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO validation_reviews (id, task_id, validator_agent_id, iteration, passed, feedback, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)",
                    rusqlite::params![
                        review.id.to_string(),
                        review.task_id.to_string(),
                        review.validator_agent_id.to_string(),
                        review.iteration,
                        review.passed,
                        review.feedback,
                        dt_to_sql(&review.created_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_phase_execution(&self, pe: &PhaseExecution) -> Result<()> {
        let pe = pe.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO phase_executions (id, phase_id, workflow_id, \"order\", status, created_at, started_at, completed_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        pe.id.to_string(),
                        pe.phase_id.to_string(),
                        pe.workflow_id.to_string(),
                        pe.order,
                        enum_to_sql(&pe.status),
                        dt_to_sql(&pe.created_at),
                        opt_dt_to_sql(&pe.started_at),
                        opt_dt_to_sql(&pe.completed_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_steering_intervention(&self, s: &SteeringIntervention) -> Result<()> {
        let s = s.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO steering_interventions (id, agent_id, task_id, reason, action_taken, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    rusqlite::params![s.id.to_string(), s.agent_id.to_string(), s.task_id.to_string(), s.reason, s.action_taken, dt_to_sql(&s.created_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_guardian_analysis(&self, g: &GuardianAnalysis) -> Result<()> {
        let g = g.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO guardian_analyses (id, agent_id, verdict, notes, created_at) VALUES (?1,?2,?3,?4,?5)",
                    rusqlite::params![g.id.to_string(), g.agent_id.to_string(), g.verdict, g.notes, dt_to_sql(&g.created_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_conductor_analysis(&self, c: &crate::types::ConductorAnalysis) -> Result<()> {
        let c = c.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conductor_analyses (id, workflow_id, notes, created_at) VALUES (?1,?2,?3,?4)",
                    rusqlite::params![c.id.to_string(), c.workflow_id.to_string(), c.notes, dt_to_sql(&c.created_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

const TASK_SELECT: &str = "SELECT id, raw_description, enriched_description, done_definition, status, priority, \
    priority_boosted, assigned_agent_id, created_by_agent_id, parent_task_id, phase_id, workflow_id, ticket_id, \
    validation_enabled, validation_iteration, last_validation_feedback, embedding, duplicate_of_task_id, \
    similarity_score, queued_at, completed_at, failure_reason, completion_notes, estimated_complexity, \
    created_at, updated_at FROM tasks";

const AGENT_SELECT: &str = "SELECT id, system_prompt, status, cli_type, cli_model, tmux_session_name, \
    current_task_id, agent_type, kept_alive_for_validation, last_activity, health_check_failures, created_at \
    FROM agents";

const TICKET_SELECT: &str = "SELECT id, workflow_id, title, description, ticket_type, priority, status, \
    approval_status, parent_ticket_id, blocked_by_ticket_ids, is_resolved, created_by_agent_id, \
    assigned_agent_id, tags, embedding, created_at, updated_at FROM tickets";

fn row_to_execution(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowExecution> {
    Ok(WorkflowExecution {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        definition_id: row.get(1)?,
        description: row.get(2)?,
        working_directory: row.get(3)?,
        launch_params: json_from_sql(&row.get::<_, String>(4)?),
        status: enum_from_sql(&row.get::<_, String>(5)?),
        result_found: row.get(6)?,
        result_id: row.get::<_, Option<String>>(7)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        completed_by_result: row.get(8)?,
        created_at: dt_from_sql(&row.get::<_, String>(9)?),
        updated_at: dt_from_sql(&row.get::<_, String>(10)?),
    })
}

fn row_to_phase(row: &rusqlite::Row<'_>) -> rusqlite::Result<Phase> {
    Ok(Phase {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        workflow_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
        order: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        done_definitions: json_from_sql(&row.get::<_, String>(5)?),
        additional_notes: row.get(6)?,
        outputs: json_from_sql(&row.get::<_, String>(7)?),
        next_steps: json_from_sql(&row.get::<_, String>(8)?),
        working_directory: row.get(9)?,
        validation: row.get::<_, Option<String>>(10)?.map(|s| json_from_sql::<PhaseValidationConfig>(&s)),
        cli_overrides: json_from_sql(&row.get::<_, String>(11)?),
        execution_status: enum_from_sql(&row.get::<_, String>(12)?),
        created_at: dt_from_sql(&row.get::<_, String>(13)?),
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        raw_description: row.get(1)?,
        enriched_description: row.get(2)?,
        done_definition: row.get(3)?,
        status: enum_from_sql(&row.get::<_, String>(4)?),
        priority: enum_from_sql(&row.get::<_, String>(5)?),
        priority_boosted: row.get(6)?,
        assigned_agent_id: row.get::<_, Option<String>>(7)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        created_by_agent_id: row.get::<_, Option<String>>(8)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        parent_task_id: row.get::<_, Option<String>>(9)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        phase_id: row.get::<_, Option<String>>(10)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        workflow_id: Uuid::parse_str(&row.get::<_, String>(11)?).expect("valid uuid"),
        ticket_id: row.get::<_, Option<String>>(12)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        validation_enabled: row.get(13)?,
        validation_iteration: row.get(14)?,
        last_validation_feedback: row.get(15)?,
        embedding: row.get::<_, Option<String>>(16)?.map(|s| json_from_sql(&s)),
        duplicate_of_task_id: row.get::<_, Option<String>>(17)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        similarity_score: row.get(18)?,
        queued_at: opt_dt_from_sql(row.get(19)?),
        completed_at: opt_dt_from_sql(row.get(20)?),
        failure_reason: row.get(21)?,
        completion_notes: row.get(22)?,
        estimated_complexity: row.get(23)?,
        created_at: dt_from_sql(&row.get::<_, String>(24)?),
        updated_at: dt_from_sql(&row.get::<_, String>(25)?),
    })
}

fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        system_prompt: row.get(1)?,
        status: enum_from_sql(&row.get::<_, String>(2)?),
        cli_type: enum_from_sql::<CliType>(&row.get::<_, String>(3)?),
        cli_model: row.get(4)?,
        tmux_session_name: row.get(5)?,
        current_task_id: row.get::<_, Option<String>>(6)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        agent_type: enum_from_sql::<AgentKind>(&row.get::<_, String>(7)?),
        kept_alive_for_validation: row.get(8)?,
        last_activity: dt_from_sql(&row.get::<_, String>(9)?),
        health_check_failures: row.get(10)?,
        created_at: dt_from_sql(&row.get::<_, String>(11)?),
    })
}

fn row_to_worktree(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentWorktree> {
    Ok(AgentWorktree {
        agent_id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        worktree_path: row.get(1)?,
        branch_name: row.get(2)?,
        parent_agent_id: row.get::<_, Option<String>>(3)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        parent_commit_sha: row.get(4)?,
        base_commit_sha: row.get(5)?,
        merge_status: enum_from_sql::<MergeStatus>(&row.get::<_, String>(6)?),
        merge_commit_sha: row.get(7)?,
        created_at: dt_from_sql(&row.get::<_, String>(8)?),
    })
}

fn row_to_agent_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentResult> {
    Ok(AgentResult {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        task_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
        agent_id: Uuid::parse_str(&row.get::<_, String>(2)?).expect("valid uuid"),
        markdown_file_path: row.get(3)?,
        result_type: row.get(4)?,
        summary: row.get(5)?,
        extra_files: json_from_sql(&row.get::<_, String>(6)?),
        validation_status: enum_from_sql::<ResultValidationStatus>(&row.get::<_, String>(7)?),
        validation_feedback: row.get(8)?,
        created_at: dt_from_sql(&row.get::<_, String>(9)?),
    })
}

fn row_to_workflow_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowResult> {
    Ok(WorkflowResult {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        workflow_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
        agent_id: Uuid::parse_str(&row.get::<_, String>(2)?).expect("valid uuid"),
        markdown_file_path: row.get(3)?,
        explanation: row.get(4)?,
        validation_status: enum_from_sql::<ResultValidationStatus>(&row.get::<_, String>(5)?),
        validation_feedback: row.get(6)?,
        created_at: dt_from_sql(&row.get::<_, String>(7)?),
    })
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).expect("valid uuid"),
        workflow_id: Uuid::parse_str(&row.get::<_, String>(1)?).expect("valid uuid"),
        title: row.get(2)?,
        description: row.get(3)?,
        ticket_type: row.get(4)?,
        priority: enum_from_sql::<TaskPriority>(&row.get::<_, String>(5)?),
        status: row.get(6)?,
        approval_status: enum_from_sql::<ApprovalStatus>(&row.get::<_, String>(7)?),
        parent_ticket_id: row.get::<_, Option<String>>(8)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        blocked_by_ticket_ids: json_from_sql(&row.get::<_, String>(9)?),
        is_resolved: row.get(10)?,
        created_by_agent_id: row.get::<_, Option<String>>(11)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        assigned_agent_id: row.get::<_, Option<String>>(12)?.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        tags: json_from_sql(&row.get::<_, String>(13)?),
        embedding: row.get::<_, Option<String>>(14)?.map(|s| json_from_sql(&s)),
        created_at: dt_from_sql(&row.get::<_, String>(15)?),
        updated_at: dt_from_sql(&row.get::<_, String>(16)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentKind, CliType, TaskPriority};

    #[tokio::test]
    async fn workflow_definition_roundtrip() {
        let store = Store::new_in_memory().await.unwrap();
        let def = WorkflowDefinition {
            id: "wf-1".into(),
            name: "demo".into(),
            description: "desc".into(),
            phases_config: vec![],
            workflow_config: WorkflowConfig {
                has_result: false,
                result_criteria: vec![],
                on_result_found: crate::types::OnResultFound::StopAll,
                enable_tickets: false,
                board_config: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.upsert_workflow_definition(&def).await.unwrap();
        let fetched = store.get_workflow_definition("wf-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
    }

    #[tokio::test]
    async fn task_queue_ordering_honors_priority_boost_then_fifo() {
        let store = Store::new_in_memory().await.unwrap();
        let workflow_id = Uuid::new_v4();

        let mut low = Task::new(workflow_id, "low", "done");
        low.status = TaskStatus::Queued;
        low.queued_at = Some(Utc::now());
        store.upsert_task(&low).await.unwrap();

        let mut boosted = Task::new(workflow_id, "boosted", "done");
        boosted.status = TaskStatus::Queued;
        boosted.priority_boosted = true;
        boosted.queued_at = Some(Utc::now());
        store.upsert_task(&boosted).await.unwrap();

        let queue = store.list_queued_tasks_by_priority().await.unwrap();
        assert_eq!(queue[0].id, boosted.id);
    }

    #[tokio::test]
    async fn ticket_fulltext_search_matches_title() {
        let store = Store::new_in_memory().await.unwrap();
        let workflow_id = Uuid::new_v4();
        let ticket = Ticket::new(workflow_id, "fix login bug", "users cannot log in", "bug", TaskPriority::High, "backlog", false);
        store.upsert_ticket(&ticket).await.unwrap();

        let results = store.search_tickets_fulltext(workflow_id, "login", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, ticket.id);
    }

    #[tokio::test]
    async fn agent_log_tail_preserves_chronological_order() {
        let store = Store::new_in_memory().await.unwrap();
        let agent_id = Uuid::new_v4();
        for i in 0..3 {
            store
                .append_agent_log(&AgentLogEntry { id: Uuid::new_v4(), agent_id, line: format!("line {i}"), created_at: Utc::now() })
                .await
                .unwrap();
        }
        let lines = store.tail_agent_log(agent_id, 10).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, "line 0");
        assert_eq!(lines[2].line, "line 2");
    }

    #[tokio::test]
    async fn agent_worktree_merge_status_updates() {
        let store = Store::new_in_memory().await.unwrap();
        let agent_id = Uuid::new_v4();
        let wt = AgentWorktree {
            agent_id,
            worktree_path: "/tmp/wt".into(),
            branch_name: format!("agent/{agent_id}"),
            parent_agent_id: None,
            parent_commit_sha: None,
            base_commit_sha: "deadbeef".into(),
            merge_status: MergeStatus::Active,
            merge_commit_sha: None,
            created_at: Utc::now(),
        };
        store.upsert_agent_worktree(&wt).await.unwrap();

        let mut merged = wt.clone();
        merged.merge_status = MergeStatus::Merged;
        merged.merge_commit_sha = Some("cafebabe".into());
        store.upsert_agent_worktree(&merged).await.unwrap();

        let fetched = store.get_agent_worktree(agent_id).await.unwrap().unwrap();
        assert_eq!(fetched.merge_status, MergeStatus::Merged);
        assert_eq!(fetched.merge_commit_sha.as_deref(), Some("cafebabe"));
    }

    #[tokio::test]
    async fn agent_roundtrip_preserves_cli_type() {
        let store = Store::new_in_memory().await.unwrap();
        let agent = Agent::new(CliType::Codex, "hp-agent-1", AgentKind::Phase);
        store.upsert_agent(&agent).await.unwrap();
        let fetched = store.get_agent(agent.id).await.unwrap().unwrap();
        assert_eq!(fetched.cli_type, CliType::Codex);
    }

    #[tokio::test]
    async fn list_agent_results_for_task_filters_by_task() {
        let store = Store::new_in_memory().await.unwrap();
        let task_id = Uuid::new_v4();
        let other_task_id = Uuid::new_v4();

        let mine = AgentResult {
            id: Uuid::new_v4(),
            task_id,
            agent_id: Uuid::new_v4(),
            markdown_file_path: "result.md".into(),
            result_type: "summary".into(),
            summary: "did the thing".into(),
            extra_files: vec![],
            validation_status: ResultValidationStatus::Pending,
            validation_feedback: None,
            created_at: Utc::now(),
        };
        let mut other = mine.clone();
        other.id = Uuid::new_v4();
        other.task_id = other_task_id;

        store.insert_agent_result(&mine).await.unwrap();
        store.insert_agent_result(&other).await.unwrap();

        let results = store.list_agent_results_for_task(task_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, mine.id);
    }
}
