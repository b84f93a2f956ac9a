//! WorktreeEngine (S3): per-agent git worktree isolation, parent-checkpoint
//! inheritance, and newest-file-wins conflict resolution on merge back to
//! the base branch.
//!
//! Reads go through [`crate::git_read_adapter`] (libgit2 when available);
//! every write shells out to the `git` binary through the [`GitRunner`]
//! trait so tests can mock it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::git_read_adapter::{default_read_adapter, GitReadAdapter};
use crate::store::Store;
use crate::types::{AgentWorktree, MergeConflictResolution, MergeStatus, ResolutionChoice};

#[derive(Debug, Error)]
pub enum WorktreeManagerError {
    #[error("git command failed: {0}")]
    GitCommand(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("no worktree found for agent {0}")]
    NotFound(String),
    #[error("timed out acquiring merge lock for agent {0}")]
    LockTimeout(String),
}

pub type Result<T> = std::result::Result<T, WorktreeManagerError>;

// ---------------------------------------------------------------------------
// GitRunner trait (for testability)
// ---------------------------------------------------------------------------

pub trait GitRunner: Send + Sync {
    fn run_git(&self, dir: &str, args: &[&str]) -> std::result::Result<GitOutput, String>;
}

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub struct RealGitRunner;

impl GitRunner for RealGitRunner {
    fn run_git(&self, dir: &str, args: &[&str]) -> std::result::Result<GitOutput, String> {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| e.to_string())?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn git_ok(out: std::result::Result<GitOutput, String>) -> Result<GitOutput> {
    match out {
        Ok(o) if o.success => Ok(o),
        Ok(o) => Err(WorktreeManagerError::GitCommand(o.stderr)),
        Err(e) => Err(WorktreeManagerError::GitCommand(e)),
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatusOutcome {
    Success,
    ConflictResolved,
    UpToDate,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub status: MergeStatusOutcome,
    pub merge_commit_sha: Option<String>,
    pub conflicts_resolved: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationCommit {
    pub commit_sha: String,
    pub files_changed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceChanges {
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_deleted: Vec<String>,
    pub detailed_diff: String,
}

#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    pub disk_usage_mb: u64,
}

// ---------------------------------------------------------------------------
// WorktreeManager
// ---------------------------------------------------------------------------

pub struct WorktreeManager {
    main_repo_path: PathBuf,
    worktree_base_path: PathBuf,
    branch_prefix: String,
    base_branch: String,
    store: Arc<Store>,
    git: Box<dyn GitRunner>,
    git_read: Box<dyn GitReadAdapter>,
    merge_lock: Mutex<()>,
}

impl WorktreeManager {
    pub fn new(
        main_repo_path: impl Into<PathBuf>,
        worktree_base_path: impl Into<PathBuf>,
        branch_prefix: impl Into<String>,
        base_branch: impl Into<String>,
        store: Arc<Store>,
    ) -> Self {
        Self::with_git_runner(
            main_repo_path,
            worktree_base_path,
            branch_prefix,
            base_branch,
            store,
            Box::new(RealGitRunner),
        )
    }

    pub fn with_git_runner(
        main_repo_path: impl Into<PathBuf>,
        worktree_base_path: impl Into<PathBuf>,
        branch_prefix: impl Into<String>,
        base_branch: impl Into<String>,
        store: Arc<Store>,
        git: Box<dyn GitRunner>,
    ) -> Self {
        Self {
            main_repo_path: main_repo_path.into(),
            worktree_base_path: worktree_base_path.into(),
            branch_prefix: branch_prefix.into(),
            base_branch: base_branch.into(),
            store,
            git,
            git_read: default_read_adapter(),
            merge_lock: Mutex::new(()),
        }
    }

    fn main_repo_str(&self) -> String {
        self.main_repo_path.to_string_lossy().to_string()
    }

    fn head_sha(&self, dir: &str) -> Result<String> {
        git_ok(self.git.run_git(dir, &["rev-parse", "HEAD"])).map(|o| o.stdout.trim().to_string())
    }

    /// Create the isolated worktree for an agent. Resolves the base commit
    /// with the priority order: explicit `base_commit_sha` > parent's latest
    /// (checkpointing the parent first) > current `base_branch` HEAD.
    pub async fn create_agent_worktree(
        &self,
        agent_id: Uuid,
        parent_agent_id: Option<Uuid>,
        base_commit_sha: Option<String>,
    ) -> Result<AgentWorktree> {
        let main_repo = self.main_repo_str();

        let resolved_base = if let Some(sha) = base_commit_sha {
            sha
        } else if let Some(parent_id) = parent_agent_id {
            match self.prepare_parent_commit(parent_id).await? {
                Some(sha) => sha,
                None => self.head_sha(&main_repo)?,
            }
        } else {
            self.head_sha(&main_repo)?
        };

        let branch_name = format!("{}{}", self.branch_prefix, agent_id);
        let worktree_path = self.worktree_base_path.join(format!("wt_{agent_id}"));
        let worktree_path_str = worktree_path.to_string_lossy().to_string();

        info!(agent_id = %agent_id, branch = %branch_name, base_commit = %resolved_base, "creating agent worktree");

        match self.git.run_git(&main_repo, &["branch", &branch_name, &resolved_base]) {
            Ok(o) if o.success => {}
            Ok(o) if o.stderr.contains("already exists") => {
                git_ok(self.git.run_git(&main_repo, &["branch", "-D", &branch_name]))?;
                git_ok(self.git.run_git(&main_repo, &["branch", &branch_name, &resolved_base]))?;
            }
            other => return git_ok(other).map(|_| unreachable!()),
        }

        match self.git.run_git(&main_repo, &["worktree", "add", &worktree_path_str, &branch_name]) {
            Ok(o) if o.success => {}
            Ok(o) if o.stderr.contains("already exists") => {
                self.force_remove_worktree_dir(&worktree_path);
                git_ok(self.git.run_git(&main_repo, &["worktree", "add", &worktree_path_str, &branch_name]))?;
            }
            other => return git_ok(other).map(|_| unreachable!()),
        }

        let worktree = AgentWorktree {
            agent_id,
            worktree_path: worktree_path_str,
            branch_name,
            parent_agent_id,
            parent_commit_sha: Some(resolved_base.clone()),
            base_commit_sha: resolved_base,
            merge_status: MergeStatus::Active,
            merge_commit_sha: None,
            created_at: Utc::now(),
        };
        self.store.upsert_agent_worktree(&worktree).await?;
        Ok(worktree)
    }

    /// Checkpoint-commit the parent's worktree if dirty, returning the SHA
    /// the child should branch from.
    async fn prepare_parent_commit(&self, parent_id: Uuid) -> Result<Option<String>> {
        let parent = match self.store.get_agent_worktree(parent_id).await? {
            Some(w) => w,
            None => return Ok(None),
        };

        let dirty = !self.git_read.status_porcelain(&parent.worktree_path).unwrap_or_default().is_empty();
        if dirty {
            git_ok(self.git.run_git(&parent.worktree_path, &["add", "-A"]))?;
            let msg = format!("[Agent {parent_id}] Checkpoint before spawning child");
            git_ok(self.git.run_git(&parent.worktree_path, &["commit", "-m", &msg, "--no-verify"]))?;
        }
        Ok(Some(self.head_sha(&parent.worktree_path)?))
    }

    /// Merge `base_branch` into the agent's branch so it has the latest
    /// trunk changes before starting work (including restarts).
    pub async fn merge_main_into_branch(&self, agent_id: Uuid) -> Result<MergeOutcome> {
        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or_else(|| WorktreeManagerError::NotFound(agent_id.to_string()))?;
        let main_repo = self.main_repo_str();

        let base_commit = self.head_sha(&main_repo)?;
        if self.head_sha(&worktree.worktree_path)? == base_commit {
            return Ok(MergeOutcome { status: MergeStatusOutcome::UpToDate, merge_commit_sha: Some(base_commit), conflicts_resolved: vec![] });
        }

        let msg = format!("[Auto-Merge] Merged {} into {} for agent {agent_id}", self.base_branch, worktree.branch_name);
        let merge = self.git.run_git(&worktree.worktree_path, &["merge", "--no-ff", "-m", &msg, &base_commit]);

        match merge {
            Ok(o) if o.success => {
                let sha = self.head_sha(&worktree.worktree_path)?;
                Ok(MergeOutcome { status: MergeStatusOutcome::Success, merge_commit_sha: Some(sha), conflicts_resolved: vec![] })
            }
            Ok(o) if o.stderr.contains("CONFLICT") || o.stdout.contains("CONFLICT") => {
                let conflicts = self.resolve_conflicts_newest_wins(agent_id, &worktree.worktree_path, &main_repo).await?;
                let commit_msg = format!("[Auto-Merge] Resolved conflicts merging {} into {}", self.base_branch, worktree.branch_name);
                git_ok(self.git.run_git(&worktree.worktree_path, &["commit", "-m", &commit_msg, "--no-verify"]))?;
                let sha = self.head_sha(&worktree.worktree_path)?;
                Ok(MergeOutcome { status: MergeStatusOutcome::ConflictResolved, merge_commit_sha: Some(sha), conflicts_resolved: conflicts })
            }
            other => Err(git_ok(other).unwrap_err()),
        }
    }

    /// Stage and commit all pending changes in the agent's worktree as a
    /// checkpoint ready for validator examination.
    pub async fn commit_for_validation(&self, agent_id: Uuid, iteration: i64, message: Option<&str>) -> Result<ValidationCommit> {
        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or_else(|| WorktreeManagerError::NotFound(agent_id.to_string()))?;

        git_ok(self.git.run_git(&worktree.worktree_path, &["add", "-A"]))?;
        let dirty = !self.git_read.status_porcelain(&worktree.worktree_path).unwrap_or_default().is_empty();
        if !dirty {
            return Ok(ValidationCommit { commit_sha: self.head_sha(&worktree.worktree_path)?, files_changed: 0 });
        }

        let commit_message = message
            .map(|m| format!("[Agent {agent_id}] {m}"))
            .unwrap_or_else(|| format!("[Agent {agent_id}] Iteration {iteration} - Ready for validation"));
        git_ok(self.git.run_git(&worktree.worktree_path, &["commit", "-m", &commit_message, "--no-verify"]))?;

        let stat = self.git_read.diff_stat(&worktree.worktree_path, "HEAD~1", "HEAD").unwrap_or_default();
        let files_changed = stat.lines().filter(|l| l.contains('|')).count();
        Ok(ValidationCommit { commit_sha: self.head_sha(&worktree.worktree_path)?, files_changed })
    }

    /// Merge an agent's branch back into `base_branch` with automatic
    /// newest-file-wins conflict resolution (P6). Serialized by an
    /// in-process lock since a single daemon owns the main repository.
    pub async fn merge_to_parent(&self, agent_id: Uuid) -> Result<MergeOutcome> {
        let _guard = tokio::time::timeout(Duration::from_secs(300), self.merge_lock.lock())
            .await
            .map_err(|_| WorktreeManagerError::LockTimeout(agent_id.to_string()))?;

        info!(agent_id = %agent_id, "merge_to_parent: lock acquired");

        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or_else(|| WorktreeManagerError::NotFound(agent_id.to_string()))?;
        let main_repo = self.main_repo_str();

        self.complete_stuck_merge(agent_id).await?;

        if !self.git_read.status_porcelain(&worktree.worktree_path).unwrap_or_default().is_empty() {
            git_ok(self.git.run_git(&worktree.worktree_path, &["add", "-A"]))?;
            let msg = format!("[Agent {agent_id}] Final - Task completed");
            git_ok(self.git.run_git(&worktree.worktree_path, &["commit", "-m", &msg, "--no-verify"]))?;
        }

        let main_dirty = !self.git_read.status_porcelain(&main_repo).unwrap_or_default().is_empty();
        let mut stashed = false;
        if main_dirty {
            warn!(agent_id = %agent_id, "main repo has uncommitted changes, stashing before merge");
            let stash_msg = format!("Auto-stash before merge for agent {agent_id}");
            if git_ok(self.git.run_git(&main_repo, &["stash", "push", "-u", "-m", &stash_msg])).is_ok() {
                stashed = true;
            }
        }

        git_ok(self.git.run_git(&main_repo, &["checkout", &self.base_branch]))?;

        let merge_msg = format!("Merge agent {agent_id} work into {}", self.base_branch);
        let merge = self.git.run_git(&main_repo, &["merge", "--no-ff", "-m", &merge_msg, &worktree.branch_name]);

        let outcome = match merge {
            Ok(o) if o.success => {
                let sha = self.head_sha(&main_repo)?;
                MergeOutcome { status: MergeStatusOutcome::Success, merge_commit_sha: Some(sha), conflicts_resolved: vec![] }
            }
            Ok(o) if o.stderr.contains("CONFLICT") || o.stdout.contains("CONFLICT") => {
                let conflicts = self.resolve_conflicts_newest_wins(agent_id, &main_repo, &worktree.worktree_path).await?;
                let commit_msg = "[Auto-Merge] Resolved conflicts using newest_file_wins";
                git_ok(self.git.run_git(&main_repo, &["commit", "-m", commit_msg, "--no-verify"]))?;
                let sha = self.head_sha(&main_repo)?;
                MergeOutcome { status: MergeStatusOutcome::ConflictResolved, merge_commit_sha: Some(sha), conflicts_resolved: conflicts }
            }
            other => {
                if stashed {
                    let _ = self.git.run_git(&main_repo, &["stash", "pop"]);
                }
                return Err(git_ok(other).unwrap_err());
            }
        };

        let mut updated = worktree.clone();
        updated.merge_status = MergeStatus::Merged;
        updated.merge_commit_sha = outcome.merge_commit_sha.clone();
        self.store.upsert_agent_worktree(&updated).await?;

        if stashed {
            if let Err(e) = git_ok(self.git.run_git(&main_repo, &["stash", "pop"])) {
                warn!(agent_id = %agent_id, error = %e, "stash pop had issues, may need manual resolution");
            }
        }

        info!(agent_id = %agent_id, status = ?outcome.status, "merge_to_parent complete");
        Ok(outcome)
    }

    /// Detects and recovers an interrupted merge left behind in the main
    /// repository (a `MERGE_HEAD` file with no completing commit), so agent
    /// work is never silently lost.
    async fn complete_stuck_merge(&self, agent_id: Uuid) -> Result<()> {
        let merge_head = self.main_repo_path.join(".git").join("MERGE_HEAD");
        if !merge_head.exists() {
            return Ok(());
        }
        warn!(agent_id = %agent_id, "stuck merge detected in main repo, recovering");

        let main_repo = self.main_repo_str();
        let unresolved = self.git_read.conflict_files(&main_repo).unwrap_or_default();

        for file_path in &unresolved {
            self.resolve_one_conflict_newest_wins(&main_repo, &main_repo, "STUCK_MERGE_RECOVERY", file_path).await?;
        }

        let still_unresolved = self.git_read.conflict_files(&main_repo).unwrap_or_default();
        for file_path in &still_unresolved {
            let _ = self.git.run_git(&main_repo, &["add", file_path]);
        }

        let merge_head_sha = std::fs::read_to_string(&merge_head).unwrap_or_default();
        let short = merge_head_sha.trim().get(0..8).unwrap_or("unknown");
        let commit_msg = format!("[Auto-Recovery] Completed stuck merge from {short}");
        git_ok(self.git.run_git(&main_repo, &["commit", "-m", &commit_msg, "--no-verify"]))?;
        Ok(())
    }

    /// Resolve every conflicted file between `target_dir` (ours) and
    /// `source_dir` (theirs) using newest-file-wins (P6), aborting the
    /// in-progress merge first.
    async fn resolve_conflicts_newest_wins(&self, agent_id: Uuid, target_dir: &str, source_label_dir: &str) -> Result<Vec<String>> {
        let conflicts = self.git_read.conflict_files(target_dir).unwrap_or_default();
        let mut resolved = Vec::with_capacity(conflicts.len());
        for file_path in &conflicts {
            self.resolve_one_conflict_newest_wins(target_dir, source_label_dir, &agent_id.to_string(), file_path).await?;
            resolved.push(file_path.clone());
        }
        Ok(resolved)
    }

    async fn resolve_one_conflict_newest_wins(&self, target_dir: &str, _source_dir: &str, agent_id: &str, file_path: &str) -> Result<()> {
        let parent_ts = self.last_commit_time(target_dir, file_path, "HEAD").unwrap_or_else(Utc::now);
        let child_ts = self.last_commit_time(target_dir, file_path, "MERGE_HEAD").unwrap_or_else(Utc::now);

        let (choice, ref_to_use) = if child_ts > parent_ts {
            (ResolutionChoice::Child, "MERGE_HEAD")
        } else if parent_ts > child_ts {
            (ResolutionChoice::Parent, "HEAD")
        } else {
            (ResolutionChoice::TieChild, "MERGE_HEAD")
        };

        let _ = self.git.run_git(target_dir, &["rm", "--cached", "-f", file_path]);
        let show_ref = format!("{ref_to_use}:{file_path}");
        let content = git_ok(self.git.run_git(target_dir, &["show", &show_ref])).map(|o| o.stdout)?;
        std::fs::write(Path::new(target_dir).join(file_path), content)?;
        git_ok(self.git.run_git(target_dir, &["add", file_path]))?;

        self.store
            .record_merge_conflict_resolution(&MergeConflictResolution {
                id: Uuid::new_v4(),
                agent_id: agent_id.to_string(),
                file_path: file_path.to_string(),
                parent_modified_at: parent_ts,
                child_modified_at: child_ts,
                resolution_choice: choice,
                recorded_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    fn last_commit_time(&self, dir: &str, file_path: &str, rev: &str) -> Result<DateTime<Utc>> {
        let out = git_ok(self.git.run_git(dir, &["log", "-1", "--format=%cI", rev, "--", file_path]))?;
        DateTime::parse_from_rfc3339(out.stdout.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| WorktreeManagerError::GitCommand(e.to_string()))
    }

    /// Diff for a validator: what changed in the agent's worktree since
    /// `since_commit` (defaults to the worktree's recorded parent commit).
    pub async fn get_workspace_changes(&self, agent_id: Uuid, since_commit: Option<&str>) -> Result<WorkspaceChanges> {
        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or_else(|| WorktreeManagerError::NotFound(agent_id.to_string()))?;
        let base = since_commit.map(ToOwned::to_owned).or(worktree.parent_commit_sha).unwrap_or_else(|| "HEAD".to_string());

        let name_status = git_ok(self.git.run_git(&worktree.worktree_path, &["diff", "--name-status", &base, "HEAD"]))?.stdout;
        let mut changes = WorkspaceChanges::default();
        for line in name_status.lines() {
            let mut parts = line.splitn(2, '\t');
            let status = parts.next().unwrap_or("");
            let path = parts.next().unwrap_or("").to_string();
            match status.chars().next() {
                Some('A') => changes.files_created.push(path),
                Some('D') => changes.files_deleted.push(path),
                Some('M') | Some('R') => changes.files_modified.push(path),
                _ => {}
            }
        }
        changes.detailed_diff = git_ok(self.git.run_git(&worktree.worktree_path, &["diff", &base, "HEAD"]))?.stdout;
        Ok(changes)
    }

    /// Remove the agent's worktree directory (the branch is kept for
    /// history).
    pub async fn cleanup_worktree(&self, agent_id: Uuid) -> Result<CleanupOutcome> {
        let worktree = self.store.get_agent_worktree(agent_id).await?.ok_or_else(|| WorktreeManagerError::NotFound(agent_id.to_string()))?;
        let path = PathBuf::from(&worktree.worktree_path);
        let disk_usage_mb = directory_size_mb(&path);

        let main_repo = self.main_repo_str();
        if git_ok(self.git.run_git(&main_repo, &["worktree", "remove", "-f", &worktree.worktree_path])).is_err() {
            self.force_remove_worktree_dir(&path);
        }

        let mut updated = worktree.clone();
        updated.merge_status = MergeStatus::Cleaned;
        self.store.upsert_agent_worktree(&updated).await?;

        Ok(CleanupOutcome { disk_usage_mb })
    }

    fn force_remove_worktree_dir(&self, path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }
}

fn directory_size_mb(path: &Path) -> u64 {
    fn walk(path: &Path) -> u64 {
        let mut total = 0u64;
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_dir() {
                    total += walk(&p);
                } else if let Ok(meta) = entry.metadata() {
                    total += meta.len();
                }
            }
        }
        total
    }
    walk(path) / (1024 * 1024)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
