//! Native git read operations via libgit2 (git2 crate).
//!
//! Provides fast, in-process alternatives to shelling out to `git` for
//! read-only queries. Write operations (commit, merge, rebase, fetch) stay
//! as shell-outs — libgit2 is intentionally used only for reads.
//!
//! # Why git2 for reads?
//!
//! - No process spawn overhead (~10-50x faster for hot-path queries)
//! - Structured output without parsing porcelain text
//! - Direct access to libgit2 diff/status iterators
//!
//! # Feature gated
//!
//! This module is only available with the `libgit2` feature flag (enabled
//! by default). When disabled, `git_read_adapter::ShellGitReadAdapter`
//! shells out to `git` instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::repo::{DiffEntry, DiffStatus, RepoError};

// ---------------------------------------------------------------------------
// Error bridging
// ---------------------------------------------------------------------------

impl From<git2::Error> for RepoError {
    fn from(e: git2::Error) -> Self {
        RepoError::GitCommand(e.message().to_string())
    }
}

// ---------------------------------------------------------------------------
// Native read operations
// ---------------------------------------------------------------------------

/// Native git read operations using libgit2.
///
/// Stateless — opens the repo fresh for each call. This avoids stale index
/// issues and is fine for reads (the repo open is <1ms for local repos).
pub struct Git2ReadOps;

impl Git2ReadOps {
    /// Open a git2 Repository from a working directory path.
    fn open(workdir: &Path) -> Result<git2::Repository, RepoError> {
        git2::Repository::discover(workdir).map_err(RepoError::from)
    }

    /// Discover the gitdir for a working directory (replaces `git rev-parse --git-dir`).
    pub fn discover_gitdir(workdir: &Path) -> Result<std::path::PathBuf, RepoError> {
        let repo = Self::open(workdir)?;
        Ok(repo.path().to_path_buf())
    }

    /// Get the current branch name (replaces `git rev-parse --abbrev-ref HEAD`).
    pub fn current_branch(workdir: &Path) -> Result<String, RepoError> {
        let repo = Self::open(workdir)?;
        let head = repo.head().map_err(RepoError::from)?;

        if head.is_branch() {
            Ok(head.shorthand().unwrap_or("HEAD").to_string())
        } else {
            // Detached HEAD — return short OID
            let oid = head
                .target()
                .ok_or_else(|| RepoError::GitCommand("HEAD has no target".to_string()))?;
            Ok(format!("{:.7}", oid))
        }
    }

    /// Get working directory status (replaces `git status --porcelain`).
    ///
    /// Returns a list of changed files with their status. Only includes
    /// files that differ from HEAD or are untracked.
    pub fn status(workdir: &Path) -> Result<Vec<DiffEntry>, RepoError> {
        let repo = Self::open(workdir)?;

        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = repo.statuses(Some(&mut opts)).map_err(RepoError::from)?;
        let mut entries = Vec::with_capacity(statuses.len());

        for entry in statuses.iter() {
            let path = entry.path().unwrap_or("").to_string();
            let st = entry.status();

            let status =
                if st.contains(git2::Status::WT_NEW) || st.contains(git2::Status::INDEX_NEW) {
                    DiffStatus::Added
                } else if st.contains(git2::Status::WT_DELETED)
                    || st.contains(git2::Status::INDEX_DELETED)
                {
                    DiffStatus::Deleted
                } else if st.contains(git2::Status::WT_RENAMED)
                    || st.contains(git2::Status::INDEX_RENAMED)
                {
                    DiffStatus::Renamed
                } else if st.contains(git2::Status::WT_MODIFIED)
                    || st.contains(git2::Status::INDEX_MODIFIED)
                    || st.intersects(git2::Status::WT_TYPECHANGE | git2::Status::INDEX_TYPECHANGE)
                {
                    DiffStatus::Modified
                } else {
                    DiffStatus::Untracked
                };

            entries.push(DiffEntry {
                path,
                status,
                additions: 0,
                deletions: 0,
            });
        }

        Ok(entries)
    }

    /// Get diff stats between two refs (replaces `git diff --stat ref1 ref2`).
    ///
    /// Compares two arbitrary refs (branches, tags, commits); used for
    /// merge pre-checks before validating and merging an agent's worktree.
    pub fn diff_stat_refs(
        workdir: &Path,
        from_ref: &str,
        to_ref: &str,
    ) -> Result<Vec<DiffEntry>, RepoError> {
        let repo = Self::open(workdir)?;

        let from_tree = repo
            .revparse_single(from_ref)
            .map_err(RepoError::from)?
            .peel_to_tree()
            .map_err(RepoError::from)?;
        let to_tree = repo
            .revparse_single(to_ref)
            .map_err(RepoError::from)?
            .peel_to_tree()
            .map_err(RepoError::from)?;

        let diff = repo
            .diff_tree_to_tree(Some(&from_tree), Some(&to_tree), None)
            .map_err(RepoError::from)?;

        let mut entries = Vec::new();
        for delta in diff.deltas() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            let status = match delta.status() {
                git2::Delta::Added => DiffStatus::Added,
                git2::Delta::Deleted => DiffStatus::Deleted,
                git2::Delta::Modified => DiffStatus::Modified,
                git2::Delta::Renamed => DiffStatus::Renamed,
                git2::Delta::Copied => DiffStatus::Copied,
                _ => DiffStatus::Modified,
            };

            entries.push(DiffEntry {
                path,
                status,
                additions: 0,
                deletions: 0,
            });
        }

        // Walk patches for per-file line counts
        let mut line_stats: Vec<(u32, u32)> = vec![(0, 0); entries.len()];
        let _ = diff.print(git2::DiffFormat::Patch, |delta, _hunk, line| {
            let current_path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            if let Some(pos) = entries.iter().position(|e| e.path == current_path) {
                match line.origin() {
                    '+' => line_stats[pos].0 += 1,
                    '-' => line_stats[pos].1 += 1,
                    _ => {}
                }
            }
            true
        });

        for (entry, (adds, dels)) in entries.iter_mut().zip(line_stats.iter()) {
            entry.additions = *adds;
            entry.deletions = *dels;
        }

        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
