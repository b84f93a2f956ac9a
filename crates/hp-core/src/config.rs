//! Top-level configuration.
//!
//! Loaded from `~/.hephaestus/config.toml`, with every field defaulted so a
//! bare daemon start-up with no config file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::CliType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub repo: RepoConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub board: BoardDefaultsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            agents: AgentsConfig::default(),
            repo: RepoConfig::default(),
            tasks: TasksConfig::default(),
            vector_store: VectorStoreConfig::default(),
            http: HttpConfig::default(),
            board: BoardDefaultsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from `~/.hephaestus/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn default_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".hephaestus").join("config.toml")
    }

    /// Directory of phase-template YAMLs, if pointed to by the
    /// `HEPHAESTUS_PHASES_FOLDER` environment variable.
    pub fn phases_folder(&self) -> Option<PathBuf> {
        std::env::var("HEPHAESTUS_PHASES_FOLDER").ok().map(PathBuf::from)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_cors: bool,
    /// Path to the sqlite database file. `None` runs the daemon against an
    /// in-memory store (lost on restart), the default for a bare start-up.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            log_level: default_log_level(),
            enable_cors: true,
            db_path: None,
        }
    }
}

fn default_project_name() -> String {
    "hephaestus".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Agent pool sizing and CLI defaults, overridable per-phase via
/// [`crate::types::CliOverrides`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: u32,
    #[serde(default = "default_tmux_session_prefix")]
    pub tmux_session_prefix: String,
    #[serde(default = "default_cli_tool")]
    pub default_cli_tool: CliType,
    #[serde(default)]
    pub cli_model: Option<String>,
    #[serde(default)]
    pub glm_api_token_env: Option<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: default_max_concurrent_agents(),
            tmux_session_prefix: default_tmux_session_prefix(),
            default_cli_tool: default_cli_tool(),
            cli_model: None,
            glm_api_token_env: None,
        }
    }
}

fn default_max_concurrent_agents() -> u32 {
    5
}
fn default_tmux_session_prefix() -> String {
    "hp-agent-".into()
}
fn default_cli_tool() -> CliType {
    CliType::Claude
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default = "default_main_repo_path")]
    pub main_repo_path: String,
    #[serde(default = "default_worktree_base_path")]
    pub worktree_base_path: String,
    #[serde(default = "default_branch_prefix")]
    pub worktree_branch_prefix: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Label only; the merge policy itself is hard-wired to newest-file-wins.
    #[serde(default = "default_conflict_strategy")]
    pub conflict_resolution_strategy: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            main_repo_path: default_main_repo_path(),
            worktree_base_path: default_worktree_base_path(),
            worktree_branch_prefix: default_branch_prefix(),
            base_branch: default_base_branch(),
            conflict_resolution_strategy: default_conflict_strategy(),
        }
    }
}

fn default_main_repo_path() -> String {
    ".".into()
}
fn default_worktree_base_path() -> String {
    ".hephaestus/worktrees".into()
}
fn default_branch_prefix() -> String {
    "agent/".into()
}
fn default_base_branch() -> String {
    "main".into()
}
fn default_conflict_strategy() -> String {
    "newest_file_wins".into()
}

/// How widely a new task's enriched description is compared against past
/// tasks before it is marked a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Only compare against tasks in the same phase (default).
    Phase,
    /// Compare against every task in the workflow, regardless of phase.
    Workflow,
}

impl Default for DedupScope {
    fn default() -> Self {
        DedupScope::Phase
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_true")]
    pub task_dedup_enabled: bool,
    #[serde(default = "default_dedup_threshold")]
    pub dedup_similarity_threshold: f32,
    #[serde(default)]
    pub dedup_scope: DedupScope,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            task_dedup_enabled: true,
            dedup_similarity_threshold: default_dedup_threshold(),
            dedup_scope: DedupScope::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_dedup_threshold() -> f32 {
    0.92
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub qdrant_url: Option<String>,
    #[serde(default = "default_collection_prefix")]
    pub qdrant_collection_prefix: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self { qdrant_url: None, qdrant_collection_prefix: default_collection_prefix() }
    }
}

fn default_collection_prefix() -> String {
    "hephaestus_".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_host")]
    pub host: String,
    /// `None` disables API key enforcement (development mode).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_rate_limit_global")]
    pub rate_limit_global_per_minute: u32,
    #[serde(default = "default_rate_limit_per_user")]
    pub rate_limit_per_user_per_minute: u32,
    #[serde(default = "default_rate_limit_per_endpoint")]
    pub rate_limit_per_endpoint_per_minute: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            host: default_http_host(),
            api_key: None,
            rate_limit_global_per_minute: default_rate_limit_global(),
            rate_limit_per_user_per_minute: default_rate_limit_per_user(),
            rate_limit_per_endpoint_per_minute: default_rate_limit_per_endpoint(),
        }
    }
}

fn default_http_port() -> u16 {
    7890
}
fn default_http_host() -> String {
    "127.0.0.1".into()
}
fn default_rate_limit_global() -> u32 {
    1000
}
fn default_rate_limit_per_user() -> u32 {
    120
}
fn default_rate_limit_per_endpoint() -> u32 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDefaultsConfig {
    #[serde(default)]
    pub default_human_review: bool,
    #[serde(default = "default_approval_timeout")]
    pub default_approval_timeout_seconds: i64,
}

impl Default for BoardDefaultsConfig {
    fn default() -> Self {
        Self { default_human_review: false, default_approval_timeout_seconds: default_approval_timeout() }
    }
}

fn default_approval_timeout() -> i64 {
    1800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let cfg = Config::default();
        let toml = cfg.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.agents.max_concurrent_agents, cfg.agents.max_concurrent_agents);
    }

    #[test]
    fn phases_folder_reads_environment_pointer() {
        std::env::remove_var("HEPHAESTUS_PHASES_FOLDER");
        let cfg = Config::default();
        assert!(cfg.phases_folder().is_none());
    }
}
