use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("git command failed: {0}")]
    GitCommand(String),
}

// ---------------------------------------------------------------------------
// DiffEntry — structured diff output shared by the shell and libgit2 read
// adapters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    pub status: DiffStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_status_serialize() {
        let json = serde_json::to_string(&DiffStatus::Added).unwrap();
        assert_eq!(json, "\"added\"");
        let back: DiffStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DiffStatus::Added);
    }

    #[test]
    fn diff_entry_serialize() {
        let entry = DiffEntry {
            path: "src/main.rs".to_string(),
            status: DiffStatus::Modified,
            additions: 10,
            deletions: 2,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: DiffEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, "src/main.rs");
        assert_eq!(back.additions, 10);
        assert_eq!(back.deletions, 2);
    }
}
