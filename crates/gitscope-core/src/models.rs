use serde::{Deserialize, Serialize};

/// One entry of the history traversal. Immutable once read; a hash never
/// changes meaning within a repository even though branch tips move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    pub parent_hashes: Vec<String>,
    pub author: String,
    pub email: String,
    pub date: i64,
    pub message: String,
}

/// A commit decorated for the client: the refs pointing at it and whether it
/// is the checked-out commit. Derived on every graph build, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    #[serde(flatten)]
    pub commit: Commit,
    pub refs: Vec<GitRef>,
    pub current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Head,
    Tag,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub hash: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RefKind,
}

/// Head hash plus every ref in the requested scope. `head` is `None` for a
/// repository with no commits or an unresolvable HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefData {
    pub head: Option<String>,
    pub refs: Vec<GitRef>,
}

/// Result of one graph build: the loaded window plus whether history
/// continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitBatch {
    pub commits: Vec<CommitNode>,
    pub more_commits_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileChangeKind {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "D")]
    Deleted,
    #[serde(rename = "R")]
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub old_file_path: String,
    pub new_file_path: String,
    #[serde(rename = "type")]
    pub kind: FileChangeKind,
    /// `None` when git cannot compute line counts, e.g. binary files.
    pub additions: Option<u32>,
    pub deletions: Option<u32>,
}

/// Fetched lazily per commit and never cached: it must reflect repository
/// state at the moment of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetails {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub email: String,
    pub date: i64,
    pub committer: String,
    pub body: String,
    pub file_changes: Vec<FileChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

impl ResetMode {
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Soft => "--soft",
            Self::Mixed => "--mixed",
            Self::Hard => "--hard",
        }
    }
}
