use serde::{Deserialize, Serialize};

use crate::models::{CommitDetails, CommitNode, FileChangeKind, ResetMode};

/// Client-to-core message catalogue. The `command` tag is preserved on the
/// matching response so a client with several outstanding requests can
/// correlate them. Every field is mandatory; a malformed message is rejected
/// at the deserialization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Request {
    LoadRepos,
    #[serde(rename_all = "camelCase")]
    LoadBranches {
        repo: String,
        show_remote_branches: bool,
        hard: bool,
    },
    #[serde(rename_all = "camelCase")]
    LoadCommits {
        repo: String,
        branch_name: String,
        max_commits: usize,
        show_remote_branches: bool,
        hard: bool,
    },
    #[serde(rename_all = "camelCase")]
    CommitDetails { repo: String, commit_hash: String },
    #[serde(rename_all = "camelCase")]
    ViewDiff {
        repo: String,
        commit_hash: String,
        old_file_path: String,
        new_file_path: String,
        #[serde(rename = "type")]
        kind: FileChangeKind,
    },
    #[serde(rename_all = "camelCase")]
    AddTag {
        repo: String,
        commit_hash: String,
        tag_name: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteTag { repo: String, tag_name: String },
    #[serde(rename_all = "camelCase")]
    PushTag { repo: String, tag_name: String },
    #[serde(rename_all = "camelCase")]
    CreateBranch {
        repo: String,
        commit_hash: String,
        branch_name: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteBranch {
        repo: String,
        branch_name: String,
        force_delete: bool,
    },
    #[serde(rename_all = "camelCase")]
    RenameBranch {
        repo: String,
        old_name: String,
        new_name: String,
    },
    #[serde(rename_all = "camelCase")]
    CheckoutBranch {
        repo: String,
        branch_name: String,
        /// When present, a local tracking branch is created from this remote
        /// ref before switching.
        remote_branch: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CheckoutCommit { repo: String, commit_hash: String },
    #[serde(rename_all = "camelCase")]
    ResetToCommit {
        repo: String,
        commit_hash: String,
        reset_mode: ResetMode,
    },
    #[serde(rename_all = "camelCase")]
    MergeCommit {
        repo: String,
        commit_hash: String,
        create_new_commit: bool,
    },
    #[serde(rename_all = "camelCase")]
    MergeBranch {
        repo: String,
        branch_name: String,
        create_new_commit: bool,
    },
    #[serde(rename_all = "camelCase")]
    CherrypickCommit {
        repo: String,
        commit_hash: String,
        /// 0-based parent line defining the diff base for merge commits;
        /// must be 0 for non-merge commits.
        parent_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    RevertCommit {
        repo: String,
        commit_hash: String,
        parent_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    CopyCommitHashToClipboard { repo: String, commit_hash: String },
}

impl Request {
    pub fn command(&self) -> &'static str {
        match self {
            Self::LoadRepos => "loadRepos",
            Self::LoadBranches { .. } => "loadBranches",
            Self::LoadCommits { .. } => "loadCommits",
            Self::CommitDetails { .. } => "commitDetails",
            Self::ViewDiff { .. } => "viewDiff",
            Self::AddTag { .. } => "addTag",
            Self::DeleteTag { .. } => "deleteTag",
            Self::PushTag { .. } => "pushTag",
            Self::CreateBranch { .. } => "createBranch",
            Self::DeleteBranch { .. } => "deleteBranch",
            Self::RenameBranch { .. } => "renameBranch",
            Self::CheckoutBranch { .. } => "checkoutBranch",
            Self::CheckoutCommit { .. } => "checkoutCommit",
            Self::ResetToCommit { .. } => "resetToCommit",
            Self::MergeCommit { .. } => "mergeCommit",
            Self::MergeBranch { .. } => "mergeBranch",
            Self::CherrypickCommit { .. } => "cherrypickCommit",
            Self::RevertCommit { .. } => "revertCommit",
            Self::CopyCommitHashToClipboard { .. } => "copyCommitHashToClipboard",
        }
    }

    /// Repository the request targets; `None` only for `loadRepos`.
    pub fn repo(&self) -> Option<&str> {
        match self {
            Self::LoadRepos => None,
            Self::LoadBranches { repo, .. }
            | Self::LoadCommits { repo, .. }
            | Self::CommitDetails { repo, .. }
            | Self::ViewDiff { repo, .. }
            | Self::AddTag { repo, .. }
            | Self::DeleteTag { repo, .. }
            | Self::PushTag { repo, .. }
            | Self::CreateBranch { repo, .. }
            | Self::DeleteBranch { repo, .. }
            | Self::RenameBranch { repo, .. }
            | Self::CheckoutBranch { repo, .. }
            | Self::CheckoutCommit { repo, .. }
            | Self::ResetToCommit { repo, .. }
            | Self::MergeCommit { repo, .. }
            | Self::MergeBranch { repo, .. }
            | Self::CherrypickCommit { repo, .. }
            | Self::RevertCommit { repo, .. }
            | Self::CopyCommitHashToClipboard { repo, .. } => Some(repo),
        }
    }

    /// Whether the command may alter on-disk repository state, and therefore
    /// needs the repository's exclusive lock.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::AddTag { .. }
                | Self::DeleteTag { .. }
                | Self::PushTag { .. }
                | Self::CreateBranch { .. }
                | Self::DeleteBranch { .. }
                | Self::RenameBranch { .. }
                | Self::CheckoutBranch { .. }
                | Self::CheckoutCommit { .. }
                | Self::ResetToCommit { .. }
                | Self::MergeCommit { .. }
                | Self::MergeBranch { .. }
                | Self::CherrypickCommit { .. }
                | Self::RevertCommit { .. }
        )
    }
}

/// Core-to-client message catalogue. `status: None` always means success; a
/// non-`None` string is a user-displayable failure reason. `Refresh` is
/// pushed asynchronously after a successful mutation and has no correlated
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Response {
    LoadRepos {
        repos: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    LoadBranches {
        branches: Vec<String>,
        head: Option<String>,
        hard: bool,
    },
    #[serde(rename_all = "camelCase")]
    LoadCommits {
        commits: Vec<CommitNode>,
        more_commits_available: bool,
        hard: bool,
    },
    #[serde(rename_all = "camelCase")]
    CommitDetails {
        commit_details: Option<CommitDetails>,
    },
    ViewDiff {
        success: bool,
    },
    AddTag {
        status: Option<String>,
    },
    DeleteTag {
        status: Option<String>,
    },
    PushTag {
        status: Option<String>,
    },
    CreateBranch {
        status: Option<String>,
    },
    DeleteBranch {
        status: Option<String>,
    },
    RenameBranch {
        status: Option<String>,
    },
    CheckoutBranch {
        status: Option<String>,
    },
    CheckoutCommit {
        status: Option<String>,
    },
    ResetToCommit {
        status: Option<String>,
    },
    MergeCommit {
        status: Option<String>,
    },
    MergeBranch {
        status: Option<String>,
    },
    CherrypickCommit {
        status: Option<String>,
    },
    RevertCommit {
        status: Option<String>,
    },
    CopyCommitHashToClipboard {
        success: bool,
    },
    Refresh,
}

impl Response {
    pub fn command(&self) -> &'static str {
        match self {
            Self::LoadRepos { .. } => "loadRepos",
            Self::LoadBranches { .. } => "loadBranches",
            Self::LoadCommits { .. } => "loadCommits",
            Self::CommitDetails { .. } => "commitDetails",
            Self::ViewDiff { .. } => "viewDiff",
            Self::AddTag { .. } => "addTag",
            Self::DeleteTag { .. } => "deleteTag",
            Self::PushTag { .. } => "pushTag",
            Self::CreateBranch { .. } => "createBranch",
            Self::DeleteBranch { .. } => "deleteBranch",
            Self::RenameBranch { .. } => "renameBranch",
            Self::CheckoutBranch { .. } => "checkoutBranch",
            Self::CheckoutCommit { .. } => "checkoutCommit",
            Self::ResetToCommit { .. } => "resetToCommit",
            Self::MergeCommit { .. } => "mergeCommit",
            Self::MergeBranch { .. } => "mergeBranch",
            Self::CherrypickCommit { .. } => "cherrypickCommit",
            Self::RevertCommit { .. } => "revertCommit",
            Self::CopyCommitHashToClipboard { .. } => "copyCommitHashToClipboard",
            Self::Refresh => "refresh",
        }
    }

    /// The failure text carried by command-status responses, if any.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::AddTag { status }
            | Self::DeleteTag { status }
            | Self::PushTag { status }
            | Self::CreateBranch { status }
            | Self::DeleteBranch { status }
            | Self::RenameBranch { status }
            | Self::CheckoutBranch { status }
            | Self::CheckoutCommit { status }
            | Self::ResetToCommit { status }
            | Self::MergeCommit { status }
            | Self::MergeBranch { status }
            | Self::CherrypickCommit { status }
            | Self::RevertCommit { status } => status.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, Response};

    #[test]
    fn request_tags_match_the_wire_catalogue() {
        let raw = r#"{
            "command": "loadCommits",
            "repo": "/tmp/repo",
            "branchName": "All",
            "maxCommits": 300,
            "showRemoteBranches": true,
            "hard": false
        }"#;
        let request: Request = serde_json::from_str(raw).expect("deserialize loadCommits");
        assert_eq!(request.command(), "loadCommits");
        assert_eq!(request.repo(), Some("/tmp/repo"));
        assert!(!request.is_mutating());

        let raw = r#"{
            "command": "cherrypickCommit",
            "repo": "/tmp/repo",
            "commitHash": "abc",
            "parentIndex": 1
        }"#;
        let request: Request = serde_json::from_str(raw).expect("deserialize cherrypickCommit");
        assert!(request.is_mutating());
    }

    #[test]
    fn missing_mandatory_field_is_rejected() {
        // resetMode is mandatory; the boundary must not default it.
        let raw = r#"{"command": "resetToCommit", "repo": "/r", "commitHash": "abc"}"#;
        assert!(serde_json::from_str::<Request>(raw).is_err());
    }

    #[test]
    fn response_tag_mirrors_request_tag() {
        let response = Response::CheckoutBranch {
            status: Some("branch not found".to_string()),
        };
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(json.contains("\"command\":\"checkoutBranch\""));
        assert_eq!(response.status(), Some("branch not found"));

        let refresh = serde_json::to_string(&Response::Refresh).expect("serialize refresh");
        assert_eq!(refresh, r#"{"command":"refresh"}"#);
    }

    #[test]
    fn null_status_serializes_as_success() {
        let json =
            serde_json::to_string(&Response::AddTag { status: None }).expect("serialize addTag");
        assert_eq!(json, r#"{"command":"addTag","status":null}"#);
    }

    #[test]
    fn checkout_branch_accepts_null_remote() {
        let raw = r#"{
            "command": "checkoutBranch",
            "repo": "/r",
            "branchName": "dev",
            "remoteBranch": null
        }"#;
        let request: Request = serde_json::from_str(raw).expect("deserialize");
        match request {
            Request::CheckoutBranch { remote_branch, .. } => assert!(remote_branch.is_none()),
            other => panic!("unexpected request: {other:?}"),
        }
    }
}
