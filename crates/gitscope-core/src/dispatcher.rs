use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, mpsc};

use regex::Regex;
use tracing::{debug, warn};

use crate::details;
use crate::error::{GitScopeError, Result};
use crate::git::GitRunner;
use crate::graph;
use crate::protocol::{Request, Response};
use crate::refs;
use crate::session::{BranchCache, RepoSession, SessionState};
use crate::settings::ViewSettings;

/// Host-supplied clipboard capability. The core validates the hash and hands
/// it over; whether anything receives it is up to the embedding client.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> bool;
}

/// No clipboard wired up; every copy reports failure.
#[derive(Debug, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn copy(&self, _text: &str) -> bool {
        false
    }
}

/// Holds the most recent copied text for a host that polls it. Also the test
/// double for clipboard-dependent behavior.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    last: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn last_copied(&self) -> Option<String> {
        match self.last.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> bool {
        match self.last.lock() {
            Ok(mut guard) => *guard = Some(text.to_string()),
            Err(poisoned) => *poisoned.into_inner() = Some(text.to_string()),
        }
        true
    }
}

/// Routes one request at a time to the graph builder, ref resolver, or
/// repository adapter, serializing commands per repository: mutating commands
/// take the repository's exclusive lock, reads its shared lock, and distinct
/// repositories never contend. After every successful mutation the cached
/// window is invalidated and a `refresh` message is pushed to the client.
pub struct Dispatcher {
    runner: GitRunner,
    sessions: SessionState,
    settings: ViewSettings,
    clipboard: Box<dyn Clipboard>,
    push: mpsc::Sender<Response>,
}

impl Dispatcher {
    /// Returns the dispatcher plus the receiver for server-initiated
    /// messages (currently only `refresh`).
    pub fn new(runner: GitRunner, settings: ViewSettings) -> (Self, mpsc::Receiver<Response>) {
        let (push, pushed) = mpsc::channel();
        (
            Self {
                runner,
                sessions: SessionState::new(),
                settings,
                clipboard: Box::new(NoClipboard),
                push,
            },
            pushed,
        )
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn sessions(&self) -> &SessionState {
        &self.sessions
    }

    /// Handles one request and produces the one response carrying the same
    /// command tag. Git-level failures of mutating commands come back as the
    /// response's `status` text; `Err` is reserved for requests whose
    /// response shape has no failure channel (malformed input or an adapter
    /// breakdown on a read), which the transport surfaces out of band.
    pub fn handle(&self, request: &Request) -> Result<Response> {
        debug!(command = request.command(), repo = ?request.repo(), "dispatching request");
        match request.clone() {
            Request::LoadRepos => Ok(self.load_repos()),
            Request::LoadBranches {
                repo,
                show_remote_branches,
                hard,
            } => self.load_branches(&repo, show_remote_branches, hard),
            Request::LoadCommits {
                repo,
                branch_name,
                max_commits,
                show_remote_branches,
                hard,
            } => self.load_commits(&repo, &branch_name, max_commits, show_remote_branches, hard),
            Request::CommitDetails { repo, commit_hash } => {
                self.commit_details(&repo, &commit_hash)
            }
            Request::ViewDiff {
                repo,
                commit_hash,
                old_file_path,
                new_file_path,
                kind: _,
            } => Ok(self.view_diff(&repo, &commit_hash, &old_file_path, &new_file_path)),
            Request::CopyCommitHashToClipboard { repo: _, commit_hash } => {
                Ok(Response::CopyCommitHashToClipboard {
                    success: is_full_hash(&commit_hash) && self.clipboard.copy(&commit_hash),
                })
            }

            Request::AddTag {
                repo,
                commit_hash,
                tag_name,
            } => Ok(Response::AddTag {
                status: self.mutate(&repo, string_args(["tag", &tag_name, &commit_hash])),
            }),
            Request::DeleteTag { repo, tag_name } => Ok(Response::DeleteTag {
                status: self.mutate(&repo, string_args(["tag", "-d", &tag_name])),
            }),
            Request::PushTag { repo, tag_name } => Ok(Response::PushTag {
                status: self.mutate(&repo, string_args(["push", "origin", &tag_name])),
            }),
            Request::CreateBranch {
                repo,
                commit_hash,
                branch_name,
            } => Ok(Response::CreateBranch {
                status: self.mutate(&repo, string_args(["branch", &branch_name, &commit_hash])),
            }),
            Request::DeleteBranch {
                repo,
                branch_name,
                force_delete,
            } => Ok(Response::DeleteBranch {
                status: self.mutate(
                    &repo,
                    string_args(["branch", if force_delete { "-D" } else { "-d" }, &branch_name]),
                ),
            }),
            Request::RenameBranch {
                repo,
                old_name,
                new_name,
            } => Ok(Response::RenameBranch {
                status: self.mutate(&repo, string_args(["branch", "-m", &old_name, &new_name])),
            }),
            Request::CheckoutBranch {
                repo,
                branch_name,
                remote_branch,
            } => {
                let args = match remote_branch.as_deref() {
                    Some(remote) => string_args(["checkout", "-b", &branch_name, remote]),
                    None => string_args(["checkout", &branch_name]),
                };
                Ok(Response::CheckoutBranch {
                    status: self.mutate(&repo, args),
                })
            }
            Request::CheckoutCommit { repo, commit_hash } => Ok(Response::CheckoutCommit {
                status: self.mutate(&repo, string_args(["checkout", &commit_hash])),
            }),
            Request::ResetToCommit {
                repo,
                commit_hash,
                reset_mode,
            } => Ok(Response::ResetToCommit {
                status: self.mutate(
                    &repo,
                    string_args(["reset", reset_mode.as_flag(), &commit_hash]),
                ),
            }),
            Request::MergeCommit {
                repo,
                commit_hash,
                create_new_commit,
            } => Ok(Response::MergeCommit {
                status: self.merge(&repo, &commit_hash, create_new_commit),
            }),
            Request::MergeBranch {
                repo,
                branch_name,
                create_new_commit,
            } => Ok(Response::MergeBranch {
                status: self.merge(&repo, &branch_name, create_new_commit),
            }),
            Request::CherrypickCommit {
                repo,
                commit_hash,
                parent_index,
            } => Ok(Response::CherrypickCommit {
                status: self.apply_with_parent_line(
                    &repo,
                    "cherry-pick",
                    &commit_hash,
                    parent_index,
                ),
            }),
            Request::RevertCommit {
                repo,
                commit_hash,
                parent_index,
            } => Ok(Response::RevertCommit {
                status: self.apply_with_parent_line(&repo, "revert", &commit_hash, parent_index),
            }),
        }
    }

    fn load_repos(&self) -> Response {
        let mut repos: Vec<String> = self.settings.repos.clone();
        repos.extend(
            self.sessions
                .known_repos()
                .into_iter()
                .map(|p| p.to_string_lossy().to_string()),
        );
        repos.sort();
        repos.dedup();
        Response::LoadRepos { repos }
    }

    fn load_branches(&self, repo: &str, show_remote_branches: bool, hard: bool) -> Result<Response> {
        let session = self.sessions.session(Path::new(repo));
        let _shared = session.read_guard();

        if !hard && let Some(cache) = session.cached_branches(show_remote_branches) {
            return Ok(Response::LoadBranches {
                branches: cache.branches,
                head: cache.head,
                hard,
            });
        }

        let (branches, head) =
            refs::load_branches(&self.runner, Path::new(repo), show_remote_branches)?;
        session.store_branches(BranchCache {
            show_remote_branches,
            branches: branches.clone(),
            head: head.clone(),
        });
        Ok(Response::LoadBranches {
            branches,
            head,
            hard,
        })
    }

    fn load_commits(
        &self,
        repo: &str,
        branch_name: &str,
        max_commits: usize,
        show_remote_branches: bool,
        hard: bool,
    ) -> Result<Response> {
        let session = self.sessions.session(Path::new(repo));
        let _shared = session.read_guard();
        if hard {
            session.invalidate();
        }
        let batch = graph::load_commits(
            &self.runner,
            &session,
            Path::new(repo),
            branch_name,
            max_commits,
            show_remote_branches,
            hard,
        )?;
        Ok(Response::LoadCommits {
            commits: batch.commits,
            more_commits_available: batch.more_commits_available,
            hard,
        })
    }

    fn commit_details(&self, repo: &str, commit_hash: &str) -> Result<Response> {
        if !is_full_hash(commit_hash) {
            return Err(GitScopeError::InvalidRequest(format!(
                "malformed commit hash {commit_hash:?}"
            )));
        }
        let session = self.sessions.session(Path::new(repo));
        let _shared = session.read_guard();
        let commit_details = details::commit_details(&self.runner, Path::new(repo), commit_hash)?;
        Ok(Response::CommitDetails { commit_details })
    }

    fn view_diff(
        &self,
        repo: &str,
        commit_hash: &str,
        old_file_path: &str,
        new_file_path: &str,
    ) -> Response {
        if !is_full_hash(commit_hash) {
            return Response::ViewDiff { success: false };
        }
        let session = self.sessions.session(Path::new(repo));
        let _shared = session.read_guard();
        let success = details::file_patch(
            &self.runner,
            Path::new(repo),
            commit_hash,
            old_file_path,
            new_file_path,
        )
        .is_ok();
        Response::ViewDiff { success }
    }

    fn merge(&self, repo: &str, target: &str, create_new_commit: bool) -> Option<String> {
        let mut args = string_args(["merge", target]);
        if create_new_commit {
            // Force a real merge commit even when fast-forward is possible.
            args.insert(1, "--no-ff".to_string());
        }
        self.mutate(repo, args)
    }

    /// Cherry-pick and revert share the parent-line contract: the 0-based
    /// `parent_index` is validated against the commit's actual parent count
    /// before the adapter is invoked, and mapped to git's 1-based `-m` for
    /// merge commits.
    fn apply_with_parent_line(
        &self,
        repo: &str,
        operation: &str,
        commit_hash: &str,
        parent_index: usize,
    ) -> Option<String> {
        let path = Path::new(repo);
        let session = self.sessions.session(path);
        let _exclusive = session.write_guard();

        let parent_count = match self.parent_count(&session, path, commit_hash) {
            Ok(count) => count,
            Err(e) => return Some(e.to_string()),
        };
        if let Some(invalid) = validate_parent_index(parent_count, parent_index) {
            return Some(invalid);
        }

        let mut args = vec![operation.to_string()];
        if operation == "revert" {
            args.push("--no-edit".to_string());
        }
        if parent_count > 1 {
            args.push("-m".to_string());
            args.push((parent_index + 1).to_string());
        }
        args.push(commit_hash.to_string());
        self.run_locked_mutation(&session, path, args)
    }

    fn parent_count(&self, session: &RepoSession, repo: &Path, commit_hash: &str) -> Result<usize> {
        if let Some(window) = session.window()
            && let Some(node) = window
                .commits
                .iter()
                .find(|node| node.commit.hash == commit_hash)
        {
            return Ok(node.commit.parent_hashes.len());
        }
        let out = self.runner.exec(
            repo,
            &string_args(["rev-list", "--parents", "-n", "1", commit_hash]),
            false,
        )?;
        let first_line = out.stdout.lines().next().unwrap_or_default();
        Ok(first_line.split_whitespace().count().saturating_sub(1))
    }

    fn mutate(&self, repo: &str, args: Vec<String>) -> Option<String> {
        let path = Path::new(repo);
        let session = self.sessions.session(path);
        let _exclusive = session.write_guard();
        self.run_locked_mutation(&session, path, args)
    }

    // Caller holds the repository's exclusive lock. A single atomic attempt:
    // on success the cache is dropped wholesale and a refresh is pushed; on
    // failure the cache is left untouched.
    fn run_locked_mutation(
        &self,
        session: &RepoSession,
        repo: &Path,
        args: Vec<String>,
    ) -> Option<String> {
        match self.runner.run_status(repo, &args) {
            Ok(None) => {
                session.invalidate();
                let _ = self.push.send(Response::Refresh);
                None
            }
            Ok(Some(status)) => {
                warn!(repo = %repo.display(), args = ?args, status = %status, "mutating command failed");
                Some(status)
            }
            Err(e) => {
                warn!(repo = %repo.display(), args = ?args, error = %e, "adapter failure");
                Some(e.to_string())
            }
        }
    }
}

fn validate_parent_index(parent_count: usize, parent_index: usize) -> Option<String> {
    if parent_count <= 1 {
        if parent_index != 0 {
            return Some(format!(
                "parent index {parent_index} is invalid for a non-merge commit"
            ));
        }
        return None;
    }
    if parent_index >= parent_count {
        return Some(format!(
            "parent index {parent_index} is out of range for a commit with {parent_count} parents"
        ));
    }
    None
}

fn is_full_hash(text: &str) -> bool {
    static FULL_HASH: OnceLock<Regex> = OnceLock::new();
    FULL_HASH
        .get_or_init(|| Regex::new("^[0-9a-fA-F]{40}$").expect("hash regex compiles"))
        .is_match(text)
}

fn string_args<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.into_iter().map(ToString::to_string).collect()
}
