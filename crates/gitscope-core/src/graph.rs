use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{GitScopeError, Result};
use crate::git::GitRunner;
use crate::log_parser::{LOG_FORMAT, parse_log_records};
use crate::models::{Commit, CommitBatch, CommitNode, RefData};
use crate::refs::load_refs;
use crate::session::{GraphWindow, RepoSession, WindowKey};

/// Branch filter meaning "traverse every branch in scope" rather than one
/// named branch.
pub const ALL_BRANCHES: &str = "All";

/// Builds the ordered commit window for a repository: parent links, ref
/// annotations, the checked-out marker, and a truncation flag.
///
/// A soft load (`hard == false`) may serve the cached window when the cache
/// signature matches and the repository's refs have not moved since the
/// window was built; the response is then identical to a full rebuild by
/// construction. Any difference falls back to a complete traversal.
pub fn load_commits(
    runner: &GitRunner,
    session: &RepoSession,
    repo: &Path,
    branch_name: &str,
    max_commits: usize,
    show_remote_branches: bool,
    hard: bool,
) -> Result<CommitBatch> {
    if max_commits == 0 {
        return Err(GitScopeError::InvalidRequest(
            "maxCommits must be at least 1".to_string(),
        ));
    }

    let ref_data = load_refs(runner, repo, show_remote_branches)?;
    let key = WindowKey {
        branch_name: branch_name.to_string(),
        show_remote_branches,
    };

    if !hard && let Some(window) = session.window()
        && window_serves(&window, &key, max_commits, &ref_data)
    {
        debug!(repo = %repo.display(), branch = branch_name, "serving cached commit window");
        return Ok(CommitBatch {
            commits: window.commits,
            more_commits_available: window.more_commits_available,
        });
    }

    // A repository with no refs and no head has no commits to traverse.
    let (commits, more_commits_available) = if ref_data.head.is_none() && ref_data.refs.is_empty() {
        (Vec::new(), false)
    } else {
        let raw = run_log(runner, repo, branch_name, max_commits, show_remote_branches)?;
        let mut commits = parse_log_records(&raw)?;
        let more = commits.len() > max_commits;
        commits.truncate(max_commits);
        (decorate(commits, &ref_data), more)
    };

    session.store_window(GraphWindow {
        key,
        max_commits,
        head: ref_data.head,
        refs: ref_data.refs,
        commits: commits.clone(),
        more_commits_available,
    });

    Ok(CommitBatch {
        commits,
        more_commits_available,
    })
}

fn window_serves(
    window: &GraphWindow,
    key: &WindowKey,
    max_commits: usize,
    ref_data: &RefData,
) -> bool {
    if window.key != *key || window.head != ref_data.head || window.refs != ref_data.refs {
        return false;
    }
    // Same request size, or the window already holds the complete history so
    // a larger request cannot surface anything new.
    window.max_commits == max_commits
        || (max_commits >= window.max_commits && !window.more_commits_available)
}

fn run_log(
    runner: &GitRunner,
    repo: &Path,
    branch_name: &str,
    max_commits: usize,
    show_remote_branches: bool,
) -> Result<String> {
    let mut args = vec![
        "-c".to_string(),
        "color.ui=never".to_string(),
        "log".to_string(),
        "--date-order".to_string(),
        "--color=never".to_string(),
        "--no-show-signature".to_string(),
        LOG_FORMAT.to_string(),
        // One extra entry cheaply detects truncation.
        "-n".to_string(),
        (max_commits + 1).to_string(),
    ];
    if branch_name == ALL_BRANCHES {
        args.push("--branches".to_string());
        if show_remote_branches {
            args.push("--remotes".to_string());
        }
    } else {
        args.push(branch_name.to_string());
    }
    Ok(runner.exec(repo, &args, false)?.stdout)
}

fn decorate(commits: Vec<Commit>, ref_data: &RefData) -> Vec<CommitNode> {
    let mut by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, r) in ref_data.refs.iter().enumerate() {
        by_hash.entry(r.hash.as_str()).or_default().push(idx);
    }

    commits
        .into_iter()
        .map(|commit| {
            let refs = by_hash
                .get(commit.hash.as_str())
                .map(|indexes| {
                    indexes
                        .iter()
                        .map(|&idx| ref_data.refs[idx].clone())
                        .collect()
                })
                .unwrap_or_default();
            let current = ref_data.head.as_deref() == Some(commit.hash.as_str());
            CommitNode {
                commit,
                refs,
                current,
            }
        })
        .collect()
}
