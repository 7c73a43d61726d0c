use std::path::Path;

use crate::error::{GitScopeError, Result};
use crate::git::GitRunner;
use crate::log_parser::FIELD_SEP;
use crate::models::{CommitDetails, FileChange, FileChangeKind};

const DETAILS_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%B";

/// Fetches the full details of one commit, including its file changes.
/// Returns `None` when the hash is not (or no longer) reachable; the client's
/// fallback for that case is "nothing to show", not an error.
pub fn commit_details(
    runner: &GitRunner,
    repo: &Path,
    commit_hash: &str,
) -> Result<Option<CommitDetails>> {
    let header = runner.exec(
        repo,
        &[
            "-c".to_string(),
            "core.quotePath=false".to_string(),
            "show".to_string(),
            "--quiet".to_string(),
            DETAILS_FORMAT.to_string(),
            commit_hash.to_string(),
        ],
        true,
    )?;
    if !header.success() {
        return Ok(None);
    }
    let mut details = parse_details_header(&header.stdout)?;

    let name_status = show_against_parent(runner, repo, commit_hash, "--name-status")?;
    let numstat = show_against_parent(runner, repo, commit_hash, "--numstat")?;
    details.file_changes = merge_file_changes(
        parse_name_status(&name_status),
        parse_numstat(&numstat),
    );
    Ok(Some(details))
}

/// The patch for a single file change of a commit, for an external diff
/// viewer to present.
pub fn file_patch(
    runner: &GitRunner,
    repo: &Path,
    commit_hash: &str,
    old_file_path: &str,
    new_file_path: &str,
) -> Result<String> {
    let mut args = vec![
        "-c".to_string(),
        "core.quotePath=false".to_string(),
        "show".to_string(),
        "--patch".to_string(),
        "--format=".to_string(),
        "--no-color".to_string(),
        "--no-ext-diff".to_string(),
        "--find-renames".to_string(),
        commit_hash.to_string(),
        "--".to_string(),
        new_file_path.to_string(),
    ];
    if old_file_path != new_file_path {
        args.push(old_file_path.to_string());
    }
    Ok(runner.exec(repo, &args, false)?.stdout)
}

fn show_against_parent(
    runner: &GitRunner,
    repo: &Path,
    commit_hash: &str,
    stat_flag: &str,
) -> Result<String> {
    let out = runner.exec(
        repo,
        &[
            "-c".to_string(),
            "core.quotePath=false".to_string(),
            "show".to_string(),
            stat_flag.to_string(),
            "--format=".to_string(),
            "--find-renames".to_string(),
            commit_hash.to_string(),
        ],
        false,
    )?;
    Ok(out.stdout)
}

fn parse_details_header(stdout: &str) -> Result<CommitDetails> {
    let record = stdout.trim_matches(['\r', '\n', ' ']);
    let fields: Vec<&str> = record.splitn(7, FIELD_SEP).collect();
    if fields.len() != 7 {
        return Err(GitScopeError::Parse(format!(
            "expected 7 commit detail fields, got {}",
            fields.len()
        )));
    }
    let date = fields[4].parse::<i64>().map_err(|e| {
        GitScopeError::Parse(format!("invalid commit timestamp {:?}: {}", fields[4], e))
    })?;
    let parents = if fields[1].trim().is_empty() {
        Vec::new()
    } else {
        fields[1]
            .split_whitespace()
            .map(ToString::to_string)
            .collect()
    };
    Ok(CommitDetails {
        hash: fields[0].to_string(),
        parents,
        author: fields[2].to_string(),
        email: fields[3].to_string(),
        date,
        committer: fields[5].to_string(),
        body: fields[6].trim_end().to_string(),
        file_changes: Vec::new(),
    })
}

fn parse_name_status(stdout: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split('\t');
        let Some(status) = parts.next() else {
            continue;
        };
        let Some(first_path) = parts.next() else {
            continue;
        };
        let second_path = parts.next();

        // Rename statuses carry a similarity score ("R100"); the leading
        // letter is the change kind.
        let kind = match status.chars().next() {
            Some('A') => FileChangeKind::Added,
            Some('M') | Some('T') => FileChangeKind::Modified,
            Some('D') => FileChangeKind::Deleted,
            Some('R') => FileChangeKind::Renamed,
            Some('C') => FileChangeKind::Added,
            _ => continue,
        };
        let (old_file_path, new_file_path) = match (kind, second_path) {
            (FileChangeKind::Renamed, Some(new_path)) => {
                (first_path.to_string(), new_path.to_string())
            }
            _ => (first_path.to_string(), first_path.to_string()),
        };
        changes.push(FileChange {
            old_file_path,
            new_file_path,
            kind,
            additions: None,
            deletions: None,
        });
    }
    changes
}

// numstat and name-status list files in the same order, so counts are merged
// positionally. "-" counts mean git could not compute them (binary files).
fn parse_numstat(stdout: &str) -> Vec<(Option<u32>, Option<u32>)> {
    stdout
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            let mut parts = trimmed.splitn(3, '\t');
            let additions = parse_numstat_value(parts.next()?);
            let deletions = parse_numstat_value(parts.next()?);
            parts.next()?;
            Some((additions, deletions))
        })
        .collect()
}

fn parse_numstat_value(raw: &str) -> Option<u32> {
    if raw == "-" {
        return None;
    }
    raw.parse::<u32>().ok()
}

fn merge_file_changes(
    mut changes: Vec<FileChange>,
    counts: Vec<(Option<u32>, Option<u32>)>,
) -> Vec<FileChange> {
    for (change, (additions, deletions)) in changes.iter_mut().zip(counts) {
        change.additions = additions;
        change.deletions = deletions;
    }
    changes
}

#[cfg(test)]
mod tests {
    use crate::log_parser::FIELD_SEP;
    use crate::models::FileChangeKind;

    use super::{merge_file_changes, parse_details_header, parse_name_status, parse_numstat};

    #[test]
    fn parses_details_header_with_body() {
        let raw = format!(
            "aa{f}bb cc{f}Alice{f}alice@example.com{f}1700000000{f}Bob{f}subject line\n\nlonger body\n",
            f = FIELD_SEP
        );
        let details = parse_details_header(&raw).expect("parse header");
        assert_eq!(details.hash, "aa");
        assert_eq!(details.parents, vec!["bb", "cc"]);
        assert_eq!(details.committer, "Bob");
        assert_eq!(details.body, "subject line\n\nlonger body");
    }

    #[test]
    fn parses_name_status_including_renames() {
        let changes = parse_name_status("A\tadded.txt\nM\tsrc/lib.rs\nR087\told.rs\tnew.rs\nD\tgone\n");
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0].kind, FileChangeKind::Added);
        assert_eq!(changes[0].old_file_path, changes[0].new_file_path);
        assert_eq!(changes[2].kind, FileChangeKind::Renamed);
        assert_eq!(changes[2].old_file_path, "old.rs");
        assert_eq!(changes[2].new_file_path, "new.rs");
        assert_eq!(changes[3].kind, FileChangeKind::Deleted);
    }

    #[test]
    fn numstat_counts_merge_positionally_and_binary_stays_unset() {
        let changes = parse_name_status("M\ttext.txt\nM\timage.png\n");
        let counts = parse_numstat("3\t1\ttext.txt\n-\t-\timage.png\n");
        let merged = merge_file_changes(changes, counts);
        assert_eq!(merged[0].additions, Some(3));
        assert_eq!(merged[0].deletions, Some(1));
        assert_eq!(merged[1].additions, None);
        assert_eq!(merged[1].deletions, None);
    }
}
