use std::path::Path;

use crate::error::Result;
use crate::git::GitRunner;
use crate::models::{GitRef, RefData, RefKind};

/// Loads the head pointer and the exhaustive ref set for the requested scope.
/// Resolves through attached and detached HEAD states transparently; the
/// caller only sees the checked-out hash.
pub fn load_refs(runner: &GitRunner, repo: &Path, show_remote_branches: bool) -> Result<RefData> {
    // show-ref exits 1 when the repository has no refs at all (fresh repo);
    // that case is a valid empty result, not a failure.
    let out = runner.exec(
        repo,
        &[
            "show-ref".to_string(),
            "--head".to_string(),
            "-d".to_string(),
        ],
        true,
    )?;
    if !out.success() && out.stdout.trim().is_empty() {
        return Ok(RefData {
            head: None,
            refs: Vec::new(),
        });
    }
    Ok(parse_show_ref(&out.stdout, show_remote_branches))
}

pub fn parse_show_ref(stdout: &str, show_remote_branches: bool) -> RefData {
    let mut head = None;
    let mut refs: Vec<GitRef> = Vec::new();

    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((hash, full_name)) = trimmed.split_once(' ') else {
            continue;
        };
        let hash = hash.trim();
        let full_name = full_name.trim();

        if full_name == "HEAD" {
            head = Some(hash.to_string());
            continue;
        }
        // Peeled rows point an annotated tag at the commit it tags; the
        // commit hash is the one the graph needs.
        if let Some(peeled) = full_name.strip_suffix("^{}") {
            if let Some(name) = peeled.strip_prefix("refs/tags/")
                && let Some(existing) = refs
                    .iter_mut()
                    .find(|r| r.kind == RefKind::Tag && r.name == name)
            {
                existing.hash = hash.to_string();
            }
            continue;
        }
        if let Some(name) = full_name.strip_prefix("refs/heads/") {
            refs.push(GitRef {
                hash: hash.to_string(),
                name: name.to_string(),
                kind: RefKind::Head,
            });
        } else if let Some(name) = full_name.strip_prefix("refs/tags/") {
            refs.push(GitRef {
                hash: hash.to_string(),
                name: name.to_string(),
                kind: RefKind::Tag,
            });
        } else if let Some(name) = full_name.strip_prefix("refs/remotes/") {
            if show_remote_branches {
                refs.push(GitRef {
                    hash: hash.to_string(),
                    name: name.to_string(),
                    kind: RefKind::Remote,
                });
            }
        }
        // refs/stash and unknown namespaces are not part of the graph scope.
    }

    RefData { head, refs }
}

/// Branch list plus the currently checked-out branch name (`None` when HEAD
/// is detached or the repository is empty).
pub fn load_branches(
    runner: &GitRunner,
    repo: &Path,
    show_remote_branches: bool,
) -> Result<(Vec<String>, Option<String>)> {
    let mut args = vec!["branch".to_string()];
    if show_remote_branches {
        args.push("-a".to_string());
    }
    let out = runner.exec(repo, &args, false)?;
    Ok(parse_branch_list(&out.stdout))
}

pub fn parse_branch_list(stdout: &str) -> (Vec<String>, Option<String>) {
    let mut branches = Vec::new();
    let mut head = None;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.contains(" -> ") {
            continue;
        }
        if let Some(current) = trimmed.strip_prefix("* ") {
            let current = current.trim();
            // Detached HEAD renders as "* (HEAD detached at <hash>)".
            if current.starts_with('(') {
                continue;
            }
            head = Some(current.to_string());
            branches.push(current.to_string());
            continue;
        }
        branches.push(trimmed.to_string());
    }

    (branches, head)
}

#[cfg(test)]
mod tests {
    use crate::models::RefKind;

    use super::{parse_branch_list, parse_show_ref};

    const SHOW_REF: &str = "\
1111111111111111111111111111111111111111 HEAD
1111111111111111111111111111111111111111 refs/heads/main
2222222222222222222222222222222222222222 refs/heads/dev
3333333333333333333333333333333333333333 refs/remotes/origin/main
4444444444444444444444444444444444444444 refs/tags/v1.0
5555555555555555555555555555555555555555 refs/tags/v1.0^{}
6666666666666666666666666666666666666666 refs/stash
";

    #[test]
    fn resolves_head_and_classifies_refs() {
        let data = parse_show_ref(SHOW_REF, true);
        assert_eq!(data.head.as_deref(), Some(&"1".repeat(40)[..]));

        let names: Vec<(&str, RefKind)> = data
            .refs
            .iter()
            .map(|r| (r.name.as_str(), r.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("main", RefKind::Head),
                ("dev", RefKind::Head),
                ("origin/main", RefKind::Remote),
                ("v1.0", RefKind::Tag),
            ]
        );
    }

    #[test]
    fn annotated_tag_uses_peeled_hash() {
        let data = parse_show_ref(SHOW_REF, false);
        let tag = data
            .refs
            .iter()
            .find(|r| r.kind == RefKind::Tag)
            .expect("tag present");
        assert_eq!(tag.hash, "5".repeat(40));
    }

    #[test]
    fn remote_refs_respect_scope_flag() {
        let data = parse_show_ref(SHOW_REF, false);
        assert!(data.refs.iter().all(|r| r.kind != RefKind::Remote));
    }

    #[test]
    fn empty_repo_has_no_head() {
        let data = parse_show_ref("", true);
        assert_eq!(data.head, None);
        assert!(data.refs.is_empty());
    }

    #[test]
    fn branch_list_marks_current_and_skips_symbolic() {
        let (branches, head) = parse_branch_list(
            "* main\n  dev\n  remotes/origin/HEAD -> origin/main\n  remotes/origin/main\n",
        );
        assert_eq!(head.as_deref(), Some("main"));
        assert_eq!(branches, vec!["main", "dev", "remotes/origin/main"]);
    }

    #[test]
    fn detached_head_yields_no_current_branch() {
        let (branches, head) = parse_branch_list("* (HEAD detached at 1a2b3c4)\n  main\n");
        assert_eq!(head, None);
        assert_eq!(branches, vec!["main"]);
    }
}
