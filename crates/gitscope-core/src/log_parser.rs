use crate::error::{GitScopeError, Result};
use crate::models::Commit;

pub const FIELD_SEP: char = '\u{001f}';
pub const RECORD_SEP: char = '\u{001e}';

/// Pretty-format string matching [`parse_log_records`]: unit-separated
/// fields, record-separated commits.
pub const LOG_FORMAT: &str = "--pretty=format:%H%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%s%x1e";

pub fn parse_log_records(stdout: &str) -> Result<Vec<Commit>> {
    let mut commits = Vec::new();
    for raw_record in stdout.split(RECORD_SEP) {
        let record = raw_record.trim_matches(['\r', '\n', ' ']);
        if record.is_empty() {
            continue;
        }
        let fields: Vec<&str> = record.splitn(6, FIELD_SEP).collect();
        if fields.len() != 6 {
            return Err(GitScopeError::Parse(format!(
                "expected 6 fields, got {} in record {:?}",
                fields.len(),
                record
            )));
        }
        let date = fields[4].parse::<i64>().map_err(|e| {
            GitScopeError::Parse(format!("invalid author unix timestamp {:?}: {}", fields[4], e))
        })?;
        let parent_hashes = if fields[1].trim().is_empty() {
            Vec::new()
        } else {
            fields[1]
                .split_whitespace()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };

        commits.push(Commit {
            hash: fields[0].to_string(),
            parent_hashes,
            author: fields[2].to_string(),
            email: fields[3].to_string(),
            date,
            message: fields[5].to_string(),
        });
    }
    Ok(commits)
}
