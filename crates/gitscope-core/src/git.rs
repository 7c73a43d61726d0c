use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{GitScopeError, Result};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short human-readable failure text for a non-zero exit, derived from the
    /// diagnostic stream. Never raw binary and never more than a few lines.
    pub fn failure_status(&self) -> String {
        let primary = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let mut lines: Vec<&str> = primary
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(4)
            .collect();
        if lines.is_empty() {
            return match self.exit_code {
                Some(code) => format!("git exited with code {code}"),
                None => "git was terminated before exiting".to_string(),
            };
        }
        lines.dedup();
        lines.join("\n")
    }
}

/// Runs git against a single repository working tree. The only component that
/// touches the on-disk store; every call blocks until the child exits or the
/// timeout fires.
#[derive(Debug, Clone)]
pub struct GitRunner {
    git_binary: String,
    env: BTreeMap<String, String>,
    timeout: Duration,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
            env: BTreeMap::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn git_binary(&self) -> &str {
        &self.git_binary
    }

    pub fn validate_repo(&self, repo_path: &Path) -> Result<()> {
        if !repo_path.exists() || !repo_path.is_dir() {
            return Err(GitScopeError::InvalidRepository(repo_path.to_path_buf()));
        }
        let out = self.exec(
            repo_path,
            &["rev-parse".to_string(), "--is-inside-work-tree".to_string()],
            true,
        )?;
        if out.stdout.trim() == "true" {
            return Ok(());
        }
        Err(GitScopeError::InvalidRepository(repo_path.to_path_buf()))
    }

    pub fn exec(
        &self,
        repo_path: &Path,
        args: &[String],
        allow_non_zero: bool,
    ) -> Result<GitOutput> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.current_dir(repo_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let child = cmd
            .spawn()
            .map_err(|source| GitScopeError::io("spawning git command", source))?;
        let result = self.wait_with_timeout(child)?;
        if result.success() || allow_non_zero {
            return Ok(result);
        }
        warn!(
            args = ?args,
            exit_code = ?result.exit_code,
            "git command failed"
        );
        Err(GitScopeError::GitCommandFailed {
            program: self.git_binary.clone(),
            args: args.to_vec(),
            exit_code: result.exit_code,
            stderr: result.stderr,
            stdout: result.stdout,
        })
    }

    /// Mutating-command entry point: `None` means success, `Some(text)` is a
    /// user-displayable failure reason. A hung child is killed at the timeout
    /// and reported as an ordinary failure status.
    pub fn run_status(&self, repo_path: &Path, args: &[String]) -> Result<Option<String>> {
        let out = self.exec(repo_path, args, true)?;
        if out.success() {
            return Ok(None);
        }
        Ok(Some(out.failure_status()))
    }

    pub fn discover_repo_root(&self, start_path: &Path) -> Result<PathBuf> {
        let out = self.exec(
            start_path,
            &["rev-parse".to_string(), "--show-toplevel".to_string()],
            false,
        )?;
        let root = out.stdout.trim();
        if root.is_empty() {
            return Err(GitScopeError::InvalidRepository(start_path.to_path_buf()));
        }
        Ok(PathBuf::from(root))
    }

    // Pipes are drained on helper threads while the child is polled, so a
    // chatty process cannot deadlock on a full pipe buffer.
    fn wait_with_timeout(&self, mut child: Child) -> Result<GitOutput> {
        let stdout_rx = drain_pipe(child.stdout.take());
        let stderr_rx = drain_pipe(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let exit_code = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status.code(),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_rx.recv();
                        let stderr = stderr_rx.recv().unwrap_or_default();
                        return Ok(GitOutput {
                            stdout: String::new(),
                            stderr: format!(
                                "git did not finish within {}s and was terminated\n{}",
                                self.timeout.as_secs(),
                                stderr.trim()
                            ),
                            exit_code: None,
                        });
                    }
                    std::thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(source) => return Err(GitScopeError::io("waiting for git command", source)),
            }
        };

        Ok(GitOutput {
            stdout: stdout_rx.recv().unwrap_or_default(),
            stderr: stderr_rx.recv().unwrap_or_default(),
            exit_code,
        })
    }
}

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut reader) => {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = reader.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}
