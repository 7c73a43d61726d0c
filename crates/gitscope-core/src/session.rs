use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{CommitNode, GitRef};

/// Cache signature of a loaded commit window. Two loads may share cached
/// results only when these match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowKey {
    pub branch_name: String,
    pub show_remote_branches: bool,
}

/// The last commit window served for a repository, together with the ref
/// state it was built from. Replaced wholesale, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphWindow {
    pub key: WindowKey,
    pub max_commits: usize,
    pub head: Option<String>,
    pub refs: Vec<GitRef>,
    pub commits: Vec<CommitNode>,
    pub more_commits_available: bool,
}

/// The last branch listing served for a repository, keyed by the remote
/// visibility it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCache {
    pub show_remote_branches: bool,
    pub branches: Vec<String>,
    pub head: Option<String>,
}

#[derive(Debug, Default)]
struct RepoCache {
    window: Option<GraphWindow>,
    branches: Option<BranchCache>,
}

/// Per-repository coordination point. `repo_lock` guards the shared working
/// tree: reads take shared access, mutating commands exclusive access. The
/// cache has its own short-lived mutex so read-locked loads can still record
/// their results.
#[derive(Debug, Default)]
pub struct RepoSession {
    repo_lock: RwLock<()>,
    cache: Mutex<RepoCache>,
}

impl RepoSession {
    pub fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        match self.repo_lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        match self.repo_lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn window(&self) -> Option<GraphWindow> {
        self.lock_cache().window.clone()
    }

    pub fn store_window(&self, window: GraphWindow) {
        self.lock_cache().window = Some(window);
    }

    pub fn cached_branches(&self, show_remote_branches: bool) -> Option<BranchCache> {
        self.lock_cache()
            .branches
            .clone()
            .filter(|cache| cache.show_remote_branches == show_remote_branches)
    }

    pub fn store_branches(&self, cache: BranchCache) {
        self.lock_cache().branches = Some(cache);
    }

    /// Wholesale invalidation after a successful mutating command or on an
    /// explicit hard load.
    pub fn invalidate(&self) {
        let mut cache = self.lock_cache();
        cache.window = None;
        cache.branches = None;
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, RepoCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Process-wide registry of open repositories. Entries are created on first
/// use and torn down when a repository is closed; sessions for different
/// repositories never contend.
#[derive(Debug, Default)]
pub struct SessionState {
    repos: Mutex<HashMap<PathBuf, Arc<RepoSession>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, repo: &Path) -> Arc<RepoSession> {
        let mut repos = self.lock_repos();
        repos
            .entry(repo.to_path_buf())
            .or_insert_with(|| Arc::new(RepoSession::default()))
            .clone()
    }

    pub fn close(&self, repo: &Path) {
        self.lock_repos().remove(repo);
    }

    pub fn known_repos(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock_repos().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn lock_repos(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<RepoSession>>> {
        match self.repos.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
