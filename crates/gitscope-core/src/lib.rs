pub mod details;
pub mod dispatcher;
pub mod error;
pub mod git;
pub mod graph;
pub mod log_parser;
pub mod models;
pub mod protocol;
pub mod refs;
pub mod session;
pub mod settings;

pub use dispatcher::{Clipboard, Dispatcher, MemoryClipboard, NoClipboard};
pub use error::{GitScopeError, Result};
pub use git::{GitOutput, GitRunner};
pub use graph::{ALL_BRANCHES, load_commits};
pub use models::{
    Commit, CommitBatch, CommitDetails, CommitNode, FileChange, FileChangeKind, GitRef, RefData,
    RefKind, ResetMode,
};
pub use protocol::{Request, Response};
pub use refs::load_refs;
pub use session::{BranchCache, GraphWindow, RepoSession, SessionState, WindowKey};
pub use settings::{DateFormat, GraphStyle, SettingsStore, ViewSettings};
