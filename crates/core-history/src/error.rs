use thiserror::Error;

use core_command::CommandError;
use core_persist::PersistError;

/// Error taxonomy surfaced by the history engine.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("attempted commit on detached HEAD with auto-branching disabled")]
    DetachedHeadNoBranch,
    #[error("redo is ambiguous: HEAD has {0} children")]
    AmbiguousRedo(usize),
    #[error("squash range is not a contiguous first-parent chain")]
    NonLinearRange,
    #[error("no such commit {0}")]
    UnknownCommit(String),
    #[error("no such branch {0}")]
    UnknownBranch(String),
    #[error("branch {0} already exists")]
    DuplicateBranch(String),
    #[error("branch {0} is protected and cannot be renamed or deleted")]
    ProtectedBranch(String),
    #[error("cannot delete or rename the current HEAD branch {0}")]
    CurrentBranch(String),
    #[error("cherry-pick/merge produced conflicts")]
    Conflicts(Vec<core_resolver::Conflict>),
    #[error("no parent to undo to")]
    NothingToUndo,
    #[error("no child to redo to")]
    NothingToRedo,
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("unknown command tag on import, commit {0} skipped")]
    SerializationError(String),
}
