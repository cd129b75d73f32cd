use bstr::BString;

/// Errors raised while reading or writing worktree state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path {0:?} does not exist in the worktree")]
    NotFound(BString),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Odb(#[from] git_odb::Error),
    #[error(transparent)]
    Object(#[from] git_object::Error),
    #[error(transparent)]
    Index(#[from] git_index::Error),
}
