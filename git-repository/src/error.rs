/// Errors raised while operating on a repository as a whole.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("repository is bare and has no worktree")]
    Bare,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ref(#[from] git_ref::Error),
    #[error(transparent)]
    Odb(#[from] git_odb::Error),
    #[error(transparent)]
    Object(#[from] git_object::Error),
    #[error(transparent)]
    Traverse(#[from] git_traverse::Error),
}
