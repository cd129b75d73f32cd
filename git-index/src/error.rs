/// Errors raised while building or reading the index.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot write a tree while unmerged (conflicted) entries remain")]
    UnmergedEntries,
    #[error(transparent)]
    Odb(#[from] git_odb::Error),
    #[error(transparent)]
    Object(#[from] git_object::Error),
}
