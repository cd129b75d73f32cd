use git_object::Kind;

/// Errors raised while diffing, merging, or blaming.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected a {expected} object but found a {actual}")]
    UnexpectedObjectKind { expected: Kind, actual: Kind },
    #[error(transparent)]
    Odb(#[from] git_odb::Error),
    #[error(transparent)]
    Object(#[from] git_object::Error),
    #[error(transparent)]
    Traverse(#[from] git_traverse::Error),
}
