use git_hash::ObjectId;

use crate::FullName;

/// Errors surfaced by the reference store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reference {0} does not exist")]
    NotFound(FullName),
    #[error("reference {name} is corrupt: {reason}")]
    Corrupt { name: FullName, reason: String },
    #[error("symbolic reference chain starting at {0} exceeds the loop-detection limit")]
    LoopDetected(FullName),
    #[error("symbolic reference {0} points nowhere")]
    Unresolved(FullName),
    #[error("compare-and-swap on {name} failed: expected {expected:?}, found {actual:?}")]
    CasMismatch { name: FullName, expected: Option<ObjectId>, actual: Option<ObjectId> },
    #[error("reference {0} is locked by a concurrent writer")]
    LockHeld(FullName),
    #[error("{0} is not a valid reference name")]
    InvalidName(#[from] git_validate::reference::name::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
