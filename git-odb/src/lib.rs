//! The object store over raw byte storage: content-addressed reads and
//! writes dispatched across one loose-object directory and any number of packs.
#![deny(unsafe_code)]

pub mod loose;
pub mod store;

pub use store::Store;

use git_hash::ObjectId;
use git_object::{Kind, Object};

/// The taxonomy from the error handling design: every fallible operation here maps
/// onto one of these, never silently changing kind on the way up to a caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object {0} was not found")]
    NotFound(ObjectId),
    #[error("object {id} is corrupt: {reason}")]
    Corrupt { id: ObjectId, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The machine-readable error kind, matching §7 of the design.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::Corrupt { .. } => "Corrupt",
            Error::Io(_) => "Io",
        }
    }
}

/// Read access to the object store: `has`/`load`/`keys` over any object kind.
pub trait Find {
    /// Cheap existence check; must stay consistent with [`Find::load`].
    fn has(&self, id: &ObjectId) -> bool;
    /// Load and decode the object stored under `id`.
    fn load(&self, id: &ObjectId) -> Result<Object, Error>;
    /// Enumerate every id in the store. Order is unspecified but stable within a call.
    fn keys(&self) -> Result<Vec<ObjectId>, Error>;
}

/// Write access to the object store: canonicalize, hash, and store once.
pub trait Write {
    /// Store `payload` of kind `kind`, returning the id it hashes to. Storing the same
    /// bytes twice is idempotent.
    fn store(&self, kind: Kind, payload: &[u8]) -> Result<ObjectId, Error>;
}

/// GC-only removal, kept separate from [`Write`] so ordinary callers can't reach it.
pub trait Remove {
    fn remove(&self, id: &ObjectId) -> Result<bool, Error>;
}

/// A typed view over the store restricted to blobs: convenience wrapper matching the
/// `blobs`/`trees`/`commits`/`tags` sub-APIs named in the design.
pub struct Typed<'a, S> {
    store: &'a S,
    kind: Kind,
}

impl<'a, S: Find + Write> Typed<'a, S> {
    pub fn new(store: &'a S, kind: Kind) -> Self {
        Typed { store, kind }
    }

    pub fn store(&self, payload: &[u8]) -> Result<ObjectId, Error> {
        self.store.store(self.kind, payload)
    }

    pub fn load(&self, id: &ObjectId) -> Result<Object, Error> {
        let object = self.store.load(id)?;
        if object.kind() != self.kind {
            return Err(Error::Corrupt {
                id: *id,
                reason: format!("expected {}, found {}", self.kind, object.kind()),
            });
        }
        Ok(object)
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        self.store.has(id)
    }
}
