use crate::{Kind, ObjectId};

/// A streaming hasher producing an [`ObjectId`], used so blob-sized payloads never
/// need to be buffered in full just to be hashed.
pub struct Hasher {
    kind: Kind,
    inner: sha1_smol::Sha1,
}

impl Hasher {
    /// Create a new hasher for the given hash `kind`.
    pub fn new(kind: Kind) -> Self {
        match kind {
            Kind::Sha1 => Hasher {
                kind,
                inner: sha1_smol::Sha1::new(),
            },
        }
    }

    /// Feed more bytes into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize the hash and produce an [`ObjectId`].
    pub fn digest(self) -> ObjectId {
        match self.kind {
            Kind::Sha1 => ObjectId::Sha1(self.inner.digest().bytes()),
        }
    }
}

/// Hash a complete, canonically-framed object payload (`"<type> <size>\0<payload>"`) in one call.
pub fn hash_framed(kind: Kind, framed: &[u8]) -> ObjectId {
    let mut hasher = Hasher::new(kind);
    hasher.update(framed);
    hasher.digest()
}

/// Hash raw bytes with no framing, e.g. a pack file's trailer or an index file's own
/// checksum, neither of which is a git object.
pub fn hash_bytes(kind: Kind, data: &[u8]) -> ObjectId {
    let mut hasher = Hasher::new(kind);
    hasher.update(data);
    hasher.digest()
}
