//! The four object kinds that make up a git repository's content-addressed store:
//! blobs, trees, commits, and annotated tags.
//!
//! Objects are parsed from and serialized to git's canonical byte representation; the
//! serialized form of a commit or tag must re-hash to the id it was loaded under
//! (round-trip stability is an invariant the object store relies on).
#![deny(unsafe_code)]

use git_hash::ObjectId;

pub mod commit;
pub mod tag;
pub mod tree;

pub use commit::Commit;
pub use git_actor as actor;
pub use tag::Tag;
pub use tree::Tree;

pub use bstr;

/// The kind of object stored under a given id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Opaque byte content.
    Blob,
    /// An ordered set of named, moded entries.
    Tree,
    /// A point in history: a tree plus parents, authorship, and a message.
    Commit,
    /// An annotated, signed reference to another object.
    Tag,
}

impl Kind {
    /// The lowercase name used in the loose-object header and pack entry type byte mapping.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Kind::Blob => "blob",
            Kind::Tree => "tree",
            Kind::Commit => "commit",
            Kind::Tag => "tag",
        }
    }

    /// Parse the lowercase type name used in the loose-object header.
    pub fn from_bytes(s: &[u8]) -> Option<Self> {
        Some(match s {
            b"blob" => Kind::Blob,
            b"tree" => Kind::Tree,
            b"commit" => Kind::Commit,
            b"tag" => Kind::Tag,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when decoding any of the four object kinds fails.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object is not valid UTF-8 where it must be: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),
    #[error("commit is missing its '{0}' field")]
    MissingCommitField(&'static str),
    #[error("tag is missing its '{0}' field")]
    MissingTagField(&'static str),
    #[error("object id could not be decoded: {0}")]
    Hash(#[from] hex::FromHexError),
    #[error("tree entry mode {0:?} is not a valid git mode")]
    InvalidMode(bstr::BString),
    #[error("signature could not be decoded: {0}")]
    Signature(#[from] git_actor::Error),
}

/// A typed, owned git object: the result of reading any id from the object store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Object {
    /// Opaque content.
    Blob(Vec<u8>),
    /// A directory listing.
    Tree(Tree),
    /// A commit.
    Commit(Commit),
    /// An annotated tag.
    Tag(Tag),
}

impl Object {
    /// The kind of this object.
    pub fn kind(&self) -> Kind {
        match self {
            Object::Blob(_) => Kind::Blob,
            Object::Tree(_) => Kind::Tree,
            Object::Commit(_) => Kind::Commit,
            Object::Tag(_) => Kind::Tag,
        }
    }

    /// Decode `data` as an object of kind `kind`.
    pub fn from_bytes(kind: Kind, data: &[u8]) -> Result<Self, Error> {
        Ok(match kind {
            Kind::Blob => Object::Blob(data.to_vec()),
            Kind::Tree => Object::Tree(Tree::from_bytes(data)?),
            Kind::Commit => Object::Commit(Commit::from_bytes(data)?),
            Kind::Tag => Object::Tag(Tag::from_bytes(data)?),
        })
    }

    /// Serialize this object into its canonical payload, i.e. the bytes that would
    /// follow `"<type> <size>\0"` in the loose-object framing.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Object::Blob(data) => data.clone(),
            Object::Tree(tree) => tree.to_bytes(),
            Object::Commit(commit) => commit.to_bytes(),
            Object::Tag(tag) => tag.to_bytes(),
        }
    }
}

/// Build the canonical loose-object frame `"<type> <size>\0<payload>"` around `payload`.
pub fn frame(kind: Kind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 24);
    out.extend_from_slice(kind.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(itoa::Buffer::new().format(payload.len()).as_bytes());
    out.push(0);
    out.extend_from_slice(payload);
    out
}

/// Compute the object id that `payload` of kind `kind` would be stored under.
pub fn compute_hash(hash_kind: git_hash::Kind, kind: Kind, payload: &[u8]) -> ObjectId {
    git_hash::hash_framed(hash_kind, &frame(kind, payload))
}
