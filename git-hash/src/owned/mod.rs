use std::{borrow::Borrow, cmp::Ordering, ops::Deref};

use crate::{oid, Kind};

pub mod prefix;

/// An owned hash of an object, as calculated by a hash function like SHA-1.
///
/// Like [`oid`][crate::oid] but owning its storage; this is the type stored in
/// tree entries, commit parent lists, ref targets, and reflog entries.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectId {
    /// A SHA-1 hash.
    Sha1([u8; 20]),
}

impl ObjectId {
    /// The all-zero id for `kind`, used as a sentinel (e.g. the old-id of a ref creation).
    pub fn null(kind: Kind) -> Self {
        match kind {
            Kind::Sha1 => ObjectId::Sha1([0; 20]),
        }
    }

    /// The kind of hash this is.
    pub fn kind(&self) -> Kind {
        match self {
            ObjectId::Sha1(_) => Kind::Sha1,
        }
    }

    /// Copy `bytes` into a new id matching its length.
    ///
    /// # Panics
    /// If `bytes.len()` doesn't match a known [`Kind`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes.len() {
            20 => {
                let mut buf = [0; 20];
                buf.copy_from_slice(bytes);
                ObjectId::Sha1(buf)
            }
            other => panic!("invalid hash length: {other}"),
        }
    }

    /// Parse a lowercase (or mixed-case) hex string into a full-length id.
    pub fn from_hex(hex: &[u8]) -> Result<Self, hex::FromHexError> {
        use hex::FromHex;
        match hex.len() {
            40 => {
                let bytes: [u8; 20] = FromHex::from_hex(hex)?;
                Ok(ObjectId::Sha1(bytes))
            }
            _ => Err(hex::FromHexError::InvalidStringLength),
        }
    }

    /// Borrow as a slice of raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ObjectId::Sha1(b) => b,
        }
    }

    /// Borrow as a mutable slice of raw bytes, used by [`prefix::Prefix::new`].
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ObjectId::Sha1(b) => b,
        }
    }

    /// Borrow as the unsized [`oid`][crate::oid] type.
    pub fn as_oid(&self) -> &oid {
        self
    }

    /// Render as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }

    /// Render the first `len` hex characters.
    pub fn to_hex_with_len(&self, len: usize) -> String {
        self.as_oid().to_hex_with_len(len)
    }

    /// Whether this is the all-zero sentinel id.
    pub fn is_null(&self) -> bool {
        self.as_slice().iter().all(|b| *b == 0)
    }
}

impl Deref for ObjectId {
    type Target = oid;

    fn deref(&self) -> &Self::Target {
        oid::from_bytes(self.as_slice())
    }
}

impl Borrow<oid> for ObjectId {
    fn borrow(&self) -> &oid {
        self
    }
}

impl AsRef<oid> for ObjectId {
    fn as_ref(&self) -> &oid {
        self
    }
}

impl PartialEq<oid> for ObjectId {
    fn eq(&self, other: &oid) -> bool {
        self.as_slice() == other.as_bytes()
    }
}

impl PartialOrd<oid> for ObjectId {
    fn partial_cmp(&self, other: &oid) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_bytes())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.to_hex())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::from_hex(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_hex(b"94b9559bb20acc78fb6cf7a40536ec95f5a22412").unwrap();
        assert_eq!(id.to_hex(), "94b9559bb20acc78fb6cf7a40536ec95f5a22412");
        assert_eq!(id.kind(), Kind::Sha1);
    }

    #[test]
    fn null_is_all_zero() {
        assert!(ObjectId::null(Kind::Sha1).is_null());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(ObjectId::from_hex(b"abcd").is_err());
    }
}
