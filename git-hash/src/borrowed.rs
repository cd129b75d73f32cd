use std::cmp::Ordering;

use crate::{Kind, ObjectId};

/// A borrowed object id, akin to how `str` relates to `String`.
///
/// Allows working with a `&[u8]` of hash bytes without forcing an owned allocation,
/// the way [`str`] does for UTF-8 byte slices.
#[allow(non_camel_case_types)]
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct oid {
    bytes: [u8],
}

impl oid {
    /// Interpret `bytes` as a borrowed hash without copying.
    ///
    /// # Panics
    /// If `bytes` isn't a length matching any known [`Kind`].
    pub fn from_bytes(bytes: &[u8]) -> &Self {
        assert!(
            Kind::from_hex_len(bytes.len() * 2).is_some(),
            "invalid hash length: {}",
            bytes.len()
        );
        // SAFETY: `oid` is `#[repr(transparent)]` over `[u8]`.
        #[allow(unsafe_code)]
        unsafe {
            &*(bytes as *const [u8] as *const oid)
        }
    }

    /// The kind of hash this is.
    pub fn kind(&self) -> Kind {
        Kind::from_hex_len(self.bytes.len() * 2).expect("validated at construction")
    }

    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Render the first `len` hex characters, the rest implied zero.
    pub fn to_hex_with_len(&self, len: usize) -> String {
        let full = self.to_hex();
        full[..len.min(full.len())].to_owned()
    }

    /// Copy into an owned [`ObjectId`].
    pub fn to_owned(&self) -> ObjectId {
        ObjectId::from_bytes(&self.bytes)
    }

    /// Whether every byte is zero, i.e. the null object id for this kind.
    pub fn is_null(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }
}

impl std::fmt::Debug for oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.to_hex())
    }
}

impl std::fmt::Display for oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<oid> for oid {
    fn as_ref(&self) -> &oid {
        self
    }
}

impl PartialEq<ObjectId> for oid {
    fn eq(&self, other: &ObjectId) -> bool {
        self.bytes == *other.as_slice()
    }
}

impl PartialOrd<ObjectId> for oid {
    fn partial_cmp(&self, other: &ObjectId) -> Option<Ordering> {
        self.bytes.partial_cmp(other.as_slice())
    }
}
