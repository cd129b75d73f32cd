//! Borrowed and owned object identifiers.
//!
//! The object identifier is a hex-encoded SHA-1 of the git canonical serialization
//! of an object (`"<type> <size>\0<payload>"`). Equality is hex-string equality,
//! so a 40-character id and a resolvable unambiguous prefix of it are distinct
//! *types* here ([`ObjectId`] vs. [`Prefix`]), but compare equal where they refer
//! to the same object.

#![deny(unsafe_code)]

mod borrowed;
mod hasher;
mod kind;
mod owned;

pub use borrowed::oid;
pub use hasher::{hash_bytes, hash_framed, Hasher};
pub use kind::Kind;
pub use owned::{prefix::Prefix, ObjectId};

/// Re-export of the `hex` crate's encode/decode error for callers matching on it.
pub mod decode {
    pub use hex::FromHexError as Error;
}
