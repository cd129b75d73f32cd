//! Identify the actors (author, committer, tagger) behind git objects.
#![deny(unsafe_code)]

use bstr::{BString, ByteSlice};

mod signature;
pub use signature::{decode, Error};

pub use git_date::Time;

/// An identity with a point in time, as used by commits (`author`/`committer`) and
/// annotated tags (`tagger`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    /// The actor's name.
    pub name: BString,
    /// The actor's email.
    pub email: BString,
    /// The time the signature was made, including timezone offset.
    pub time: Time,
}

impl Signature {
    /// Serialize this signature into git's `Name <email> seconds tz` wire form.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(b" <");
        out.extend_from_slice(&self.email);
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.time.to_string().as_bytes());
    }

    /// Parse a signature from its wire form.
    pub fn from_bytes(input: &[u8]) -> Result<Self, Error> {
        signature::decode(input)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {}", self.name.as_bstr(), self.email.as_bstr(), self.time)
    }
}
