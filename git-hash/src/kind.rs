/// The kind of hash used to identify git objects.
///
/// Only `Sha1` is implemented; `Sha256` is named so callers can detect and refuse
/// repositories that use it, per the object-format Non-goal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// 160 bit SHA-1 hash.
    Sha1,
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Sha1
    }
}

impl Kind {
    /// The amount of bytes the hash produces.
    pub const fn len_in_bytes(&self) -> usize {
        match self {
            Kind::Sha1 => 20,
        }
    }

    /// The amount of hexadecimal characters needed to display the hash fully.
    pub const fn len_in_hex(&self) -> usize {
        self.len_in_bytes() * 2
    }

    /// The longest known hash kind, used to size fixed buffers.
    pub const fn longest() -> Self {
        Kind::Sha1
    }

    /// Map a hex length back to the kind that produces it, if any.
    pub const fn from_hex_len(hex_len: usize) -> Option<Self> {
        match hex_len {
            40 => Some(Kind::Sha1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Sha1 => "SHA1",
        })
    }
}
