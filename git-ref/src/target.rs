use bstr::ByteSlice;
use git_hash::ObjectId;

use crate::FullName;

/// What a reference points at: either an object directly, or another reference by name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Target {
    Direct(ObjectId),
    Symbolic(FullName),
}

impl Target {
    pub fn as_id(&self) -> Option<&ObjectId> {
        match self {
            Target::Direct(id) => Some(id),
            Target::Symbolic(_) => None,
        }
    }

    /// Render the loose-ref file content for this target, e.g. `"<hex>\n"` or
    /// `"ref: refs/heads/main\n"`.
    pub fn to_loose_bytes(&self) -> Vec<u8> {
        match self {
            Target::Direct(id) => {
                let mut out = id.to_hex().into_bytes();
                out.push(b'\n');
                out
            }
            Target::Symbolic(name) => format!("ref: {name}\n").into_bytes(),
        }
    }

    /// Parse the content of a loose ref file (trailing whitespace tolerated).
    pub fn from_loose_bytes(data: &[u8]) -> Result<Self, crate::Error> {
        let trimmed = data.trim_end();
        if let Some(rest) = trimmed.strip_prefix(b"ref: ") {
            let name = FullName::try_from(rest.trim().to_vec())?;
            return Ok(Target::Symbolic(name));
        }
        ObjectId::from_hex(trimmed)
            .map(Target::Direct)
            .map_err(|_| crate::Error::Corrupt {
                name: FullName(bstr::BString::from("<unknown>")),
                reason: "loose ref content is neither a hex object id nor a symbolic target".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_target_roundtrips() {
        let id = ObjectId::from_hex(b"0123456789abcdef0123456789abcdef01234567").unwrap();
        let target = Target::Direct(id);
        let bytes = target.to_loose_bytes();
        assert_eq!(Target::from_loose_bytes(&bytes).unwrap(), target);
    }

    #[test]
    fn symbolic_target_roundtrips() {
        let target = Target::Symbolic(FullName::try_from("refs/heads/main").unwrap());
        let bytes = target.to_loose_bytes();
        assert_eq!(bytes, b"ref: refs/heads/main\n");
        assert_eq!(Target::from_loose_bytes(&bytes).unwrap(), target);
    }
}
