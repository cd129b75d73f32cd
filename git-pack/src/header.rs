use std::io;

/// The type tag carried by a pack entry header, before any delta has been resolved.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntryKind {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Base is `base_offset` bytes before this entry's header, in the same pack.
    OfsDelta { base_offset: u64 },
    /// Base is the object with this id, possibly outside this pack (thin pack).
    RefDelta { base_id: git_hash::ObjectId },
}

impl EntryKind {
    /// The 3-bit type tag git stores in the first byte of an entry header.
    fn type_tag(&self) -> u8 {
        match self {
            EntryKind::Commit => 1,
            EntryKind::Tree => 2,
            EntryKind::Blob => 3,
            EntryKind::Tag => 4,
            EntryKind::OfsDelta { .. } => 6,
            EntryKind::RefDelta { .. } => 7,
        }
    }

    /// The object kind this entry decodes to, once any delta chain is resolved.
    pub fn as_object_kind(&self) -> Option<git_object::Kind> {
        Some(match self {
            EntryKind::Commit => git_object::Kind::Commit,
            EntryKind::Tree => git_object::Kind::Tree,
            EntryKind::Blob => git_object::Kind::Blob,
            EntryKind::Tag => git_object::Kind::Tag,
            EntryKind::OfsDelta { .. } | EntryKind::RefDelta { .. } => return None,
        })
    }

    pub fn from_object_kind(kind: git_object::Kind) -> Self {
        match kind {
            git_object::Kind::Commit => EntryKind::Commit,
            git_object::Kind::Tree => EntryKind::Tree,
            git_object::Kind::Blob => EntryKind::Blob,
            git_object::Kind::Tag => EntryKind::Tag,
        }
    }
}

/// The error returned while decoding an entry header.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown pack entry type tag {0}")]
    UnknownType(u8),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Read a pack entry header: the type-and-size byte(s), followed by an ofs-delta offset
/// or ref-delta id if the type calls for one. Returns the decoded kind and the
/// decompressed size of the (possibly still delta-encoded) payload that follows.
pub fn read_entry_header(mut read_u8: impl FnMut() -> io::Result<u8>) -> Result<(EntryKind, u64), Error> {
    let first = read_u8()?;
    let type_tag = (first >> 4) & 0b111;
    let mut size = (first & 0b1111) as u64;
    let mut shift = 4u32;
    let mut more = first & 0x80 != 0;
    while more {
        let byte = read_u8()?;
        size |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        more = byte & 0x80 != 0;
    }

    let kind = match type_tag {
        1 => EntryKind::Commit,
        2 => EntryKind::Tree,
        3 => EntryKind::Blob,
        4 => EntryKind::Tag,
        6 => EntryKind::OfsDelta {
            base_offset: read_ofs_delta_offset(&mut read_u8)?,
        },
        7 => {
            let mut id = [0u8; 20];
            for b in id.iter_mut() {
                *b = read_u8()?;
            }
            EntryKind::RefDelta {
                base_id: git_hash::ObjectId::from_bytes(&id),
            }
        }
        other => return Err(Error::UnknownType(other)),
    };
    Ok((kind, size))
}

/// Write the type-and-size header for `kind` with decompressed payload size `size`,
/// followed by the ofs/ref-delta base reference if applicable.
pub fn write_entry_header(out: &mut Vec<u8>, kind: &EntryKind, size: u64) {
    let type_tag = kind.type_tag();
    let mut value = size;
    let mut first = (type_tag << 4) | (value & 0b1111) as u8;
    value >>= 4;
    if value > 0 {
        first |= 0x80;
    }
    out.push(first);
    while value > 0 {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }

    match kind {
        EntryKind::OfsDelta { base_offset } => write_ofs_delta_offset(out, *base_offset),
        EntryKind::RefDelta { base_id } => out.extend_from_slice(base_id.as_slice()),
        _ => {}
    }
}

/// Git's peculiar "offset delta" varint: each continuation byte adds one before
/// shifting, so unlike a plain base-128 varint the encoding is not simply reversible
/// byte-by-byte. This matches `encode_in_pack_object_header` / `get_delta_hdr_size`
/// in git's own `builtin/pack-objects.c`.
fn read_ofs_delta_offset(read_u8: &mut impl FnMut() -> io::Result<u8>) -> Result<u64, Error> {
    let mut byte = read_u8()?;
    let mut offset = (byte & 0x7f) as u64;
    while byte & 0x80 != 0 {
        byte = read_u8()?;
        offset = ((offset + 1) << 7) | (byte & 0x7f) as u64;
    }
    Ok(offset)
}

fn write_ofs_delta_offset(out: &mut Vec<u8>, mut offset: u64) {
    let mut bytes = Vec::new();
    bytes.push((offset & 0x7f) as u8);
    offset >>= 7;
    while offset > 0 {
        offset -= 1;
        bytes.push(0x80 | (offset & 0x7f) as u8);
        offset >>= 7;
    }
    bytes.reverse();
    out.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(kind: EntryKind, size: u64) {
        let mut buf = Vec::new();
        write_entry_header(&mut buf, &kind, size);
        let mut pos = 0;
        let (decoded_kind, decoded_size) = read_entry_header(|| {
            let b = buf[pos];
            pos += 1;
            Ok(b)
        })
        .unwrap();
        assert_eq!(decoded_size, size);
        match (&kind, &decoded_kind) {
            (EntryKind::Commit, EntryKind::Commit) => {}
            (EntryKind::OfsDelta { base_offset: a }, EntryKind::OfsDelta { base_offset: b }) => assert_eq!(a, b),
            (EntryKind::RefDelta { base_id: a }, EntryKind::RefDelta { base_id: b }) => assert_eq!(a, b),
            _ => panic!("kind mismatch: {decoded_kind:?}"),
        }
    }

    #[test]
    fn small_and_large_sizes_roundtrip() {
        roundtrip(EntryKind::Blob, 0);
        roundtrip(EntryKind::Blob, 15);
        roundtrip(EntryKind::Tree, 16);
        roundtrip(EntryKind::Commit, 1_000_000);
    }

    #[test]
    fn ofs_delta_offset_roundtrips() {
        for offset in [0u64, 1, 127, 128, 16383, 16384, 2_097_151, 5_000_000] {
            roundtrip(EntryKind::OfsDelta { base_offset: offset }, 42);
        }
    }

    #[test]
    fn ref_delta_roundtrips() {
        roundtrip(
            EntryKind::RefDelta {
                base_id: git_hash::ObjectId::from_hex(b"94b9559bb20acc78fb6cf7a40536ec95f5a22412").unwrap(),
            },
            99,
        );
    }

    #[test]
    fn rejects_unknown_type() {
        let mut pos = 0usize;
        let buf = [0b0101_0000u8];
        let err = read_entry_header(|| {
            let b = buf[pos];
            pos += 1;
            Ok(b)
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnknownType(5)));
    }
}
