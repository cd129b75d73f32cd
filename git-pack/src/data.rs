//! The pack file itself: `"PACK" | version=u32be(2) | count=u32be | entry* | sha1(20B)`.

use flate2::{Decompress, FlushDecompress, Status};

use crate::header::{self, EntryKind};

const MAGIC: &[u8; 4] = b"PACK";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 12;

/// The error returned while reading a pack file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pack file is too short to contain a header and trailer")]
    Truncated,
    #[error("pack file does not start with the 'PACK' signature")]
    BadMagic,
    #[error("unsupported pack version {0}, only version 2 is implemented")]
    UnsupportedVersion(u32),
    #[error("pack entry header is malformed: {0}")]
    Header(#[from] header::Error),
    #[error("zlib stream for entry at offset {offset} is corrupt: {source}")]
    Inflate {
        offset: u64,
        #[source]
        source: flate2::DecompressError,
    },
    #[error("zlib stream for entry at offset {0} ended without producing a result")]
    InflateStalled(u64),
    #[error("pack trailer checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// A single decoded pack entry: its header-declared kind plus the still possibly
/// delta-encoded payload bytes, before any base resolution.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Byte offset of this entry's header within the pack.
    pub pack_offset: u64,
    pub kind: EntryKind,
    /// The inflated payload: raw object bytes for non-delta kinds, a delta
    /// instruction stream for `OfsDelta`/`RefDelta`.
    pub data: Vec<u8>,
    /// Total bytes this entry occupies in the pack (header + compressed payload).
    pub size_in_pack: u64,
}

/// Parse the 12-byte pack header, returning the declared object count.
pub fn parse_header(data: &[u8]) -> Result<u32, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::Truncated);
    }
    if &data[0..4] != MAGIC {
        return Err(Error::BadMagic);
    }
    let version = u32::from_be_bytes(data[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(u32::from_be_bytes(data[8..12].try_into().unwrap()))
}

/// Verify the trailing SHA-1 covers every byte preceding it.
pub fn verify_trailer(data: &[u8]) -> Result<(), Error> {
    if data.len() < HEADER_LEN + 20 {
        return Err(Error::Truncated);
    }
    let content = &data[..data.len() - 20];
    let expected = &data[data.len() - 20..];
    let actual = git_hash::hash_bytes(git_hash::Kind::Sha1, content);
    if actual.as_slice() != expected {
        return Err(Error::ChecksumMismatch {
            expected: hex::encode(expected),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}

/// Decode the entry starting at byte `offset`, returning it alongside the offset of
/// the next entry.
pub fn read_entry(data: &[u8], offset: u64) -> Result<RawEntry, Error> {
    let start = offset as usize;
    let mut pos = start;
    let (kind, decompressed_size) = header::read_entry_header(|| {
        let byte = *data.get(pos).ok_or(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated header"))?;
        pos += 1;
        Ok(byte)
    })?;

    let (payload, compressed_len) = inflate_at(data, pos, offset)?;
    if payload.len() as u64 != decompressed_size {
        // Pack entries record the decompressed size in the header; trust inflate's
        // actual output length if they disagree rather than truncating silently.
        tracing::debug!(offset, declared = decompressed_size, actual = payload.len(), "pack entry size mismatch");
    }
    pos += compressed_len;

    Ok(RawEntry {
        pack_offset: offset,
        kind,
        data: payload,
        size_in_pack: (pos - start) as u64,
    })
}

fn inflate_at(data: &[u8], start: usize, entry_offset: u64) -> Result<(Vec<u8>, usize), Error> {
    let mut decompress = Decompress::new(true);
    let mut out = Vec::new();
    let mut buf = [0u8; 8 * 1024];
    let mut pos = start;

    loop {
        let input = data.get(pos..).unwrap_or_default();
        let before_in = decompress.total_in();
        let before_out = decompress.total_out();
        let status = decompress
            .decompress(input, &mut buf, FlushDecompress::None)
            .map_err(|source| Error::Inflate { offset: entry_offset, source })?;
        let consumed = (decompress.total_in() - before_in) as usize;
        let produced = (decompress.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        pos += consumed;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if consumed == 0 && produced == 0 {
                    return Err(Error::InflateStalled(entry_offset));
                }
            }
        }
    }
    Ok((out, pos - start))
}

/// A streaming, in-order iterator over every entry in a pack, used for `importPack`
/// and full scans. Random access should go through [`crate::bundle::Bundle`] instead.
pub struct Entries<'a> {
    data: &'a [u8],
    pos: u64,
    remaining: u32,
}

impl<'a> Entries<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let count = parse_header(data)?;
        Ok(Entries { data, pos: HEADER_LEN as u64, remaining: count })
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<RawEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match read_entry(self.data, self.pos) {
            Ok(entry) => {
                self.pos += entry.size_in_pack;
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::PackWriter;

    #[test]
    fn streams_entries_in_order() {
        let mut writer = PackWriter::new();
        writer.push(git_object::Kind::Blob, b"hello".to_vec());
        writer.push(git_object::Kind::Blob, b"world".to_vec());
        let (bytes, _ids) = writer.finalize();

        verify_trailer(&bytes).unwrap();
        let entries: Vec<_> = Entries::new(&bytes).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data, b"hello");
        assert_eq!(entries[1].data, b"world");
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 32];
        assert!(matches!(parse_header(&bytes), Err(Error::BadMagic)));
    }
}
