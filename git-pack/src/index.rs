//! Pack index v2: a fanout table over sorted object ids, paired CRC32s and pack offsets,
//! so a random object id can be mapped to a byte offset in the companion `.pack` file
//! without scanning it.

use git_hash::ObjectId;

const MAGIC: [u8; 4] = [0xff, 0x74, 0x4f, 0x63];
const VERSION: u32 = 2;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// The error returned while parsing a `.idx` file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("index file is truncated")]
    Truncated,
    #[error("index file does not start with the v2 magic bytes")]
    BadMagic,
    #[error("unsupported index version {0}, only v2 is implemented")]
    UnsupportedVersion(u32),
    #[error("index trailer checksum does not match its own content")]
    ChecksumMismatch,
}

/// A parsed pack index: object ids, their CRC32 (of the compressed pack entry), and
/// their byte offset into the pack, all kept in id-sorted order.
#[derive(Debug, Clone)]
pub struct IndexFile {
    fanout: [u32; 256],
    ids: Vec<ObjectId>,
    crc32: Vec<u32>,
    offsets: Vec<u64>,
    /// SHA-1 of the pack file this index was built for.
    pub pack_checksum: [u8; 20],
}

/// One located entry: an id's CRC32 and offset within the pack.
#[derive(Debug, Clone, Copy)]
pub struct Located {
    pub offset: u64,
    pub crc32: u32,
}

impl IndexFile {
    /// Parse a v2 index from its complete on-disk bytes (including both trailing
    /// checksums).
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 + 4 + 256 * 4 + 20 + 20 {
            return Err(Error::Truncated);
        }
        if data[0..4] != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = u32::from_be_bytes(data[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let mut fanout = [0u32; 256];
        let mut pos = 8;
        for slot in fanout.iter_mut() {
            *slot = u32::from_be_bytes(data[pos..pos + 4].try_into().unwrap());
            pos += 4;
        }
        let count = fanout[255] as usize;

        let ids_start = pos;
        let ids_end = ids_start + count * 20;
        let crc_end = ids_end + count * 4;
        let offsets_end = crc_end + count * 4;
        let checksum_end = offsets_end + 20 + 20;
        if data.len() < checksum_end {
            return Err(Error::Truncated);
        }

        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let start = ids_start + i * 20;
            ids.push(ObjectId::from_bytes(&data[start..start + 20]));
        }

        let mut crc32 = Vec::with_capacity(count);
        for i in 0..count {
            let start = ids_end + i * 4;
            crc32.push(u32::from_be_bytes(data[start..start + 4].try_into().unwrap()));
        }

        let mut small_offsets = Vec::with_capacity(count);
        for i in 0..count {
            let start = crc_end + i * 4;
            small_offsets.push(u32::from_be_bytes(data[start..start + 4].try_into().unwrap()));
        }

        let large_table_len = small_offsets.iter().filter(|o| o & LARGE_OFFSET_FLAG != 0).count();
        let large_start = offsets_end;
        let large_end = large_start + large_table_len * 8;
        if data.len() < large_end + 40 {
            return Err(Error::Truncated);
        }
        let mut large_offsets = Vec::with_capacity(large_table_len);
        for i in 0..large_table_len {
            let start = large_start + i * 8;
            large_offsets.push(u64::from_be_bytes(data[start..start + 8].try_into().unwrap()));
        }

        let mut offsets = Vec::with_capacity(count);
        let mut large_iter = large_offsets.into_iter();
        for &small in &small_offsets {
            if small & LARGE_OFFSET_FLAG != 0 {
                offsets.push(large_iter.next().ok_or(Error::Truncated)?);
            } else {
                offsets.push(small as u64);
            }
        }

        let content_end = large_end + 20;
        let pack_checksum: [u8; 20] = data[large_end..content_end].try_into().unwrap();
        let idx_checksum: [u8; 20] = data[content_end..content_end + 20].try_into().unwrap();
        let actual = git_hash::hash_bytes(git_hash::Kind::Sha1, &data[..content_end]);
        if actual.as_slice() != idx_checksum {
            return Err(Error::ChecksumMismatch);
        }

        Ok(IndexFile {
            fanout,
            ids,
            crc32,
            offsets,
            pack_checksum,
        })
    }

    /// Serialize to the on-disk v2 format, including both trailing checksums.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        for f in &self.fanout {
            out.extend_from_slice(&f.to_be_bytes());
        }
        for id in &self.ids {
            out.extend_from_slice(id.as_slice());
        }
        for c in &self.crc32 {
            out.extend_from_slice(&c.to_be_bytes());
        }

        let needs_large = self.offsets.iter().any(|&o| o > u32::MAX as u64 / 2);
        let mut large = Vec::new();
        for &offset in &self.offsets {
            if needs_large && offset >= LARGE_OFFSET_FLAG as u64 {
                let index = large.len() as u32;
                large.push(offset);
                out.extend_from_slice(&(index | LARGE_OFFSET_FLAG).to_be_bytes());
            } else {
                out.extend_from_slice(&(offset as u32).to_be_bytes());
            }
        }
        for offset in large {
            out.extend_from_slice(&offset.to_be_bytes());
        }

        out.extend_from_slice(&self.pack_checksum);
        let idx_checksum = git_hash::hash_bytes(git_hash::Kind::Sha1, &out);
        out.extend_from_slice(idx_checksum.as_slice());
        out
    }

    /// Build an index from `(id, offset, crc32)` triples, which must already be unique
    /// by id. Entries are sorted into id order.
    pub fn from_entries(mut entries: Vec<(ObjectId, u64, u32)>, pack_checksum: [u8; 20]) -> Self {
        entries.sort_by(|a, b| a.0.as_slice().cmp(b.0.as_slice()));

        let mut fanout = [0u32; 256];
        let mut ids = Vec::with_capacity(entries.len());
        let mut crc32 = Vec::with_capacity(entries.len());
        let mut offsets = Vec::with_capacity(entries.len());
        for (id, offset, crc) in entries {
            let first_byte = id.as_slice()[0] as usize;
            for slot in fanout.iter_mut().skip(first_byte) {
                *slot += 1;
            }
            ids.push(id);
            crc32.push(crc);
            offsets.push(offset);
        }

        IndexFile {
            fanout,
            ids,
            crc32,
            offsets,
            pack_checksum,
        }
    }

    /// Number of objects indexed.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Find `id`'s offset and CRC32 using the fanout table to narrow the binary search.
    pub fn lookup(&self, id: &ObjectId) -> Option<Located> {
        let first_byte = id.as_slice()[0] as usize;
        let lo = if first_byte == 0 { 0 } else { self.fanout[first_byte - 1] as usize };
        let hi = self.fanout[first_byte] as usize;
        let slice = &self.ids[lo..hi];
        let pos = slice.binary_search_by(|candidate| candidate.as_slice().cmp(id.as_slice())).ok()?;
        let index = lo + pos;
        Some(Located {
            offset: self.offsets[index],
            crc32: self.crc32[index],
        })
    }

    /// Iterate all indexed ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = byte;
        bytes[19] = byte;
        ObjectId::from_bytes(&bytes)
    }

    #[test]
    fn roundtrip_through_bytes() {
        let entries = vec![(id(0x10), 100, 0xaaaa_aaaa), (id(0x01), 50, 0xbbbb_bbbb), (id(0x10), 200, 0xcccc_cccc)];
        // two entries share first byte 0x10 but differ elsewhere
        let mut entries = entries;
        entries[2].0.as_mut_slice()[5] = 0xff;

        let index = IndexFile::from_entries(entries.clone(), [7u8; 20]);
        let bytes = index.to_bytes();
        let parsed = IndexFile::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.len(), 3);
        for (expected_id, expected_offset, expected_crc) in &entries {
            let located = parsed.lookup(expected_id).unwrap();
            assert_eq!(located.offset, *expected_offset);
            assert_eq!(located.crc32, *expected_crc);
        }
    }

    #[test]
    fn lookup_of_missing_id_is_none() {
        let index = IndexFile::from_entries(vec![(id(0x01), 1, 1)], [0u8; 20]);
        assert!(index.lookup(&id(0x99)).is_none());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 4 + 4 + 256 * 4 + 40];
        assert!(matches!(IndexFile::from_bytes(&bytes), Err(Error::BadMagic)));
    }

    #[test]
    fn large_offsets_roundtrip() {
        let big_offset = (LARGE_OFFSET_FLAG as u64) + 10;
        let entries = vec![(id(0x01), big_offset, 1), (id(0x02), 5, 2)];
        let index = IndexFile::from_entries(entries, [1u8; 20]);
        let bytes = index.to_bytes();
        let parsed = IndexFile::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.lookup(&id(0x01)).unwrap().offset, big_offset);
        assert_eq!(parsed.lookup(&id(0x02)).unwrap().offset, 5);
    }
}
