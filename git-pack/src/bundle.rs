//! A pack paired with its index: the unit random access (`byId`) operates against.

use std::cell::RefCell;
use std::collections::HashSet;
use std::num::NonZeroUsize;

use git_hash::ObjectId;
use lru::LruCache;

use crate::data;
use crate::header::EntryKind;
use crate::index::IndexFile;

const DEFAULT_CACHE_CAPACITY: usize = 64;
const DEPTH_WARNING_THRESHOLD: usize = 50;

/// The error returned while resolving an object out of a [`Bundle`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] data::Error),
    #[error("object {0} is not present in this pack")]
    NotFound(ObjectId),
    #[error("delta base at pack offset {0} is out of range")]
    BaseOffsetOutOfRange(u64),
    #[error("ref-delta base {0} could not be resolved inside or outside this pack")]
    UnresolvedRefDelta(ObjectId),
    #[error("delta chain forms a cycle through pack offset {0}")]
    CycleDetected(u64),
    #[error(transparent)]
    Delta(#[from] crate::delta::Error),
}

/// A resolved object: its final kind and fully-applied bytes.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub kind: git_object::Kind,
    pub data: Vec<u8>,
    /// How many delta hops were resolved to produce this object; 0 for a base object.
    pub chain_depth: usize,
}

/// A pack file together with its index, supporting `byId` random access with delta
/// resolution and an LRU cache of already-resolved bases.
pub struct Bundle<'a> {
    pack: &'a [u8],
    index: IndexFile,
    cache: RefCell<LruCache<u64, (git_object::Kind, std::rc::Rc<Vec<u8>>)>>,
}

impl<'a> Bundle<'a> {
    pub fn new(pack: &'a [u8], index: IndexFile) -> Self {
        Bundle {
            pack,
            index,
            cache: RefCell::new(LruCache::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap())),
        }
    }

    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    /// Resolve `id` to its fully-materialized kind and bytes, following any delta chain.
    pub fn find(&self, id: &ObjectId) -> Result<Resolved, Error> {
        let located = self.index.lookup(id).ok_or_else(|| Error::NotFound(*id))?;
        let mut visiting = HashSet::new();
        let (kind, data, depth) = self.resolve_at(located.offset, &mut visiting, None)?;
        Ok(Resolved { kind, data: (*data).clone(), chain_depth: depth })
    }

    /// Resolve an object at a known pack offset, optionally falling back to
    /// `external_base` for ref-deltas whose base isn't in this pack (a thin pack).
    pub fn find_at_offset(
        &self,
        offset: u64,
        external_base: Option<&dyn Fn(&ObjectId) -> Option<(git_object::Kind, Vec<u8>)>>,
    ) -> Result<Resolved, Error> {
        let mut visiting = HashSet::new();
        let (kind, data, depth) = self.resolve_at(offset, &mut visiting, external_base)?;
        Ok(Resolved { kind, data: (*data).clone(), chain_depth: depth })
    }

    fn resolve_at(
        &self,
        offset: u64,
        visiting: &mut HashSet<u64>,
        external_base: Option<&dyn Fn(&ObjectId) -> Option<(git_object::Kind, Vec<u8>)>>,
    ) -> Result<(git_object::Kind, std::rc::Rc<Vec<u8>>, usize), Error> {
        if let Some((kind, data)) = self.cache.borrow_mut().get(&offset) {
            return Ok((*kind, data.clone(), 0));
        }
        if !visiting.insert(offset) {
            return Err(Error::CycleDetected(offset));
        }

        let entry = data::read_entry(self.pack, offset)?;
        let (kind, data, depth) = match entry.kind {
            EntryKind::Commit | EntryKind::Tree | EntryKind::Blob | EntryKind::Tag => {
                let kind = entry.kind.as_object_kind().expect("non-delta kind");
                (kind, std::rc::Rc::new(entry.data), 0)
            }
            EntryKind::OfsDelta { base_offset } => {
                let base_pos = offset.checked_sub(base_offset).ok_or(Error::BaseOffsetOutOfRange(offset))?;
                let (base_kind, base_data, base_depth) = self.resolve_at(base_pos, visiting, external_base)?;
                let applied = crate::delta::apply(&base_data, &entry.data)?;
                (base_kind, std::rc::Rc::new(applied), base_depth + 1)
            }
            EntryKind::RefDelta { base_id } => {
                let (base_kind, base_data, base_depth) = self.resolve_ref_base(&base_id, visiting, external_base)?;
                let applied = crate::delta::apply(&base_data, &entry.data)?;
                (base_kind, std::rc::Rc::new(applied), base_depth + 1)
            }
        };

        visiting.remove(&offset);
        if depth == DEPTH_WARNING_THRESHOLD {
            tracing::warn!(offset, depth, "delta chain depth reached warning threshold");
        }
        self.cache.borrow_mut().put(offset, (kind, data.clone()));
        Ok((kind, data, depth))
    }

    fn resolve_ref_base(
        &self,
        base_id: &ObjectId,
        visiting: &mut HashSet<u64>,
        external_base: Option<&dyn Fn(&ObjectId) -> Option<(git_object::Kind, Vec<u8>)>>,
    ) -> Result<(git_object::Kind, std::rc::Rc<Vec<u8>>, usize), Error> {
        if let Some(located) = self.index.lookup(base_id) {
            return self.resolve_at(located.offset, visiting, external_base);
        }
        if let Some(provider) = external_base {
            if let Some((kind, data)) = provider(base_id) {
                return Ok((kind, std::rc::Rc::new(data), 0));
            }
        }
        Err(Error::UnresolvedRefDelta(*base_id))
    }

    /// Resolve every object indexed by this bundle's pack index, in id order. Used by
    /// `importPack` to materialize and re-store each object in the destination odb.
    pub fn resolve_all(&self) -> impl Iterator<Item = Result<(ObjectId, Resolved), Error>> + '_ {
        self.index.ids().map(move |id| self.find(id).map(|resolved| (*id, resolved)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexFile;
    use crate::write::PackWriter;

    fn build_bundle(objects: Vec<(git_object::Kind, Vec<u8>)>) -> (Vec<u8>, IndexFile, Vec<ObjectId>) {
        let mut writer = PackWriter::new();
        let mut ids = Vec::new();
        for (kind, payload) in objects {
            ids.push(writer.push(kind, payload));
        }
        let (bytes, placed) = writer.finalize();
        let pack_checksum: [u8; 20] = bytes[bytes.len() - 20..].try_into().unwrap();
        let entries = placed.into_iter().map(|p| (p.id, p.offset, p.crc32)).collect();
        let index = IndexFile::from_entries(entries, pack_checksum);
        (bytes, index, ids)
    }

    #[test]
    fn resolves_non_delta_object() {
        let (bytes, index, ids) = build_bundle(vec![(git_object::Kind::Blob, b"hello".to_vec())]);
        let bundle = Bundle::new(&bytes, index);
        let resolved = bundle.find(&ids[0]).unwrap();
        assert_eq!(resolved.data, b"hello");
        assert_eq!(resolved.kind, git_object::Kind::Blob);
        assert_eq!(resolved.chain_depth, 0);
    }

    #[test]
    fn resolves_delta_chain() {
        let base = "common text shared across many similar blobs for testing".repeat(5);
        let mut variant = base.clone();
        variant.push_str(" plus an addition");
        let (bytes, index, ids) = build_bundle(vec![
            (git_object::Kind::Blob, base.clone().into_bytes()),
            (git_object::Kind::Blob, variant.clone().into_bytes()),
        ]);
        let bundle = Bundle::new(&bytes, index);
        let resolved = bundle.find(&ids[1]).unwrap();
        assert_eq!(resolved.data, variant.into_bytes());
    }

    #[test]
    fn missing_id_is_not_found() {
        let (bytes, index, _ids) = build_bundle(vec![(git_object::Kind::Blob, b"x".to_vec())]);
        let bundle = Bundle::new(&bytes, index);
        let missing = ObjectId::null(git_hash::Kind::Sha1);
        assert!(matches!(bundle.find(&missing), Err(Error::NotFound(_))));
    }
}
