//! Turning a received pack byte stream into individually stored objects: the decode
//! half of the wire protocol's `PACK` state, and of any future `index-pack`-style
//! offline command.

use std::collections::HashMap;
use std::rc::Rc;

use git_hash::ObjectId;
use git_object::{Kind, Object};

use crate::data::{self, verify_trailer, Entries};
use crate::delta;
use crate::header::EntryKind;

/// The error returned while importing a pack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] data::Error),
    #[error(transparent)]
    Delta(#[from] delta::Error),
    #[error("ofs-delta at pack offset {0} has no earlier entry at the referenced base offset")]
    UnresolvedOfsDelta(u64),
    #[error("ref-delta base {0} could not be found in this pack or the destination store")]
    UnresolvedRefDelta(ObjectId),
    #[error(transparent)]
    Store(#[from] git_odb::Error),
}

/// Decode every entry of `pack` in order, resolving each delta against either an
/// earlier entry already seen in the same pack (by offset for ofs-delta, by id for
/// ref-delta) or, for a thin pack, an object already present in `odb`. Every resulting
/// object is stored into `odb` as it is resolved. Returns every id written, in the
/// order entries appeared in the pack.
pub fn import_pack<S: git_odb::Find + git_odb::Write>(pack: &[u8], odb: &S) -> Result<Vec<ObjectId>, Error> {
    verify_trailer(pack)?;

    let mut by_offset: HashMap<u64, (Kind, Rc<Vec<u8>>)> = HashMap::new();
    let mut by_id: HashMap<ObjectId, (Kind, Rc<Vec<u8>>)> = HashMap::new();
    let mut ids = Vec::new();

    for entry in Entries::new(pack)? {
        let entry = entry?;
        let pack_offset = entry.pack_offset;

        let (kind, bytes) = match entry.kind {
            EntryKind::OfsDelta { base_offset } => {
                let base_pack_offset =
                    pack_offset.checked_sub(base_offset).ok_or(Error::UnresolvedOfsDelta(pack_offset))?;
                let (base_kind, base_bytes) =
                    by_offset.get(&base_pack_offset).ok_or(Error::UnresolvedOfsDelta(pack_offset))?;
                (*base_kind, delta::apply(base_bytes, &entry.data)?)
            }
            EntryKind::RefDelta { base_id } => {
                let (base_kind, base_bytes) = resolve_ref_delta_base(&base_id, &by_id, odb)?;
                (base_kind, delta::apply(&base_bytes, &entry.data)?)
            }
            _ => (entry.kind.as_object_kind().expect("non-delta entry kinds always map to an object kind"), entry.data),
        };

        let bytes = Rc::new(bytes);
        let id = odb.store(kind, &bytes)?;
        by_offset.insert(pack_offset, (kind, bytes.clone()));
        by_id.insert(id, (kind, bytes));
        ids.push(id);
    }

    Ok(ids)
}

fn resolve_ref_delta_base<S: git_odb::Find>(
    base_id: &ObjectId,
    by_id: &HashMap<ObjectId, (Kind, Rc<Vec<u8>>)>,
    odb: &S,
) -> Result<(Kind, Rc<Vec<u8>>), Error> {
    if let Some((kind, bytes)) = by_id.get(base_id) {
        return Ok((*kind, bytes.clone()));
    }
    let object = odb.load(base_id).map_err(|_| Error::UnresolvedRefDelta(*base_id))?;
    Ok(match object {
        Object::Blob(bytes) => (Kind::Blob, Rc::new(bytes)),
        Object::Tree(tree) => (Kind::Tree, Rc::new(tree.to_bytes())),
        Object::Commit(commit) => (Kind::Commit, Rc::new(commit.to_bytes())),
        Object::Tag(tag) => (Kind::Tag, Rc::new(tag.to_bytes())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::PackWriter;
    use std::cell::RefCell;

    struct MemOdb(RefCell<HashMap<ObjectId, (Kind, Vec<u8>)>>);

    impl MemOdb {
        fn new() -> Self {
            MemOdb(RefCell::new(HashMap::new()))
        }
    }

    impl git_odb::Find for MemOdb {
        fn has(&self, id: &ObjectId) -> bool {
            self.0.borrow().contains_key(id)
        }
        fn load(&self, id: &ObjectId) -> Result<Object, git_odb::Error> {
            let map = self.0.borrow();
            let (kind, bytes) = map.get(id).ok_or(git_odb::Error::NotFound(*id))?;
            Object::from_bytes(*kind, bytes).map_err(|err| git_odb::Error::Corrupt { id: *id, reason: err.to_string() })
        }
        fn keys(&self) -> Result<Vec<ObjectId>, git_odb::Error> {
            Ok(self.0.borrow().keys().copied().collect())
        }
    }

    impl git_odb::Write for MemOdb {
        fn store(&self, kind: Kind, payload: &[u8]) -> Result<ObjectId, git_odb::Error> {
            let id = git_object::compute_hash(git_hash::Kind::Sha1, kind, payload);
            self.0.borrow_mut().insert(id, (kind, payload.to_vec()));
            Ok(id)
        }
    }

    #[test]
    fn round_trips_non_delta_objects_through_a_pack() {
        let mut writer = PackWriter::new();
        let blob_id_in_pack = writer.push(Kind::Blob, b"hello world".to_vec());
        let tree = git_object::Tree {
            entries: vec![git_object::tree::Entry {
                mode: git_object::tree::EntryMode::Blob,
                filename: "a.txt".into(),
                id: blob_id_in_pack,
            }],
        };
        writer.push(Kind::Tree, tree.to_bytes());
        let (pack_bytes, _placed) = writer.finalize();

        let odb = MemOdb::new();
        let imported = import_pack(&pack_bytes, &odb).unwrap();

        assert_eq!(imported.len(), 2);
        for id in &imported {
            assert!(odb.has(id));
        }
    }

    #[test]
    fn rejects_a_pack_with_a_corrupt_trailer() {
        let mut writer = PackWriter::new();
        writer.push(Kind::Blob, b"data".to_vec());
        let (mut pack_bytes, _) = writer.finalize();
        let last = pack_bytes.len() - 1;
        pack_bytes[last] ^= 0xff;

        let odb = MemOdb::new();
        assert!(import_pack(&pack_bytes, &odb).is_err());
    }
}
