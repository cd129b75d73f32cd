use std::collections::BTreeMap;

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_object::tree::EntryMode;
use git_object::{Kind, Tree};

use crate::entry::Entry;
use crate::state::State;
use crate::Error;

enum Node {
    Blob { mode: EntryMode, id: ObjectId },
    Tree(BTreeMap<BString, Node>),
}

fn insert_path(root: &mut BTreeMap<BString, Node>, components: &[&[u8]], mode: EntryMode, id: ObjectId) {
    let (head, rest) = components.split_first().expect("a path has at least one component");
    let key = BString::from(*head);
    if rest.is_empty() {
        root.insert(key, Node::Blob { mode, id });
        return;
    }
    let child = root.entry(key).or_insert_with(|| Node::Tree(BTreeMap::new()));
    match child {
        Node::Tree(children) => insert_path(children, rest, mode, id),
        Node::Blob { .. } => panic!("staged path has both a file and a directory at the same location"),
    }
}

fn write_node<S: git_odb::Write>(children: &BTreeMap<BString, Node>, odb: &S) -> Result<ObjectId, Error> {
    let mut entries = Vec::with_capacity(children.len());
    for (name, node) in children {
        let (mode, id) = match node {
            Node::Blob { mode, id } => (*mode, *id),
            Node::Tree(sub) => (EntryMode::Tree, write_node(sub, odb)?),
        };
        entries.push(git_object::tree::Entry { mode, filename: name.clone(), id });
    }
    let tree = Tree { entries };
    Ok(odb.store(Kind::Tree, &tree.to_bytes())?)
}

/// Bottom-up canonical tree construction from the stage-0 view. Fails with
/// [`Error::UnmergedEntries`] if any non-zero-stage entry is present.
pub fn write_tree<S: git_odb::Write>(state: &State, odb: &S) -> Result<ObjectId, Error> {
    if state.has_conflicts() {
        return Err(Error::UnmergedEntries);
    }
    let mut root: BTreeMap<BString, Node> = BTreeMap::new();
    for entry in state.entries() {
        let components: Vec<&[u8]> = entry.path.as_bstr().split(|&b| b == b'/').collect();
        insert_path(&mut root, &components, entry.mode, entry.id);
    }
    if root.is_empty() {
        return Ok(odb.store(Kind::Tree, &Tree::default().to_bytes())?);
    }
    write_node(&root, odb)
}

/// Replace the stage-0 view with a flattened walk of `tree_id`. Non-zero stages are
/// left untouched unless `clear` wipes the whole index first.
pub fn read_tree<S: git_odb::Find>(state: &mut State, odb: &S, tree_id: &ObjectId, clear: bool) -> Result<(), Error> {
    if clear {
        *state = State::new();
    } else {
        let stage0_paths: Vec<BString> = state
            .entries()
            .filter(|e| !e.is_conflicted())
            .map(|e| e.path.clone())
            .collect();
        for path in stage0_paths {
            state.remove_entry(&path);
        }
    }
    read_tree_into(state, odb, tree_id, b"")
}

fn read_tree_into<S: git_odb::Find>(state: &mut State, odb: &S, tree_id: &ObjectId, prefix: &[u8]) -> Result<(), Error> {
    let tree = match odb.load(tree_id)? {
        git_object::Object::Tree(tree) => tree,
        other => return Err(Error::Object(git_object::Error::MissingCommitField(other.kind().as_str()))),
    };
    for entry in &tree.entries {
        let mut path = prefix.to_vec();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.filename);

        if entry.mode.is_tree() {
            read_tree_into(state, odb, &entry.id, &path)?;
        } else {
            state.set_entry(Entry { path: BString::from(path), stage: crate::entry::MERGED, mode: entry.mode, id: entry.id, assume_valid: false });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// A tiny in-memory object store sufficient for exercising tree writing and reading.
    #[derive(Default)]
    struct MemOdb(RefCell<HashMap<ObjectId, (Kind, Vec<u8>)>>);

    impl git_odb::Find for MemOdb {
        fn has(&self, id: &ObjectId) -> bool {
            self.0.borrow().contains_key(id)
        }
        fn load(&self, id: &ObjectId) -> Result<git_object::Object, git_odb::Error> {
            let store = self.0.borrow();
            let (kind, data) = store.get(id).ok_or(git_odb::Error::NotFound(*id))?;
            git_object::Object::from_bytes(*kind, data)
                .map_err(|err| git_odb::Error::Corrupt { id: *id, reason: err.to_string() })
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

    fn blob_entry(path: &str, odb: &MemOdb, content: &[u8]) -> Entry {
        let id = odb.store(Kind::Blob, content).unwrap();
        Entry { path: path.into(), stage: 0, mode: EntryMode::Blob, id, assume_valid: false }
    }

    #[test]
    fn write_tree_builds_nested_directories() {
        let odb = MemOdb::default();
        let mut state = State::new();
        state.set_entry(blob_entry("README.md", &odb, b"hi"));
        state.set_entry(blob_entry("src/lib.rs", &odb, b"fn main() {}"));
        state.set_entry(blob_entry("src/util/mod.rs", &odb, b"// util"));

        let tree_id = write_tree(&state, &odb).unwrap();
        let root = match odb.load(&tree_id).unwrap() {
            git_object::Object::Tree(t) => t,
            _ => panic!("expected tree"),
        };
        assert_eq!(root.entries.len(), 2);
        assert!(root.entry(bstr::BStr::new(b"src")).unwrap().mode.is_tree());
    }

    #[test]
    fn write_tree_rejects_unmerged_entries() {
        let odb = MemOdb::default();
        let mut state = State::new();
        state.set_entry(Entry { path: "a.txt".into(), stage: 2, mode: EntryMode::Blob, id: ObjectId::null(git_hash::Kind::Sha1), assume_valid: false });
        assert!(matches!(write_tree(&state, &odb), Err(Error::UnmergedEntries)));
    }

    #[test]
    fn read_tree_then_write_tree_roundtrips() {
        let odb = MemOdb::default();
        let mut state = State::new();
        state.set_entry(blob_entry("a.txt", &odb, b"a"));
        state.set_entry(blob_entry("dir/b.txt", &odb, b"b"));
        let tree_id = write_tree(&state, &odb).unwrap();

        let mut reloaded = State::new();
        read_tree(&mut reloaded, &odb, &tree_id, true).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get_entry(b"dir/b.txt", 0).is_some());

        let rewritten = write_tree(&reloaded, &odb).unwrap();
        assert_eq!(rewritten, tree_id);
    }

    #[test]
    fn read_tree_without_clear_preserves_conflict_stages() {
        let odb = MemOdb::default();
        let mut state = State::new();
        state.set_entry(Entry { path: "conflict.txt".into(), stage: 2, mode: EntryMode::Blob, id: ObjectId::null(git_hash::Kind::Sha1), assume_valid: false });
        state.set_entry(blob_entry("a.txt", &odb, b"a"));
        let tree_id = write_tree(&{
            let mut merged_only = State::new();
            merged_only.set_entry(blob_entry("a.txt", &odb, b"a"));
            merged_only
        }, &odb).unwrap();

        read_tree(&mut state, &odb, &tree_id, false).unwrap();
        assert!(state.get_entry(b"conflict.txt", 2).is_some());
    }
}
