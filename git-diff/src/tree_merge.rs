use std::collections::BTreeMap;

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_object::tree::EntryMode;
use git_object::{Kind, Object};

use crate::merge3::{merge_lines, ConflictStyle};
use crate::Error;

/// A leaf (non-tree) entry reached while flattening a tree: a blob, executable, symlink
/// or submodule gitlink, addressed by its full slash-separated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub(crate) mode: EntryMode,
    pub(crate) id: ObjectId,
}

/// One path where `ours` and `theirs` could not be merged automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: BString,
    pub base: Option<ObjectId>,
    pub ours: Option<ObjectId>,
    pub theirs: Option<ObjectId>,
}

/// The outcome of merging two trees against their common ancestor.
#[derive(Debug, Clone)]
pub struct TreeMergeResult {
    /// Paths resolved without conflict, in the shape a caller can feed into
    /// `git_index::State::set_entry` at stage 0.
    pub resolved: Vec<(BString, EntryMode, ObjectId)>,
    /// Paths left conflicting; the caller populates stages 1/2/3 from these.
    pub conflicts: Vec<Conflict>,
    /// For textual conflicts, the diff3-marked content that was stored as a blob, keyed
    /// by path, suitable for writing into a worktree so a user can resolve it by hand.
    pub conflict_markers: Vec<(BString, ObjectId)>,
}

impl TreeMergeResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

fn flatten_tree<S: git_odb::Find>(
    odb: &S,
    tree_id: &ObjectId,
    prefix: &BString,
    out: &mut BTreeMap<BString, Leaf>,
) -> Result<(), Error> {
    let object = odb.load(tree_id)?;
    let tree = match object {
        Object::Tree(tree) => tree,
        other => return Err(Error::UnexpectedObjectKind { expected: Kind::Tree, actual: other.kind() }),
    };
    for entry in &tree.entries {
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.filename);
        if entry.mode.is_tree() {
            flatten_tree(odb, &entry.id, &path, out)?;
        } else {
            out.insert(path, Leaf { mode: entry.mode, id: entry.id });
        }
    }
    Ok(())
}

pub(crate) fn flatten(odb: &impl git_odb::Find, tree_id: Option<&ObjectId>) -> Result<BTreeMap<BString, Leaf>, Error> {
    let mut out = BTreeMap::new();
    if let Some(id) = tree_id {
        flatten_tree(odb, id, &BString::from(Vec::new()), &mut out)?;
    }
    Ok(out)
}

/// Merge `ours` and `theirs` against their common ancestor `base` (`None` for a root
/// merge with no shared history), applying the base/ours/theirs decision table: sides
/// that only one branch touched win outright, sides both branches changed identically
/// merge silently, and sides both branches changed differently are left as conflicts
/// (with a best-effort textual diff3 merge attempted for blobs first).
pub fn merge_trees<S: git_odb::Find + git_odb::Write>(
    base: Option<&ObjectId>,
    ours: &ObjectId,
    theirs: &ObjectId,
    odb: &S,
) -> Result<TreeMergeResult, Error> {
    let base_entries = flatten(odb, base)?;
    let ours_entries = flatten(odb, Some(ours))?;
    let theirs_entries = flatten(odb, Some(theirs))?;

    let mut paths: Vec<&BString> = base_entries.keys().chain(ours_entries.keys()).chain(theirs_entries.keys()).collect();
    paths.sort();
    paths.dedup();

    let mut result = TreeMergeResult { resolved: Vec::new(), conflicts: Vec::new(), conflict_markers: Vec::new() };

    for path in paths {
        let base_leaf = base_entries.get(path).copied();
        let ours_leaf = ours_entries.get(path).copied();
        let theirs_leaf = theirs_entries.get(path).copied();
        merge_one_path(path, base_leaf, ours_leaf, theirs_leaf, odb, &mut result)?;
    }

    Ok(result)
}

fn merge_one_path<S: git_odb::Find + git_odb::Write>(
    path: &BString,
    base: Option<Leaf>,
    ours: Option<Leaf>,
    theirs: Option<Leaf>,
    odb: &S,
    result: &mut TreeMergeResult,
) -> Result<(), Error> {
    if ours == theirs {
        // Unchanged, or both sides made the identical change (including both deleting).
        if let Some(leaf) = ours {
            result.resolved.push((path.clone(), leaf.mode, leaf.id));
        }
        return Ok(());
    }

    match (base, ours, theirs) {
        // Only theirs touched it: take theirs, whether that's a modify or a delete.
        (b, o, t) if o == b => {
            if let Some(leaf) = t {
                result.resolved.push((path.clone(), leaf.mode, leaf.id));
            }
        }
        // Only ours touched it: take ours.
        (b, o, t) if t == b => {
            if let Some(leaf) = o {
                result.resolved.push((path.clone(), leaf.mode, leaf.id));
            }
        }
        // Both sides added the same path with different content, or both changed an
        // existing path differently: attempt a textual auto-merge, else conflict.
        (base_leaf, Some(ours_leaf), Some(theirs_leaf)) => {
            merge_both_present(path, base_leaf, ours_leaf, theirs_leaf, odb, result)?;
        }
        // One side deleted, the other modified: conflict, no auto-merge possible.
        (base_leaf, ours_leaf, theirs_leaf) => {
            result.conflicts.push(Conflict {
                path: path.clone(),
                base: base_leaf.map(|l| l.id),
                ours: ours_leaf.map(|l| l.id),
                theirs: theirs_leaf.map(|l| l.id),
            });
        }
    }
    Ok(())
}

fn merge_both_present<S: git_odb::Find + git_odb::Write>(
    path: &BString,
    base: Option<Leaf>,
    ours: Leaf,
    theirs: Leaf,
    odb: &S,
    result: &mut TreeMergeResult,
) -> Result<(), Error> {
    let textual = ours.mode == EntryMode::Blob || ours.mode == EntryMode::BlobExecutable;
    let same_mode = ours.mode == theirs.mode;
    if textual && same_mode {
        let base_bytes = match base {
            Some(leaf) => load_blob(odb, &leaf.id)?,
            None => Vec::new(),
        };
        let ours_bytes = load_blob(odb, &ours.id)?;
        let theirs_bytes = load_blob(odb, &theirs.id)?;
        let merged = merge_lines(&base_bytes, &ours_bytes, &theirs_bytes, ConflictStyle::Merge);
        let id = odb.store(Kind::Blob, &merged.content)?;
        if merged.has_conflicts {
            result.conflict_markers.push((path.clone(), id));
            result.conflicts.push(Conflict {
                path: path.clone(),
                base: base.map(|l| l.id),
                ours: Some(ours.id),
                theirs: Some(theirs.id),
            });
        } else {
            result.resolved.push((path.clone(), ours.mode, id));
        }
        return Ok(());
    }

    result.conflicts.push(Conflict { path: path.clone(), base: base.map(|l| l.id), ours: Some(ours.id), theirs: Some(theirs.id) });
    Ok(())
}

fn load_blob(odb: &impl git_odb::Find, id: &ObjectId) -> Result<Vec<u8>, Error> {
    match odb.load(id)? {
        Object::Blob(data) => Ok(data),
        other => Err(Error::UnexpectedObjectKind { expected: Kind::Blob, actual: other.kind() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemOdb {
        objects: RefCell<HashMap<ObjectId, (Kind, Vec<u8>)>>,
    }

    impl git_odb::Find for MemOdb {
        fn has(&self, id: &ObjectId) -> bool {
            self.objects.borrow().contains_key(id)
        }
        fn load(&self, id: &ObjectId) -> Result<Object, git_odb::Error> {
            let objects = self.objects.borrow();
            let (kind, data) = objects.get(id).ok_or_else(|| git_odb::Error::NotFound(*id))?;
            Object::from_bytes(*kind, data).map_err(|err| git_odb::Error::Corrupt { id: *id, reason: err.to_string() })
        }
        fn keys(&self) -> Result<Vec<ObjectId>, git_odb::Error> {
            Ok(self.objects.borrow().keys().copied().collect())
        }
    }

    impl git_odb::Write for MemOdb {
        fn store(&self, kind: Kind, payload: &[u8]) -> Result<ObjectId, git_odb::Error> {
            let id = git_object::compute_hash(git_hash::Kind::Sha1, kind, payload);
            self.objects.borrow_mut().insert(id, (kind, payload.to_vec()));
            Ok(id)
        }
    }

    fn blob(odb: &MemOdb, content: &[u8]) -> ObjectId {
        odb.store(Kind::Blob, content).unwrap()
    }

    fn tree(odb: &MemOdb, entries: Vec<(&str, EntryMode, ObjectId)>) -> ObjectId {
        let tree = git_object::Tree {
            entries: entries
                .into_iter()
                .map(|(name, mode, id)| git_object::tree::Entry { mode, filename: name.into(), id })
                .collect(),
        };
        odb.store(Kind::Tree, &tree.to_bytes()).unwrap()
    }

    #[test]
    fn change_on_only_one_side_wins_outright() {
        let odb = MemOdb::default();
        let base_blob = blob(&odb, b"a\n");
        let ours_blob = blob(&odb, b"a-changed\n");
        let base = tree(&odb, vec![("f.txt", EntryMode::Blob, base_blob)]);
        let ours = tree(&odb, vec![("f.txt", EntryMode::Blob, ours_blob)]);
        let theirs = base;

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(!result.has_conflicts());
        assert_eq!(result.resolved, vec![(BString::from("f.txt"), EntryMode::Blob, ours_blob)]);
    }

    #[test]
    fn non_overlapping_textual_changes_merge_silently() {
        let odb = MemOdb::default();
        let base_blob = blob(&odb, b"a\nb\nc\n");
        let ours_blob = blob(&odb, b"A\nb\nc\n");
        let theirs_blob = blob(&odb, b"a\nb\nC\n");
        let base = tree(&odb, vec![("f.txt", EntryMode::Blob, base_blob)]);
        let ours = tree(&odb, vec![("f.txt", EntryMode::Blob, ours_blob)]);
        let theirs = tree(&odb, vec![("f.txt", EntryMode::Blob, theirs_blob)]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(!result.has_conflicts());
        assert_eq!(result.resolved.len(), 1);
    }

    #[test]
    fn overlapping_textual_changes_produce_a_conflict_and_marker_blob() {
        let odb = MemOdb::default();
        let base_blob = blob(&odb, b"a\n");
        let ours_blob = blob(&odb, b"ours\n");
        let theirs_blob = blob(&odb, b"theirs\n");
        let base = tree(&odb, vec![("f.txt", EntryMode::Blob, base_blob)]);
        let ours = tree(&odb, vec![("f.txt", EntryMode::Blob, ours_blob)]);
        let theirs = tree(&odb, vec![("f.txt", EntryMode::Blob, theirs_blob)]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(result.has_conflicts());
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflict_markers.len(), 1);
    }

    #[test]
    fn deleted_by_us_modified_by_them_is_a_conflict() {
        let odb = MemOdb::default();
        let base_blob = blob(&odb, b"a\n");
        let theirs_blob = blob(&odb, b"a-changed\n");
        let base = tree(&odb, vec![("f.txt", EntryMode::Blob, base_blob)]);
        let ours = tree(&odb, vec![]);
        let theirs = tree(&odb, vec![("f.txt", EntryMode::Blob, theirs_blob)]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(result.has_conflicts());
        assert_eq!(result.conflicts[0].ours, None);
        assert_eq!(result.conflicts[0].theirs, Some(theirs_blob));
    }

    #[test]
    fn deleted_by_both_sides_removes_the_path_without_conflict() {
        let odb = MemOdb::default();
        let base_blob = blob(&odb, b"a\n");
        let base = tree(&odb, vec![("f.txt", EntryMode::Blob, base_blob)]);
        let ours = tree(&odb, vec![]);
        let theirs = tree(&odb, vec![]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(!result.has_conflicts());
        assert!(result.resolved.is_empty());
    }

    #[test]
    fn added_by_both_sides_with_identical_content_merges_silently() {
        let odb = MemOdb::default();
        let new_blob = blob(&odb, b"new\n");
        let base = tree(&odb, vec![]);
        let ours = tree(&odb, vec![("new.txt", EntryMode::Blob, new_blob)]);
        let theirs = tree(&odb, vec![("new.txt", EntryMode::Blob, new_blob)]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(!result.has_conflicts());
        assert_eq!(result.resolved, vec![(BString::from("new.txt"), EntryMode::Blob, new_blob)]);
    }

    #[test]
    fn added_by_both_sides_with_different_content_conflicts() {
        let odb = MemOdb::default();
        let ours_blob = blob(&odb, b"ours\n");
        let theirs_blob = blob(&odb, b"theirs\n");
        let base = tree(&odb, vec![]);
        let ours = tree(&odb, vec![("new.txt", EntryMode::Blob, ours_blob)]);
        let theirs = tree(&odb, vec![("new.txt", EntryMode::Blob, theirs_blob)]);

        let result = merge_trees(Some(&base), &ours, &theirs, &odb).unwrap();
        assert!(result.has_conflicts());
    }
}
