use std::collections::{BTreeMap, BTreeSet};

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_index::{Entry, State};
use git_object::tree::EntryMode;

use crate::trait_def::Worktree;
use crate::Error;

/// The index/worktree/HEAD comparison sets described for `git status`.
#[derive(Debug, Default, Clone)]
pub struct Status {
    pub added: Vec<BString>,
    pub changed: Vec<BString>,
    pub removed: Vec<BString>,
    pub missing: Vec<BString>,
    pub modified: Vec<BString>,
    pub untracked: Vec<BString>,
    pub untracked_folders: Vec<BString>,
    pub conflicting: Vec<BString>,
    pub ignored_not_in_index: Vec<BString>,
    pub assume_unchanged: Vec<BString>,
}

/// Compute [`Status`] from `headTreeId?`, `index` and `worktree`, per the set
/// definitions: `added`/`changed`/`removed` compare the index's merged view
/// against HEAD, `missing`/`modified` compare it against the worktree, and
/// `untracked`/`untrackedFolders`/`ignoredNotInIndex` look at worktree-only paths.
pub fn compute_status(
    head_tree: Option<&ObjectId>,
    index: &State,
    worktree: &dyn Worktree,
    odb: &dyn git_odb::Find,
) -> Result<Status, Error> {
    let head_entries = match head_tree {
        Some(tree_id) => {
            let mut scratch = State::new();
            git_index::read_tree(&mut scratch, odb, tree_id, true)?;
            scratch
                .entries()
                .map(|e| (e.path.clone(), (e.id, e.mode)))
                .collect::<BTreeMap<BString, (ObjectId, EntryMode)>>()
        }
        None => BTreeMap::new(),
    };

    let mut status = Status::default();
    let mut index_paths: BTreeSet<BString> = BTreeSet::new();

    for entry in index.entries() {
        index_paths.insert(entry.path.clone());
        if entry.is_conflicted() {
            continue;
        }
        match head_entries.get(&entry.path) {
            None => status.added.push(entry.path.clone()),
            Some((head_id, _)) if *head_id != entry.id => status.changed.push(entry.path.clone()),
            Some(_) => {}
        }
        if entry.assume_valid {
            status.assume_unchanged.push(entry.path.clone());
            continue;
        }
        classify_against_worktree(entry, worktree, &mut status)?;
    }

    for path in index.get_conflicted_paths() {
        status.conflicting.push(path);
    }

    for path in head_entries.keys() {
        let still_merged = index
            .entries()
            .any(|e| !e.is_conflicted() && e.path == *path);
        if !still_merged {
            status.removed.push(path.clone());
        }
    }

    let worktree_entries = worktree.walk()?;
    for entry in &worktree_entries {
        if entry.is_directory {
            let has_tracked_child = index_paths
                .iter()
                .any(|p| p.starts_with(entry.path.as_slice()) && p.get(entry.path.len()) == Some(&b'/'));
            if !has_tracked_child {
                status.untracked_folders.push(entry.path.clone());
            }
            continue;
        }
        let tracked = index_paths.contains(&entry.path);
        if entry.is_ignored {
            if !tracked {
                status.ignored_not_in_index.push(entry.path.clone());
            }
            continue;
        }
        if !tracked {
            status.untracked.push(entry.path.clone());
        }
    }

    Ok(status)
}

fn classify_against_worktree(entry: &Entry, worktree: &dyn Worktree, status: &mut Status) -> Result<(), Error> {
    match worktree.get_entry(&entry.path)? {
        None => status.missing.push(entry.path.clone()),
        Some(_) => {
            let current_hash = worktree.compute_hash(&entry.path)?;
            if current_hash != entry.id {
                status.modified.push(entry.path.clone());
            }
        }
    }
    Ok(())
}
