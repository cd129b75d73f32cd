use std::collections::BTreeMap;

use bstr::{BString, ByteSlice};

use crate::entry::{Entry, MERGED};

/// The staging index: a `(path, stage)`-keyed map of entries, kept in sorted order so
/// `entries()` and tree construction never need to re-sort.
#[derive(Debug, Clone, Default)]
pub struct State {
    entries: BTreeMap<(BString, u8), Entry>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    pub fn get_entry(&self, path: &[u8], stage: u8) -> Option<&Entry> {
        self.entries.get(&(BString::from(path), stage))
    }

    /// Insert or overwrite the entry at `(entry.path, entry.stage)`.
    pub fn set_entry(&mut self, entry: Entry) {
        self.entries.insert((entry.path.clone(), entry.stage), entry);
    }

    /// Remove every stage recorded for `path` (the merged entry as well as any
    /// conflict sides), returning how many entries were removed.
    pub fn remove_entry(&mut self, path: &[u8]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(entry_path, _), _| entry_path.as_bstr() != path.as_bstr());
        before - self.entries.len()
    }

    /// All entries, sorted by `(path, stage)`.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        self.entries.keys().any(|(_, stage)| *stage != MERGED)
    }

    /// Every distinct path that currently has at least one non-merged stage.
    pub fn get_conflicted_paths(&self) -> Vec<BString> {
        let mut paths: Vec<BString> = self
            .entries
            .keys()
            .filter(|(_, stage)| *stage != MERGED)
            .map(|(path, _)| path.clone())
            .collect();
        paths.dedup();
        paths
    }

    /// Replace every stage of `path` with a single merged `resolved` entry.
    pub fn resolve_conflict(&mut self, path: &[u8], resolved: Entry) {
        self.remove_entry(path);
        self.set_entry(resolved);
    }

    /// Start a from-scratch rebuild: entries pushed here only take effect once
    /// [`Builder::finish`] replaces this state's contents.
    pub fn create_builder(&self) -> Builder {
        Builder { entries: Vec::new() }
    }

    /// Start an incremental add/remove batch applied directly as each call is made.
    pub fn create_editor(&mut self) -> Editor<'_> {
        Editor { state: self }
    }
}

/// A replace-all rebuild of a [`State`]'s entries.
pub struct Builder {
    entries: Vec<Entry>,
}

impl Builder {
    pub fn add(&mut self, entry: Entry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Replace `state`'s entries with everything added to this builder.
    pub fn finish(self, state: &mut State) {
        state.entries = self.entries.into_iter().map(|e| ((e.path.clone(), e.stage), e)).collect();
    }
}

/// An incremental, immediately-applied add/remove batch over an existing [`State`].
pub struct Editor<'a> {
    state: &'a mut State,
}

impl<'a> Editor<'a> {
    pub fn add(&mut self, entry: Entry) -> &mut Self {
        self.state.set_entry(entry);
        self
    }

    pub fn remove(&mut self, path: &[u8]) -> &mut Self {
        self.state.remove_entry(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hash::ObjectId;
    use git_object::tree::EntryMode;

    fn entry(path: &str, stage: u8) -> Entry {
        Entry { path: path.into(), stage, mode: EntryMode::Blob, id: ObjectId::null(git_hash::Kind::Sha1), assume_valid: false }
    }

    #[test]
    fn set_then_get_entry() {
        let mut state = State::new();
        state.set_entry(entry("a.txt", 0));
        assert!(state.get_entry(b"a.txt", 0).is_some());
    }

    #[test]
    fn remove_entry_clears_every_stage() {
        let mut state = State::new();
        state.set_entry(entry("a.txt", 1));
        state.set_entry(entry("a.txt", 2));
        state.set_entry(entry("a.txt", 3));
        assert_eq!(state.remove_entry(b"a.txt"), 3);
        assert!(state.entries().next().is_none());
    }

    #[test]
    fn has_conflicts_detects_non_merged_stages() {
        let mut state = State::new();
        state.set_entry(entry("a.txt", 0));
        assert!(!state.has_conflicts());
        state.set_entry(entry("b.txt", 2));
        assert!(state.has_conflicts());
        assert_eq!(state.get_conflicted_paths(), vec![BString::from("b.txt")]);
    }

    #[test]
    fn resolve_conflict_collapses_stages_into_one_merged_entry() {
        let mut state = State::new();
        state.set_entry(entry("a.txt", 1));
        state.set_entry(entry("a.txt", 2));
        state.set_entry(entry("a.txt", 3));
        state.resolve_conflict(b"a.txt", entry("a.txt", 0));
        assert_eq!(state.entries().count(), 1);
        assert!(!state.has_conflicts());
    }

    #[test]
    fn builder_replaces_all_entries() {
        let mut state = State::new();
        state.set_entry(entry("old.txt", 0));
        let mut builder = state.create_builder();
        builder.add(entry("new.txt", 0));
        builder.finish(&mut state);
        assert!(state.get_entry(b"old.txt", 0).is_none());
        assert!(state.get_entry(b"new.txt", 0).is_some());
    }

    #[test]
    fn editor_applies_incrementally() {
        let mut state = State::new();
        state.set_entry(entry("keep.txt", 0));
        {
            let mut editor = state.create_editor();
            editor.add(entry("added.txt", 0));
            editor.remove(b"keep.txt");
        }
        assert!(state.get_entry(b"keep.txt", 0).is_none());
        assert!(state.get_entry(b"added.txt", 0).is_some());
    }
}
