use bstr::BString;
use git_hash::ObjectId;
use git_object::tree::EntryMode;

/// A conflict-free, "merged" entry. Conflicting entries carry [`Stage::Ours`] or
/// [`Stage::Theirs`] (or [`Stage::Base`]) instead.
pub const MERGED: u8 = 0;

/// One staged path: either the single merged version (stage 0) or one side of an
/// unresolved conflict (stages 1-3, matching `base`/`ours`/`theirs`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub path: BString,
    pub stage: u8,
    pub mode: EntryMode,
    pub id: ObjectId,
    /// `git update-index --assume-unchanged`: worktree comparisons for this entry are
    /// skipped and it is reported unconditionally unmodified.
    pub assume_valid: bool,
}

impl Entry {
    pub fn is_conflicted(&self) -> bool {
        self.stage != MERGED
    }
}

/// The three conflict stages a path can carry in addition to [`MERGED`].
pub mod stage {
    pub const BASE: u8 = 1;
    pub const OURS: u8 = 2;
    pub const THEIRS: u8 = 3;
}
