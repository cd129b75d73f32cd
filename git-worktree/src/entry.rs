use bstr::BString;
use git_object::tree::EntryMode;

/// One entry discovered while walking a [`crate::Worktree`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WorktreeEntry {
    pub path: BString,
    pub mode: EntryMode,
    pub size: u64,
    pub mtime_seconds: i64,
    pub is_directory: bool,
    pub is_ignored: bool,
}
