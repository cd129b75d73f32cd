use bstr::BString;
use git_hash::ObjectId;

use crate::entry::WorktreeEntry;
use crate::Error;

/// Options controlling how [`Worktree::checkout_tree`] and
/// [`Worktree::checkout_paths`] reconcile existing worktree content.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutOptions {
    /// Overwrite files already present at the destination path instead of failing.
    pub overwrite_existing: bool,
}

/// The materialized file hierarchy corresponding to some tree object.
///
/// Implementations must be object-safe: the status calculator and checkout
/// machinery operate over `&dyn Worktree` so callers can swap a filesystem
/// worktree for an in-memory test double without generics leaking out.
pub trait Worktree {
    /// The worktree's root directory, or `None` for a bare repository.
    fn get_root(&self) -> Option<&std::path::Path>;

    /// Lazily enumerate every entry below the root, honoring ignore rules.
    fn walk(&self) -> Result<Vec<WorktreeEntry>, Error>;

    fn get_entry(&self, path: &[u8]) -> Result<Option<WorktreeEntry>, Error>;

    /// The blob id a checkout of `path` would currently produce.
    fn compute_hash(&self, path: &[u8]) -> Result<ObjectId, Error>;

    fn read_content(&self, path: &[u8]) -> Result<Vec<u8>, Error>;

    fn write_content(&self, path: &[u8], bytes: &[u8]) -> Result<(), Error>;

    fn remove(&self, path: &[u8]) -> Result<(), Error>;

    fn mkdir(&self, path: &[u8]) -> Result<(), Error>;

    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), Error>;

    /// Materialize every blob reachable from `tree` into the worktree.
    fn checkout_tree(&self, tree: &ObjectId, odb: &dyn git_odb::Find, opts: CheckoutOptions) -> Result<(), Error>;

    /// Materialize only `paths`, each resolved against `tree`.
    fn checkout_paths(
        &self,
        paths: &[BString],
        tree: &ObjectId,
        odb: &dyn git_odb::Find,
        opts: CheckoutOptions,
    ) -> Result<(), Error>;

    fn is_ignored(&self, path: &[u8]) -> bool;

    fn exists(&self, path: &[u8]) -> bool;
}
