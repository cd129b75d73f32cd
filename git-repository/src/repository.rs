use std::path::{Path, PathBuf};
use std::sync::Arc;

use git_hash::ObjectId;
use git_ref::FullName;

use crate::state::{self, Capabilities, RepositoryState};
use crate::Error;

/// A repository: an object store, a reference store, and (unless bare) a worktree
/// root, all rooted at the same `.git` directory.
///
/// Splits, as usual, into a cheap-to-clone handle ([`ThreadSafeRepository`]) and the
/// concrete type doing the work; this one only wires together the crates this
/// workspace actually has (no config, no credentials, no submodules).
pub struct Repository {
    git_dir: PathBuf,
    worktree_dir: Option<PathBuf>,
    objects: git_odb::Store,
    refs: git_ref::Store,
}

impl Repository {
    /// Open an existing repository whose git directory is `git_dir`. `worktree_dir` is
    /// `None` for a bare repository.
    pub fn open(git_dir: impl Into<PathBuf>, worktree_dir: Option<PathBuf>) -> Result<Self, Error> {
        let git_dir = git_dir.into();
        let objects = git_odb::Store::at(git_dir.join("objects"))?;
        let refs = git_ref::Store::at(&git_dir);
        Ok(Repository { git_dir, worktree_dir, objects, refs })
    }

    /// Initialize a fresh repository at `git_dir`: an empty object store and an
    /// unborn `HEAD` pointing at `refs/heads/main`.
    pub fn init(git_dir: impl Into<PathBuf>, worktree_dir: Option<PathBuf>) -> Result<Self, Error> {
        let git_dir = git_dir.into();
        std::fs::create_dir_all(git_dir.join("objects"))?;
        std::fs::create_dir_all(git_dir.join("refs/heads"))?;
        let head = FullName::try_from("HEAD").expect("valid");
        let main = FullName::try_from("refs/heads/main").expect("valid");
        let refs = git_ref::Store::at(&git_dir);
        refs.set_symbolic(&head, &main)?;
        let objects = git_odb::Store::empty_at(git_dir.join("objects"));
        Ok(Repository { git_dir, worktree_dir, objects, refs })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// `None` for a bare repository.
    pub fn worktree_dir(&self) -> Option<&Path> {
        self.worktree_dir.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.worktree_dir.is_none()
    }

    pub fn objects(&self) -> &git_odb::Store {
        &self.objects
    }

    pub fn refs(&self) -> &git_ref::Store {
        &self.refs
    }

    /// The object `HEAD` currently resolves to, after following any symbolic chain.
    pub fn head_id(&self) -> Result<ObjectId, Error> {
        let head = FullName::try_from("HEAD").expect("valid");
        Ok(self.refs.resolve(&head)?)
    }

    /// The operation this repository is presently in the middle of, and what a
    /// caller may do about it. `index` is the caller's current staging index (there is
    /// no on-disk index format here, so it can't be loaded implicitly); pass `None`
    /// when no index is being tracked, which is treated as conflict-free.
    pub fn state(&self, index: Option<&git_index::State>) -> RepositoryState {
        let has_conflicts = index.map(git_index::State::has_conflicts).unwrap_or(false);
        state::detect(&self.git_dir, self.is_bare(), has_conflicts)
    }

    pub fn capabilities(&self, index: Option<&git_index::State>) -> Capabilities {
        self.state(index).capabilities()
    }

    /// Run garbage collection against this repository's object and reference stores.
    pub fn gc(&self, options: crate::gc::GcOptions) -> Result<crate::gc::GcStats, Error> {
        Ok(crate::gc::run(&self.objects, &self.refs, options)?)
    }
}

/// A cheaply cloneable handle to a [`Repository`]: cloning this just bumps a
/// reference count rather than reopening the object and reference stores.
#[derive(Clone)]
pub struct ThreadSafeRepository {
    inner: Arc<Repository>,
}

impl ThreadSafeRepository {
    pub fn open(git_dir: impl Into<PathBuf>, worktree_dir: Option<PathBuf>) -> Result<Self, Error> {
        Ok(ThreadSafeRepository { inner: Arc::new(Repository::open(git_dir, worktree_dir)?) })
    }

    pub fn init(git_dir: impl Into<PathBuf>, worktree_dir: Option<PathBuf>) -> Result<Self, Error> {
        Ok(ThreadSafeRepository { inner: Arc::new(Repository::init(git_dir, worktree_dir)?) })
    }
}

impl std::ops::Deref for ThreadSafeRepository {
    type Target = Repository;
    fn deref(&self) -> &Repository {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_an_unborn_head_pointing_at_main() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        let repo = Repository::init(&git_dir, Some(dir.path().to_path_buf())).unwrap();

        assert!(!repo.is_bare());
        assert_eq!(repo.worktree_dir(), Some(dir.path()));
        assert_eq!(repo.state(None), RepositoryState::Safe);

        let head = FullName::try_from("HEAD").expect("valid");
        match repo.refs().get(&head).unwrap() {
            git_ref::Target::Symbolic(name) => assert_eq!(name.as_bstr(), b"refs/heads/main".as_bstr()),
            git_ref::Target::Direct(_) => panic!("expected a symbolic HEAD"),
        }
    }

    #[test]
    fn bare_repository_has_no_worktree_and_reports_bare_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path(), None).unwrap();
        assert!(repo.is_bare());
        assert_eq!(repo.worktree_dir(), None);
        assert_eq!(repo.state(None), RepositoryState::Bare);
    }

    #[test]
    fn thread_safe_handle_can_be_cloned_and_deref_to_the_same_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ThreadSafeRepository::init(dir.path().join(".git"), Some(dir.path().to_path_buf())).unwrap();
        let cloned = repo.clone();
        assert_eq!(cloned.git_dir(), repo.git_dir());
    }
}
