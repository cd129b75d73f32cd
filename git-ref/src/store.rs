use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use git_actor::Signature;
use git_hash::ObjectId;

use crate::reflog;
use crate::{Error, FullName, Target};

const LOOP_DETECTION_LIMIT: usize = 5;

/// A reference together with the target it currently points at.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reference {
    pub name: FullName,
    pub target: Target,
}

/// The reference store of one repository: loose files under `refs/` (and `HEAD` at the
/// root), falling back to a `packed-refs` file for anything not overridden loosely.
pub struct Store {
    git_dir: PathBuf,
}

impl Store {
    pub fn at(git_dir: impl Into<PathBuf>) -> Self {
        Store { git_dir: git_dir.into() }
    }

    fn loose_path(&self, name: &FullName) -> PathBuf {
        self.git_dir.join(name.to_path())
    }

    fn reflog_path(&self, name: &FullName) -> PathBuf {
        self.git_dir.join("logs").join(name.to_path())
    }

    fn packed_entries(&self) -> Vec<crate::packed::Entry> {
        match fs::read(self.git_dir.join("packed-refs")) {
            Ok(data) => crate::packed::parse(&data),
            Err(_) => Vec::new(),
        }
    }

    /// Read the raw target a reference currently has, without following symbolic chains.
    pub fn get(&self, name: &FullName) -> Result<Target, Error> {
        match fs::read(self.loose_path(name)) {
            Ok(data) => Target::from_loose_bytes(&data).map_err(|_| Error::Corrupt {
                name: name.clone(),
                reason: "loose ref content could not be parsed".into(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => self
                .packed_entries()
                .into_iter()
                .find(|entry| &entry.name == name)
                .map(|entry| Target::Direct(entry.target))
                .ok_or_else(|| Error::NotFound(name.clone())),
            Err(err) => Err(err.into()),
        }
    }

    /// Follow a reference's symbolic chain to its final direct object id, detecting
    /// cycles and chains longer than the loop-detection limit.
    pub fn resolve(&self, name: &FullName) -> Result<ObjectId, Error> {
        let mut current = name.clone();
        for _ in 0..LOOP_DETECTION_LIMIT {
            match self.get(&current) {
                Ok(Target::Direct(id)) => return Ok(id),
                Ok(Target::Symbolic(next)) => current = next,
                Err(Error::NotFound(_)) => return Err(Error::Unresolved(name.clone())),
                Err(err) => return Err(err),
            }
        }
        Err(Error::LoopDetected(name.clone()))
    }

    /// List every reference whose name starts with `prefix` (an empty prefix lists all),
    /// merging loose and packed sources with loose entries taking priority.
    pub fn list(&self, prefix: &str) -> Result<Vec<Reference>, Error> {
        let mut seen = std::collections::BTreeMap::new();

        for entry in self.packed_entries() {
            if entry.name.as_bstr().starts_with(prefix.as_bytes()) {
                seen.insert(entry.name.clone(), Target::Direct(entry.target));
            }
        }

        let refs_dir = self.git_dir.join("refs");
        if refs_dir.is_dir() {
            self.walk_loose(&refs_dir, &mut seen, prefix)?;
        }
        if "HEAD".starts_with(prefix) || prefix.is_empty() {
            let head = FullName::try_from("HEAD").expect("valid");
            if let Ok(target) = self.get(&head) {
                seen.insert(head, target);
            }
        }

        Ok(seen.into_iter().map(|(name, target)| Reference { name, target }).collect())
    }

    fn walk_loose(
        &self,
        dir: &Path,
        seen: &mut std::collections::BTreeMap<FullName, Target>,
        prefix: &str,
    ) -> Result<(), Error> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk_loose(&path, seen, prefix)?;
                continue;
            }
            let relative = path.strip_prefix(&self.git_dir).expect("under git_dir").to_string_lossy().replace('\\', "/");
            if !relative.starts_with(prefix) {
                continue;
            }
            let Ok(name) = FullName::try_from(relative) else { continue };
            if let Ok(target) = self.get(&name) {
                seen.insert(name, target);
            }
        }
        Ok(())
    }

    /// Unconditionally overwrite `name` to point at `target`. Use [`Store::compare_and_swap`]
    /// for a check-then-set update.
    pub fn set(&self, name: &FullName, target: Target) -> Result<(), Error> {
        let path = self.loose_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut handle = git_tempfile::new(&path, git_tempfile::ContainingDirectory::CreateAllRaceproof)?;
        use std::io::Write;
        handle.write_all(&target.to_loose_bytes())?;
        handle.persist(&path)?;
        Ok(())
    }

    pub fn set_symbolic(&self, name: &FullName, target: &FullName) -> Result<(), Error> {
        self.set(name, Target::Symbolic(target.clone()))
    }

    pub fn remove(&self, name: &FullName) -> Result<(), Error> {
        match fs::remove_file(self.loose_path(name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(name.clone())),
            Err(err) => Err(err.into()),
        }
    }

    /// Follow `name`'s symbolic chain, if it has one, to the first ref that is either
    /// direct or doesn't exist yet. A compare-and-swap against a symbolic ref writes
    /// through to this terminal ref rather than to the symbolic ref itself.
    fn resolve_terminal(&self, name: &FullName) -> Result<FullName, Error> {
        let mut current = name.clone();
        for _ in 0..LOOP_DETECTION_LIMIT {
            match self.get(&current) {
                Ok(Target::Direct(_)) => return Ok(current),
                Ok(Target::Symbolic(next)) => current = next,
                Err(Error::NotFound(_)) => return Ok(current),
                Err(err) => return Err(err),
            }
        }
        Err(Error::LoopDetected(name.clone()))
    }

    /// Atomically update `name` to `new` iff its current direct id equals `expected`
    /// (`None` meaning the ref must not currently exist). If `name` is symbolic, the
    /// update is applied to the ref at the end of its symbolic chain instead, so a CAS
    /// through `HEAD` advances the branch it points at rather than detaching `HEAD`.
    /// Locks against concurrent writers via an exclusively-created `.lock` sibling file.
    pub fn compare_and_swap(&self, name: &FullName, expected: Option<ObjectId>, new: Target) -> Result<(), Error> {
        let terminal = self.resolve_terminal(name)?;
        let path = self.loose_path(&terminal);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = path.with_extension("lock");
        let mut lock = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::LockHeld(terminal.clone())
                } else {
                    Error::Io(err)
                }
            })?;

        let actual = match self.get(&terminal) {
            Ok(Target::Direct(id)) => Some(id),
            Ok(Target::Symbolic(_)) => unreachable!("resolve_terminal stops at the first non-symbolic ref"),
            Err(Error::NotFound(_)) => None,
            Err(err) => {
                let _ = fs::remove_file(&lock_path);
                return Err(err);
            }
        };
        if actual != expected {
            let _ = fs::remove_file(&lock_path);
            return Err(Error::CasMismatch { name: terminal, expected, actual });
        }

        use std::io::Write;
        lock.write_all(&new.to_loose_bytes())?;
        lock.flush()?;
        drop(lock);
        fs::rename(&lock_path, &path)?;
        Ok(())
    }

    /// Append a reflog entry for `name`. Per the store's atomicity contract this never
    /// rolls back a prior ref change; IO failures are logged and swallowed.
    pub fn append_reflog(&self, name: &FullName, previous: ObjectId, new: ObjectId, actor: Signature, message: impl Into<bstr::BString>) {
        let entry = reflog::Entry { previous, new, actor, message: message.into() };
        if let Err(err) = reflog::append(&self.reflog_path(name), &entry) {
            tracing::warn!(%name, %err, "failed to append reflog entry");
        }
    }

    pub fn reflog(&self, name: &FullName) -> Result<Vec<reflog::Entry>, Error> {
        reflog::read_all(&self.reflog_path(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_date::Time;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());
        (dir, store)
    }

    fn id(hex: &str) -> ObjectId {
        ObjectId::from_hex(hex.as_bytes()).unwrap()
    }

    #[test]
    fn set_then_get_direct_ref() {
        let (_dir, store) = store();
        let name = FullName::try_from("refs/heads/main").unwrap();
        let target = id("0123456789abcdef0123456789abcdef01234567");
        store.set(&name, Target::Direct(target)).unwrap();
        assert_eq!(store.get(&name).unwrap(), Target::Direct(target));
    }

    #[test]
    fn resolve_follows_symbolic_chain() {
        let (_dir, store) = store();
        let main = FullName::try_from("refs/heads/main").unwrap();
        let head = FullName::try_from("HEAD").unwrap();
        let target = id("0123456789abcdef0123456789abcdef01234567");
        store.set(&main, Target::Direct(target)).unwrap();
        store.set_symbolic(&head, &main).unwrap();
        assert_eq!(store.resolve(&head).unwrap(), target);
    }

    #[test]
    fn resolve_detects_self_referential_loop() {
        let (_dir, store) = store();
        let a = FullName::try_from("refs/heads/a").unwrap();
        let b = FullName::try_from("refs/heads/b").unwrap();
        store.set_symbolic(&a, &b).unwrap();
        store.set_symbolic(&b, &a).unwrap();
        assert!(matches!(store.resolve(&a), Err(Error::LoopDetected(_))));
    }

    #[test]
    fn resolve_of_dangling_symbolic_ref_is_unresolved() {
        let (_dir, store) = store();
        let head = FullName::try_from("HEAD").unwrap();
        let main = FullName::try_from("refs/heads/main").unwrap();
        store.set_symbolic(&head, &main).unwrap();
        assert!(matches!(store.resolve(&head), Err(Error::Unresolved(_))));
    }

    #[test]
    fn compare_and_swap_rejects_stale_expectation() {
        let (_dir, store) = store();
        let name = FullName::try_from("refs/heads/main").unwrap();
        let first = id("0123456789abcdef0123456789abcdef01234567");
        let second = id("fedcba9876543210fedcba9876543210fedcba98");
        store.compare_and_swap(&name, None, Target::Direct(first)).unwrap();
        let err = store.compare_and_swap(&name, None, Target::Direct(second)).unwrap_err();
        assert!(matches!(err, Error::CasMismatch { .. }));
        assert_eq!(store.get(&name).unwrap(), Target::Direct(first));
    }

    #[test]
    fn compare_and_swap_succeeds_with_matching_expectation() {
        let (_dir, store) = store();
        let name = FullName::try_from("refs/heads/main").unwrap();
        let first = id("0123456789abcdef0123456789abcdef01234567");
        let second = id("fedcba9876543210fedcba9876543210fedcba98");
        store.compare_and_swap(&name, None, Target::Direct(first)).unwrap();
        store.compare_and_swap(&name, Some(first), Target::Direct(second)).unwrap();
        assert_eq!(store.get(&name).unwrap(), Target::Direct(second));
    }

    #[test]
    fn compare_and_swap_through_a_symbolic_ref_writes_through_to_its_target() {
        let (_dir, store) = store();
        let head = FullName::try_from("HEAD").unwrap();
        let main = FullName::try_from("refs/heads/main").unwrap();
        let first = id("0123456789abcdef0123456789abcdef01234567");
        let second = id("fedcba9876543210fedcba9876543210fedcba98");

        store.set(&main, Target::Direct(first)).unwrap();
        store.set_symbolic(&head, &main).unwrap();

        store.compare_and_swap(&head, Some(first), Target::Direct(second)).unwrap();

        assert_eq!(store.get(&main).unwrap(), Target::Direct(second));
        assert_eq!(store.get(&head).unwrap(), Target::Symbolic(main));
    }

    #[test]
    fn compare_and_swap_through_a_symbolic_ref_rejects_a_stale_expectation() {
        let (_dir, store) = store();
        let head = FullName::try_from("HEAD").unwrap();
        let main = FullName::try_from("refs/heads/main").unwrap();
        let first = id("0123456789abcdef0123456789abcdef01234567");
        let second = id("fedcba9876543210fedcba9876543210fedcba98");

        store.set(&main, Target::Direct(first)).unwrap();
        store.set_symbolic(&head, &main).unwrap();

        let err = store.compare_and_swap(&head, None, Target::Direct(second)).unwrap_err();
        assert!(matches!(err, Error::CasMismatch { .. }));
        assert_eq!(store.get(&main).unwrap(), Target::Direct(first));
    }

    #[test]
    fn list_returns_refs_under_prefix_from_loose_and_packed() {
        let (dir, store) = store();
        let main = FullName::try_from("refs/heads/main").unwrap();
        let feature = FullName::try_from("refs/heads/feature").unwrap();
        store.set(&main, Target::Direct(id("0123456789abcdef0123456789abcdef01234567"))).unwrap();
        fs::write(
            dir.path().join("packed-refs"),
            b"fedcba9876543210fedcba9876543210fedcba98 refs/heads/feature\n",
        )
        .unwrap();

        let refs = store.list("refs/heads/").unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.clone()).collect();
        assert!(names.contains(&main));
        assert!(names.contains(&feature));
    }

    #[test]
    fn loose_ref_overrides_packed_entry_of_the_same_name() {
        let (dir, store) = store();
        let main = FullName::try_from("refs/heads/main").unwrap();
        let loose_target = id("0123456789abcdef0123456789abcdef01234567");
        fs::write(
            dir.path().join("packed-refs"),
            b"fedcba9876543210fedcba9876543210fedcba98 refs/heads/main\n",
        )
        .unwrap();
        store.set(&main, Target::Direct(loose_target)).unwrap();

        let refs = store.list("refs/heads/").unwrap();
        let found = refs.iter().find(|r| r.name == main).unwrap();
        assert_eq!(found.target, Target::Direct(loose_target));
    }

    #[test]
    fn append_reflog_then_read_back() {
        let (_dir, store) = store();
        let head = FullName::try_from("HEAD").unwrap();
        let sig = Signature { name: "A U Thor".into(), email: "author@example.com".into(), time: Time::new(1_000_000, 0) };
        store.append_reflog(&head, ObjectId::null(git_hash::Kind::Sha1), id("0123456789abcdef0123456789abcdef01234567"), sig, "commit: initial");
        let entries = store.reflog(&head).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "commit: initial");
    }
}
