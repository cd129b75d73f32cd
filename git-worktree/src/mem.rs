use std::cell::RefCell;
use std::collections::BTreeMap;

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_object::tree::EntryMode;
use git_object::Kind;

use crate::entry::WorktreeEntry;
use crate::trait_def::{CheckoutOptions, Worktree};
use crate::Error;

#[derive(Clone)]
struct Node {
    content: Vec<u8>,
    mode: EntryMode,
    mtime_seconds: i64,
}

/// An in-memory [`Worktree`] double for exercising status and checkout logic
/// without touching a filesystem.
#[derive(Default)]
pub struct MemWorktree {
    files: RefCell<BTreeMap<BString, Node>>,
    ignored: RefCell<Vec<git_glob::Pattern>>,
}

impl MemWorktree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_pattern(self, line: &str) -> Self {
        if let Some(pattern) = git_glob::Pattern::from_line(line.as_bytes().as_bstr()) {
            self.ignored.borrow_mut().push(pattern);
        }
        self
    }

    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.files.borrow_mut().insert(
            BString::from(path),
            Node { content: content.to_vec(), mode: EntryMode::Blob, mtime_seconds: 0 },
        );
        self
    }

    fn directories(&self) -> Vec<BString> {
        let files = self.files.borrow();
        let mut dirs = std::collections::BTreeSet::new();
        for path in files.keys() {
            let mut rest: &BStr = path.as_bstr();
            while let Some(pos) = rest.rfind_byte(b'/') {
                rest = rest[..pos].as_bstr();
                dirs.insert(BString::from(rest));
            }
        }
        dirs.into_iter().collect()
    }
}

impl Worktree for MemWorktree {
    fn get_root(&self) -> Option<&std::path::Path> {
        None
    }

    fn walk(&self) -> Result<Vec<WorktreeEntry>, Error> {
        let files = self.files.borrow();
        let mut out: Vec<WorktreeEntry> = files
            .iter()
            .map(|(path, node)| WorktreeEntry {
                path: path.clone(),
                mode: node.mode,
                size: node.content.len() as u64,
                mtime_seconds: node.mtime_seconds,
                is_directory: false,
                is_ignored: self.is_ignored(path),
            })
            .collect();
        for dir in self.directories() {
            let is_ignored = self.is_ignored(&dir);
            out.push(WorktreeEntry {
                path: dir,
                mode: EntryMode::Tree,
                size: 0,
                mtime_seconds: 0,
                is_directory: true,
                is_ignored,
            });
        }
        Ok(out)
    }

    fn get_entry(&self, path: &[u8]) -> Result<Option<WorktreeEntry>, Error> {
        Ok(self.files.borrow().get(path.as_bstr()).map(|node| WorktreeEntry {
            path: BString::from(path),
            mode: node.mode,
            size: node.content.len() as u64,
            mtime_seconds: node.mtime_seconds,
            is_directory: false,
            is_ignored: self.is_ignored(path),
        }))
    }

    fn compute_hash(&self, path: &[u8]) -> Result<ObjectId, Error> {
        let content = self.read_content(path)?;
        Ok(git_object::compute_hash(git_hash::Kind::Sha1, Kind::Blob, &content))
    }

    fn read_content(&self, path: &[u8]) -> Result<Vec<u8>, Error> {
        self.files
            .borrow()
            .get(path.as_bstr())
            .map(|node| node.content.clone())
            .ok_or_else(|| Error::NotFound(BString::from(path)))
    }

    fn write_content(&self, path: &[u8], bytes: &[u8]) -> Result<(), Error> {
        self.files.borrow_mut().insert(
            BString::from(path),
            Node { content: bytes.to_vec(), mode: EntryMode::Blob, mtime_seconds: 0 },
        );
        Ok(())
    }

    fn remove(&self, path: &[u8]) -> Result<(), Error> {
        self.files
            .borrow_mut()
            .remove(path.as_bstr())
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(BString::from(path)))
    }

    fn mkdir(&self, _path: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), Error> {
        let node = self
            .files
            .borrow_mut()
            .remove(from.as_bstr())
            .ok_or_else(|| Error::NotFound(BString::from(from)))?;
        self.files.borrow_mut().insert(BString::from(to), node);
        Ok(())
    }

    fn checkout_tree(&self, tree: &ObjectId, odb: &dyn git_odb::Find, opts: CheckoutOptions) -> Result<(), Error> {
        checkout_into_mem(self, tree, odb, b"", opts)
    }

    fn checkout_paths(
        &self,
        paths: &[BString],
        tree: &ObjectId,
        odb: &dyn git_odb::Find,
        opts: CheckoutOptions,
    ) -> Result<(), Error> {
        for path in paths {
            let (blob_id, _) =
                crate::fs::resolve_path_in_tree(odb, tree, path.as_bstr())?.ok_or_else(|| Error::NotFound(path.clone()))?;
            if !opts.overwrite_existing && self.exists(path) {
                continue;
            }
            let content = match odb.load(&blob_id)? {
                git_object::Object::Blob(data) => data,
                other => return Err(Error::Object(git_object::Error::MissingCommitField(other.kind().as_str()))),
            };
            self.write_content(path, &content)?;
        }
        Ok(())
    }

    fn is_ignored(&self, path: &[u8]) -> bool {
        let is_dir = self.directories().iter().any(|d| d.as_bstr() == path.as_bstr());
        self.ignored.borrow().iter().any(|p| p.matches(path.as_bstr(), is_dir))
    }

    fn exists(&self, path: &[u8]) -> bool {
        self.files.borrow().contains_key(path.as_bstr()) || self.directories().iter().any(|d| d.as_bstr() == path.as_bstr())
    }
}

fn checkout_into_mem(
    worktree: &MemWorktree,
    tree: &ObjectId,
    odb: &dyn git_odb::Find,
    prefix: &[u8],
    opts: CheckoutOptions,
) -> Result<(), Error> {
    let tree_obj = match odb.load(tree)? {
        git_object::Object::Tree(tree) => tree,
        other => return Err(Error::Object(git_object::Error::MissingCommitField(other.kind().as_str()))),
    };
    for entry in &tree_obj.entries {
        let mut path = prefix.to_vec();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.filename);

        if entry.mode.is_tree() {
            checkout_into_mem(worktree, &entry.id, odb, &path, opts)?;
        } else {
            if !opts.overwrite_existing && worktree.exists(&path) {
                continue;
            }
            let content = match odb.load(&entry.id)? {
                git_object::Object::Blob(data) => data,
                other => return Err(Error::Object(git_object::Error::MissingCommitField(other.kind().as_str()))),
            };
            worktree.write_content(&path, &content)?;
        }
    }
    Ok(())
}
