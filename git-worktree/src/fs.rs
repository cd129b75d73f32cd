use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_object::tree::EntryMode;
use git_object::Kind;

use crate::entry::WorktreeEntry;
use crate::trait_def::{CheckoutOptions, Worktree};
use crate::Error;

struct IgnoreRule {
    /// `/`-separated directory the pattern was declared in, empty for the root.
    declared_in: BString,
    pattern: git_glob::Pattern,
}

/// A worktree backed by a real directory on disk.
///
/// `.gitignore` files are collected once at construction time; call
/// [`FsWorktree::open`] again after they change.
pub struct FsWorktree {
    root: PathBuf,
    ignore_rules: Vec<IgnoreRule>,
}

impl FsWorktree {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let ignore_rules = collect_ignore_rules(&root)?;
        Ok(FsWorktree { root, ignore_rules })
    }

    fn abs(&self, path: &[u8]) -> PathBuf {
        match git_path::to_native_path_on_windows(path.as_bstr()) {
            Ok(native) => self.root.join(&*native),
            Err(_) => self.root.join(String::from_utf8_lossy(path).as_ref()),
        }
    }

    fn rel_bstring(&self, abs: &Path) -> BString {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        git_path::into_bstr(rel)
    }

    fn is_ignored_rel(&self, rel: &BStr, is_dir: bool) -> bool {
        let mut ignored = false;
        for rule in &self.ignore_rules {
            let candidate = if rule.declared_in.is_empty() {
                Some(rel)
            } else if rel.starts_with(rule.declared_in.as_slice()) && rel.get(rule.declared_in.len()) == Some(&b'/')
            {
                Some(rel[rule.declared_in.len() + 1..].as_bstr())
            } else {
                None
            };
            if let Some(candidate) = candidate {
                if rule.pattern.matches(candidate, is_dir) {
                    ignored = !rule.pattern.is_negative();
                }
            }
        }
        ignored
    }
}

fn collect_ignore_rules(root: &Path) -> Result<Vec<IgnoreRule>, Error> {
    let mut rules = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_name() != ".gitignore" {
            continue;
        }
        let declared_dir = entry.path().parent().unwrap_or(root);
        let declared_in = git_path::into_bstr(declared_dir.strip_prefix(root).unwrap_or(Path::new("")));
        let data = fs::read(entry.path())?;
        for line in data.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(pattern) = git_glob::Pattern::from_line(line.as_bstr()) {
                rules.push(IgnoreRule {
                    declared_in: declared_in.clone(),
                    pattern,
                });
            }
        }
    }
    rules.sort_by_key(|rule| rule.declared_in.len());
    Ok(rules)
}

fn mode_from_metadata(meta: &fs::Metadata) -> EntryMode {
    if meta.is_dir() {
        return EntryMode::Tree;
    }
    if meta.file_type().is_symlink() {
        return EntryMode::Link;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            return EntryMode::BlobExecutable;
        }
    }
    EntryMode::Blob
}

fn mtime_seconds(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Worktree for FsWorktree {
    fn get_root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn walk(&self) -> Result<Vec<WorktreeEntry>, Error> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git")
        {
            let entry = entry.map_err(|err| {
                Error::Io(err.into_io_error().unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")))
            })?;
            if entry.depth() == 0 {
                continue;
            }
            let meta = entry.metadata().map_err(|err| {
                Error::Io(err.into_io_error().unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")))
            })?;
            let rel = self.rel_bstring(entry.path());
            let is_dir = meta.is_dir();
            let is_ignored = self.is_ignored_rel(rel.as_bstr(), is_dir);
            out.push(WorktreeEntry {
                path: rel,
                mode: mode_from_metadata(&meta),
                size: if is_dir { 0 } else { meta.len() },
                mtime_seconds: mtime_seconds(&meta),
                is_directory: is_dir,
                is_ignored,
            });
        }
        Ok(out)
    }

    fn get_entry(&self, path: &[u8]) -> Result<Option<WorktreeEntry>, Error> {
        let abs = self.abs(path);
        let meta = match fs::symlink_metadata(&abs) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Io(err)),
        };
        let is_dir = meta.is_dir();
        Ok(Some(WorktreeEntry {
            path: BString::from(path),
            mode: mode_from_metadata(&meta),
            size: if is_dir { 0 } else { meta.len() },
            mtime_seconds: mtime_seconds(&meta),
            is_directory: is_dir,
            is_ignored: self.is_ignored_rel(path.as_bstr(), is_dir),
        }))
    }

    fn compute_hash(&self, path: &[u8]) -> Result<ObjectId, Error> {
        let content = self.read_content(path)?;
        Ok(git_object::compute_hash(git_hash::Kind::Sha1, Kind::Blob, &content))
    }

    fn read_content(&self, path: &[u8]) -> Result<Vec<u8>, Error> {
        fs::read(self.abs(path)).map_err(Error::Io)
    }

    fn write_content(&self, path: &[u8], bytes: &[u8]) -> Result<(), Error> {
        let abs = self.abs(path);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(abs, bytes).map_err(Error::Io)
    }

    fn remove(&self, path: &[u8]) -> Result<(), Error> {
        let abs = self.abs(path);
        let meta = fs::symlink_metadata(&abs)?;
        if meta.is_dir() {
            fs::remove_dir_all(abs)?;
        } else {
            fs::remove_file(abs)?;
        }
        Ok(())
    }

    fn mkdir(&self, path: &[u8]) -> Result<(), Error> {
        fs::create_dir_all(self.abs(path)).map_err(Error::Io)
    }

    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), Error> {
        let to_abs = self.abs(to);
        if let Some(parent) = to_abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.abs(from), to_abs).map_err(Error::Io)
    }

    fn checkout_tree(&self, tree: &ObjectId, odb: &dyn git_odb::Find, opts: CheckoutOptions) -> Result<(), Error> {
        checkout_tree_into(self, tree, odb, b"", opts)
    }

    fn checkout_paths(
        &self,
        paths: &[BString],
        tree: &ObjectId,
        odb: &dyn git_odb::Find,
        opts: CheckoutOptions,
    ) -> Result<(), Error> {
        for path in paths {
            let (blob_id, _mode) = resolve_path_in_tree(odb, tree, path.as_bstr())?
                .ok_or_else(|| Error::NotFound(path.clone()))?;
            if !opts.overwrite_existing && self.exists(path) {
                continue;
            }
            let content = load_blob(odb, &blob_id)?;
            self.write_content(path, &content)?;
        }
        Ok(())
    }

    fn is_ignored(&self, path: &[u8]) -> bool {
        let is_dir = fs::metadata(self.abs(path)).map(|m| m.is_dir()).unwrap_or(false);
        self.is_ignored_rel(path.as_bstr(), is_dir)
    }

    fn exists(&self, path: &[u8]) -> bool {
        self.abs(path).exists()
    }
}

fn load_blob(odb: &dyn git_odb::Find, id: &ObjectId) -> Result<Vec<u8>, Error> {
    match odb.load(id)? {
        git_object::Object::Blob(data) => Ok(data),
        other => Err(Error::Object(git_object::Error::MissingCommitField(other.kind().as_str()))),
    }
}

/// Walk `tree` resolving the `/`-separated `path` to its `(blob id, mode)`, or `None`
/// if any component is missing.
pub(crate) fn resolve_path_in_tree(
    odb: &dyn git_odb::Find,
    tree: &ObjectId,
    path: &BStr,
) -> Result<Option<(ObjectId, EntryMode)>, Error> {
    let mut current = *tree;
    let components: Vec<&[u8]> = path.split(|&b| b == b'/').collect();
    for (i, component) in components.iter().enumerate() {
        let tree_obj = match odb.load(&current)? {
            git_object::Object::Tree(tree) => tree,
            _ => return Ok(None),
        };
        let found = match tree_obj.entry(component.as_bstr()) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        if i + 1 == components.len() {
            return Ok(Some((found.id, found.mode)));
        }
        current = found.id;
    }
    Ok(None)
}

fn checkout_tree_into(
    worktree: &FsWorktree,
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
            worktree.mkdir(&path)?;
            checkout_tree_into(worktree, &entry.id, odb, &path, opts)?;
        } else {
            if !opts.overwrite_existing && worktree.exists(&path) {
                continue;
            }
            let content = load_blob(odb, &entry.id)?;
            worktree.write_content(&path, &content)?;
        }
    }
    Ok(())
}
