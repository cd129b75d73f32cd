use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;

use crate::Error;

/// The mode of an entry in a [`Tree`], mirroring a unix file mode but restricted to the
/// handful of values git understands.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryMode {
    /// `040000`, a subdirectory.
    Tree,
    /// `100644`, a regular, non-executable file.
    Blob,
    /// `100755`, an executable file.
    BlobExecutable,
    /// `120000`, a symbolic link.
    Link,
    /// `160000`, a commit of another repository, recorded as a submodule-style gitlink.
    Commit,
}

impl EntryMode {
    /// The octal mode as git writes it in a tree entry.
    pub const fn as_octal_str(&self) -> &'static str {
        match self {
            EntryMode::Tree => "40000",
            EntryMode::Blob => "100644",
            EntryMode::BlobExecutable => "100755",
            EntryMode::Link => "120000",
            EntryMode::Commit => "160000",
        }
    }

    /// Whether this entry is itself a tree (subdirectory).
    pub const fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Tree)
    }

    /// Parse the octal mode string found in a tree entry.
    pub fn from_bytes(mode: &[u8]) -> Option<Self> {
        let mut value: u32 = 0;
        for &b in mode {
            if !(b'0'..=b'7').contains(&b) {
                return None;
            }
            value = (value << 3) + (b - b'0') as u32;
        }
        Self::from_mode_value(value)
    }

    /// Map a raw numeric mode (as stored in the index, for instance) to an `EntryMode`.
    pub fn from_mode_value(mode: u32) -> Option<Self> {
        Some(match mode {
            0o040000 => EntryMode::Tree,
            0o100644 => EntryMode::Blob,
            0o100755 => EntryMode::BlobExecutable,
            0o120000 => EntryMode::Link,
            0o160000 => EntryMode::Commit,
            _ => return None,
        })
    }

    /// The raw numeric mode, as used by the staging index and worktree checkout.
    pub const fn as_mode_value(&self) -> u32 {
        match self {
            EntryMode::Tree => 0o040000,
            EntryMode::Blob => 0o100644,
            EntryMode::BlobExecutable => 0o100755,
            EntryMode::Link => 0o120000,
            EntryMode::Commit => 0o160000,
        }
    }
}

/// One entry of a [`Tree`]: a name, a mode, and the id of the object it refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    /// The mode determining how `id` should be interpreted.
    pub mode: EntryMode,
    /// The entry's name within its containing tree; never contains a `/`.
    pub filename: BString,
    /// The id of the blob, tree, or commit (gitlink) this entry refers to.
    pub id: ObjectId,
}

/// A directory listing: an ordered set of [`Entry`] sorted in git's canonical order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Tree {
    /// Entries, always kept in [`canonical order`](sort_entries).
    pub entries: Vec<Entry>,
}

impl Tree {
    /// Parse a tree from its canonical byte representation:
    /// `("<mode> <name>\0<20-byte-id>")*`.
    pub fn from_bytes(mut data: &[u8]) -> Result<Self, Error> {
        let mut entries = Vec::new();
        while !data.is_empty() {
            let space = data
                .find_byte(b' ')
                .ok_or_else(|| Error::InvalidMode(data.as_bstr().to_owned()))?;
            let mode = EntryMode::from_bytes(&data[..space])
                .ok_or_else(|| Error::InvalidMode(data[..space].as_bstr().to_owned()))?;
            let rest = &data[space + 1..];
            let nul = rest.find_byte(0).ok_or(Error::MissingCommitField("tree entry name"))?;
            let filename = BString::from(rest[..nul].to_vec());
            let after_name = &rest[nul + 1..];
            if after_name.len() < 20 {
                return Err(Error::MissingCommitField("tree entry id"));
            }
            let id = ObjectId::from_bytes(&after_name[..20]);
            entries.push(Entry { mode, filename, id });
            data = &after_name[20..];
        }
        Ok(Tree { entries })
    }

    /// Serialize into the canonical byte representation, re-sorting entries first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut entries = self.entries.clone();
        sort_entries(&mut entries);
        let mut out = Vec::new();
        for entry in &entries {
            out.extend_from_slice(entry.mode.as_octal_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.filename);
            out.push(0);
            out.extend_from_slice(entry.id.as_slice());
        }
        out
    }

    /// Find an entry by name.
    pub fn entry(&self, name: &BStr) -> Option<&Entry> {
        self.entries.iter().find(|e| e.filename.as_bstr() == name)
    }
}

/// Compare two names the way git orders tree entries: bytewise, except a directory name
/// sorts as though it had a trailing `/`, so `"a"` (a file) sorts before `"a.txt"` but
/// `"a"` (a directory) sorts after `"a+"`.
pub fn compare_names(a_name: &BStr, a_is_tree: bool, b_name: &BStr, b_is_tree: bool) -> std::cmp::Ordering {
    let common_len = a_name.len().min(b_name.len());
    match a_name[..common_len].cmp(&b_name[..common_len]) {
        std::cmp::Ordering::Equal => {}
        other => return other,
    }
    let a_tail = if a_name.len() > common_len {
        Some(a_name[common_len])
    } else if a_is_tree {
        Some(b'/')
    } else {
        None
    };
    let b_tail = if b_name.len() > common_len {
        Some(b_name[common_len])
    } else if b_is_tree {
        Some(b'/')
    } else {
        None
    };
    a_tail.cmp(&b_tail)
}

/// Sort `entries` into git's canonical tree order in place.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        compare_names(
            a.filename.as_bstr(),
            a.mode.is_tree(),
            b.filename.as_bstr(),
            b.mode.is_tree(),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_tree: bool) -> Entry {
        Entry {
            mode: if is_tree { EntryMode::Tree } else { EntryMode::Blob },
            filename: name.into(),
            id: ObjectId::null(git_hash::Kind::Sha1),
        }
    }

    #[test]
    fn canonical_order_treats_dirs_as_trailing_slash() {
        let mut entries = vec![entry("b.txt", false), entry("b", true), entry("a", false)];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.filename.to_string()).collect();
        assert_eq!(names, vec!["a", "b.txt", "b"]);
    }

    #[test]
    fn roundtrip_through_bytes() {
        let mut entries = vec![entry("a", false), entry("b", true)];
        sort_entries(&mut entries);
        let tree = Tree { entries };
        let bytes = tree.to_bytes();
        let parsed = Tree::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tree);
    }
}
