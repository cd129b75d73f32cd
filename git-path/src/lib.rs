//! Conversions between git's internal path representation (always `/`-separated bytes)
//! and the host's native path type.
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice, ByteVec};

/// The error returned when a path can't be represented in the host's encoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path contained invalid UTF-8 and the platform requires it")]
    IllegalUtf8,
}

/// Convert a git-internal, `/`-separated path into a native [`PathBuf`].
///
/// On Windows this replaces `/` with `\`; elsewhere it's a straight byte copy.
pub fn to_native_path_on_windows(path: &BStr) -> Result<std::borrow::Cow<'_, Path>, Error> {
    #[cfg(windows)]
    {
        let p = path
            .to_str()
            .map_err(|_| Error::IllegalUtf8)?
            .replace('/', std::path::MAIN_SEPARATOR_STR);
        Ok(std::borrow::Cow::Owned(PathBuf::from(p)))
    }
    #[cfg(not(windows))]
    {
        Ok(std::borrow::Cow::Borrowed(Path::new(path.to_os_str().map_err(|_| Error::IllegalUtf8)?)))
    }
}

/// Convert a native path into git's internal, always `/`-separated representation.
pub fn into_bstr(path: impl AsRef<Path>) -> BString {
    let path = path.as_ref();
    #[cfg(windows)]
    {
        let s = path.to_string_lossy().replace('\\', "/");
        BString::from(s)
    }
    #[cfg(not(windows))]
    {
        Vec::from_path_lossy(path).into()
    }
}

/// Join git-internal path components with `/`, the way tree entries are addressed.
pub fn join(base: &BStr, component: &BStr) -> BString {
    if base.is_empty() {
        return component.to_owned().into();
    }
    let mut out = BString::from(base.to_vec());
    out.push(b'/');
    out.extend_from_slice(component);
    out
}

/// Normalize a path by collapsing `.` components and resolving `..` lexically,
/// without touching the filesystem. Used to reject or normalize worktree paths.
pub fn normalize(path: &BStr) -> Option<BString> {
    let mut stack: Vec<&[u8]> = Vec::new();
    for component in path.split(|b| *b == b'/') {
        match component {
            b"" | b"." => continue,
            b".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(BString::from(stack.join(&b'/').to_vec()))
}
