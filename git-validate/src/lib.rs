//! Validation functions for various kinds of names used throughout git: tag names,
//! reference names (which must also be valid tag names), and the path components
//! that make them up.
#![deny(unsafe_code)]

use bstr::BStr;

///
pub mod reference;
pub use reference::{name, name_partial};

///
pub mod tag {
    ///
    pub mod name {
        use quick_error::quick_error;

        quick_error! {
            /// The error returned by [`crate::tagname()`].
            #[allow(missing_docs)]
            #[derive(Debug)]
            pub enum Error {
                Empty {
                    display("Tag names must not be empty")
                }
                StartsWithDot {
                    display("Tag names must not start with a dot (period)")
                }
                EndsWithDot {
                    display("Tag names must not end with a dot (period)")
                }
                EndsWithSlash {
                    display("Tag names must not end with a slash ('/')")
                }
                DoubleDot {
                    display("Tag names must not contain two dots in a row ('..')")
                }
                LockSuffix {
                    display("Tag names must not end with the '.lock' suffix")
                }
                ControlCharacter {
                    display("Tag names must not contain ASCII control characters")
                }
                DisallowedCharacter {
                    display("Tag names must not contain any of ' ~ ^ : ? * [ \\'")
                }
                RepeatedSlashOrSpaceBeforeBody {
                    display("Tag names must not contain a sequence of '@{{'")
                }
            }
        }
    }
}

/// Validate that `path` is usable as a tag name, which is the baseline validation that
/// reference names build on top of (every valid reference name must also be a valid tag name).
pub fn tagname(path: &BStr) -> Result<&BStr, tag::name::Error> {
    use tag::name::Error;

    if path.is_empty() {
        return Err(Error::Empty);
    }
    if path[0] == b'.' {
        return Err(Error::StartsWithDot);
    }
    if *path.last().expect("non-empty") == b'.' {
        return Err(Error::EndsWithDot);
    }
    if *path.last().expect("non-empty") == b'/' {
        return Err(Error::EndsWithSlash);
    }
    if path.windows(2).any(|w| w == b"..") {
        return Err(Error::DoubleDot);
    }
    if path.ends_with(b".lock") {
        return Err(Error::LockSuffix);
    }
    if path.iter().any(|b| *b < 0x20 || *b == 0x7f) {
        return Err(Error::ControlCharacter);
    }
    if path.iter().any(|b| matches!(b, b' ' | b'~' | b'^' | b':' | b'?' | b'*' | b'[' | b'\\')) {
        return Err(Error::DisallowedCharacter);
    }
    if path.windows(2).any(|w| w == b"@{") {
        return Err(Error::RepeatedSlashOrSpaceBeforeBody);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::ByteSlice;

    #[test]
    fn accepts_normal_tag() {
        assert!(tagname(b"v1.0.0".as_bstr()).is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(tagname(b"".as_bstr()).is_err());
    }

    #[test]
    fn rejects_double_dot() {
        assert!(tagname(b"foo..bar".as_bstr()).is_err());
    }

    #[test]
    fn rejects_lock_suffix() {
        assert!(tagname(b"main.lock".as_bstr()).is_err());
    }

    #[test]
    fn ref_name_allows_slashes_but_not_leading_one() {
        assert!(name(b"refs/heads/main".as_bstr()).is_ok());
        assert!(name(b"/refs/heads/main".as_bstr()).is_err());
    }

    #[test]
    fn standalone_ref_must_be_uppercase() {
        assert!(name(b"HEAD".as_bstr()).is_ok());
        assert!(name(b"head".as_bstr()).is_err());
    }

    #[test]
    fn partial_allows_lowercase_without_slash() {
        assert!(name_partial(b"main".as_bstr()).is_ok());
    }
}
