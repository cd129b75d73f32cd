//! Pattern matching as used by `.gitignore`-style files.
#![deny(unsafe_code)]

use bitflags::bitflags;
use bstr::{BStr, ByteSlice};

bitflags! {
    /// Flags describing how a [`Pattern`] was written, affecting how it matches.
    #[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
    pub struct Mode: u8 {
        /// The pattern is anchored to the directory it was declared in (it contained a `/`
        /// before its final component).
        const ANCHORED = 1 << 0;
        /// The pattern only matches directories (it ended with a trailing `/`).
        const MUST_BE_DIR = 1 << 1;
        /// The pattern is a negation (`!pattern`), re-including something an earlier pattern excluded.
        const NEGATIVE = 1 << 2;
    }
}

/// A single compiled ignore-style pattern, e.g. one line of a `.gitignore` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    text: bstr::BString,
    mode: Mode,
}

impl Pattern {
    /// Parse one `.gitignore` line into a pattern. Returns `None` for blank lines and comments.
    pub fn from_line(line: &BStr) -> Option<Self> {
        let mut line = line;
        if line.is_empty() || line.starts_with(b"#") {
            return None;
        }
        let mut mode = Mode::empty();
        if let Some(rest) = line.strip_prefix(b"!") {
            mode |= Mode::NEGATIVE;
            line = rest.as_bstr();
        }
        if line.is_empty() {
            return None;
        }
        if line.contains_str("/") && !line.ends_with(b"/") && !line.starts_with(b"/") {
            mode |= Mode::ANCHORED;
        }
        if line.starts_with(b"/") {
            mode |= Mode::ANCHORED;
            line = line[1..].as_bstr();
        }
        if line.ends_with(b"/") {
            mode |= Mode::MUST_BE_DIR;
            line = line[..line.len() - 1].as_bstr();
        }
        if line.is_empty() {
            return None;
        }
        Some(Pattern {
            text: line.to_owned(),
            mode,
        })
    }

    /// Whether this pattern is a negation.
    pub fn is_negative(&self) -> bool {
        self.mode.contains(Mode::NEGATIVE)
    }

    /// Match `relative_path` (always `/`-separated, relative to the directory the pattern
    /// was declared in) against this pattern. `is_dir` lets directory-only patterns decline
    /// to match plain files.
    pub fn matches(&self, relative_path: &BStr, is_dir: bool) -> bool {
        if self.mode.contains(Mode::MUST_BE_DIR) && !is_dir {
            return false;
        }
        if self.mode.contains(Mode::ANCHORED) {
            glob_match(self.text.as_bstr(), relative_path)
        } else {
            glob_match(self.text.as_bstr(), relative_path)
                || relative_path
                    .rfind_byte(b'/')
                    .map(|pos| glob_match(self.text.as_bstr(), relative_path[pos + 1..].as_bstr()))
                    .unwrap_or(false)
        }
    }
}

/// Shell-style glob match supporting `*`, `?`, `[...]` and `**` across path separators.
fn glob_match(pattern: &BStr, text: &BStr) -> bool {
    glob_match_bytes(pattern.as_ref(), text.as_ref())
}

fn glob_match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(b'*'), _) if pattern.get(1) == Some(&b'*') => {
            // `**` matches across directory separators, including zero segments.
            let rest = &pattern[2..];
            let rest = if rest.first() == Some(&b'/') { &rest[1..] } else { rest };
            (0..=text.len()).any(|i| glob_match_bytes(rest, &text[i..]))
        }
        (Some(b'*'), _) => (0..=text.len())
            .take_while(|&i| i == 0 || text[i - 1] != b'/')
            .any(|i| glob_match_bytes(&pattern[1..], &text[i..])),
        (Some(b'?'), Some(c)) if *c != b'/' => glob_match_bytes(&pattern[1..], &text[1..]),
        (Some(b'['), Some(c)) => match match_class(&pattern[1..], *c) {
            Some(consumed) => glob_match_bytes(&pattern[1 + consumed..], &text[1..]),
            None => false,
        },
        (Some(p), Some(c)) if p == c => glob_match_bytes(&pattern[1..], &text[1..]),
        _ => false,
    }
}

fn match_class(pattern: &[u8], c: u8) -> Option<usize> {
    let end = pattern.iter().position(|b| *b == b']')?;
    let class = &pattern[..end];
    let (negate, class) = match class.first() {
        Some(b'!') | Some(b'^') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut matched = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == b'-' {
            if class[i] <= c && c <= class[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if class[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    if matched != negate {
        Some(end + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::ByteSlice;

    fn p(s: &str) -> Pattern {
        Pattern::from_line(s.as_bytes().as_bstr()).unwrap()
    }

    #[test]
    fn simple_name_matches_anywhere() {
        let pat = p("*.log");
        assert!(pat.matches(b"a/b/debug.log".as_bstr(), false));
    }

    #[test]
    fn anchored_pattern_matches_only_from_root() {
        let pat = p("/build");
        assert!(pat.matches(b"build".as_bstr(), true));
        assert!(!pat.matches(b"sub/build".as_bstr(), true));
    }

    #[test]
    fn directory_only_pattern_rejects_files() {
        let pat = p("target/");
        assert!(pat.matches(b"target".as_bstr(), true));
        assert!(!pat.matches(b"target".as_bstr(), false));
    }

    #[test]
    fn negative_pattern_is_flagged() {
        assert!(p("!keep.log").is_negative());
    }

    #[test]
    fn double_star_crosses_directories() {
        let pat = p("**/*.rs");
        assert!(pat.matches(b"a/b/c.rs".as_bstr(), false));
    }
}
