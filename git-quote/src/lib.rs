//! Quote byte strings the way git does when printing paths that contain characters
//! outside of printable ASCII: wrap in double quotes and C-style escape.
#![deny(unsafe_code)]

use bstr::{BStr, BString};

/// Quote `input` the way `git status`/`git diff` quote paths: if every byte is
/// printable ASCII and doesn't need escaping, return it unquoted; otherwise wrap it
/// in double quotes and apply C-style backslash escapes (and octal escapes for
/// non-ASCII bytes).
pub fn ansi_c(input: &BStr) -> BString {
    if !needs_quoting(input) {
        return input.to_owned();
    }
    let mut out = Vec::with_capacity(input.len() + 2);
    out.push(b'"');
    for &b in input.as_ref() as &[u8] {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7e => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
    out.push(b'"');
    BString::from(out)
}

fn needs_quoting(input: &BStr) -> bool {
    input
        .iter()
        .any(|&b| !(0x20..=0x7e).contains(&b) || b == b'"' || b == b'\\')
}

/// Undo [`ansi_c`], returning the raw bytes. If `input` isn't quoted it's returned as-is.
pub fn undo(input: &BStr) -> BString {
    let bytes: &[u8] = input.as_ref();
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return input.to_owned();
    }
    let inner = &bytes[1..bytes.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut iter = inner.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'"') => out.push(b'"'),
            Some(b'\\') => out.push(b'\\'),
            Some(d) if d.is_ascii_digit() => {
                let mut value = d - b'0';
                for _ in 0..2 {
                    if let Some(d2) = iter.peek().copied() {
                        if d2.is_ascii_digit() {
                            value = value * 8 + (d2 - b'0');
                            iter.next();
                            continue;
                        }
                    }
                    break;
                }
                out.push(value);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    BString::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::ByteSlice;

    #[test]
    fn plain_ascii_is_unquoted() {
        assert_eq!(ansi_c(b"src/main.rs".as_bstr()), "src/main.rs");
    }

    #[test]
    fn space_and_quote_are_escaped() {
        let quoted = ansi_c(b"a \"b\".txt".as_bstr());
        assert_eq!(quoted, "\"a \\\"b\\\".txt\"");
        assert_eq!(undo(quoted.as_bstr()), "a \"b\".txt");
    }

    #[test]
    fn high_byte_is_octal_escaped() {
        let quoted = ansi_c(b"\xc3\xa9".as_bstr());
        assert_eq!(undo(quoted.as_bstr()).as_slice(), b"\xc3\xa9");
    }
}
