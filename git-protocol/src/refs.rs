//! Parsing the server's ref advertisement: one `<id> <name>` line per ref, the first
//! line carrying a `\0`-separated capability announcement.
use bstr::{BString, ByteSlice};
use git_hash::ObjectId;

use crate::capabilities::{split_capabilities, Capabilities};
use crate::Error;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteRef {
    pub name: BString,
    pub id: ObjectId,
}

/// The marker a bare "no refs at all" repository advertises instead of a real ref.
const NO_REFS_MARKER: &str = "capabilities^{}";

/// Parse the ref advertisement lines of either a v0 `info/refs` response or a
/// `ls-remote`/fetch handshake, pulling the capability announcement off the first
/// line and skipping the synthetic "no refs" marker some servers send.
pub fn parse_advertisement(lines: &[Vec<u8>]) -> Result<(Vec<RemoteRef>, Capabilities), Error> {
    let mut refs = Vec::new();
    let mut capabilities = Capabilities::default();

    for (index, line) in lines.iter().enumerate() {
        let line = crate::pktline::trim_newline(line.clone());
        let (line, caps) = if index == 0 { split_capabilities(&line) } else { (line.as_slice(), Capabilities::default()) };
        if index == 0 {
            capabilities = caps;
        }

        let text = line.to_str().map_err(|_| Error::InvalidRefLine("ref line is not valid UTF-8".into()))?;
        let (id_str, name) =
            text.split_once(' ').ok_or_else(|| Error::InvalidRefLine(format!("missing a single space: {:?}", text)))?;
        if name == NO_REFS_MARKER {
            continue;
        }
        let id: ObjectId = id_str.parse().map_err(|_| Error::InvalidRefLine(format!("not a valid object id: {:?}", id_str)))?;
        refs.push(RemoteRef { name: name.into(), id });
    }

    if refs.is_empty() && capabilities == Capabilities::default() {
        return Err(Error::EmptyAdvertisement);
    }
    Ok((refs, capabilities))
}

/// Resolve HEAD among the advertised refs via the `symref=HEAD:<target>` capability.
pub fn resolve_head<'a>(refs: &'a [RemoteRef], capabilities: &Capabilities) -> Option<&'a RemoteRef> {
    let target = capabilities.symref_target("HEAD")?;
    refs.iter().find(|r| r.name == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Vec<u8> {
        let mut v = s.as_bytes().to_vec();
        v.push(b'\n');
        v
    }

    #[test]
    fn parses_capabilities_off_the_first_line_only() {
        let lines = vec![
            line("0000000000000000000000000000000000000000 HEAD\0symref=HEAD:refs/heads/main side-band-64k"),
            line("1111111111111111111111111111111111111111 refs/heads/main"),
        ];
        let (refs, caps) = parse_advertisement(&lines).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "HEAD");
        assert!(caps.supports("side-band-64k"));
    }

    #[test]
    fn resolves_head_via_symref_capability() {
        let lines = vec![
            line("1111111111111111111111111111111111111111 HEAD\0symref=HEAD:refs/heads/main"),
            line("1111111111111111111111111111111111111111 refs/heads/main"),
        ];
        let (refs, caps) = parse_advertisement(&lines).unwrap();
        let head = resolve_head(&refs, &caps).unwrap();
        assert_eq!(head.name, "refs/heads/main");
    }

    #[test]
    fn skips_the_synthetic_no_refs_marker() {
        let lines = vec![line("0000000000000000000000000000000000000000 capabilities^{}\0side-band-64k")];
        let (refs, caps) = parse_advertisement(&lines).unwrap();
        assert!(refs.is_empty());
        assert!(caps.supports("side-band-64k"));
    }

    #[test]
    fn rejects_a_line_with_a_malformed_object_id() {
        let lines = vec![line("not-an-oid refs/heads/main")];
        assert!(parse_advertisement(&lines).is_err());
    }

    #[test]
    fn empty_input_with_no_capabilities_is_an_error() {
        assert!(parse_advertisement(&[]).is_err());
    }
}
