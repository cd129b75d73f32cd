//! Capability negotiation: a space-separated list of `name` or `name=value` tokens
//! that rides along on the first advertised ref line (v0) or a dedicated section
//! (v2). Kept as an ordered list rather than a map since keys such as `symref` are
//! meant to repeat, one per ref.
use bstr::ByteSlice;

/// The client's preference order, most wanted first. Negotiation picks, in this
/// order, whichever of these the server also advertises.
pub const CLIENT_PREFERENCE: &[&str] =
    &["multi_ack_detailed", "thin-pack", "side-band-64k", "ofs-delta", "no-progress", "include-tag", "shallow"];

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Capabilities(Vec<(String, Option<String>)>);

impl Capabilities {
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split_whitespace()
            .map(|token| match token.split_once('=') {
                Some((name, value)) => (name.to_owned(), Some(value.to_owned())),
                None => (token.to_owned(), None),
            })
            .collect();
        Capabilities(entries)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// The value of the first entry named `name`, if it carried one.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(key, _)| key == name).and_then(|(_, value)| value.as_deref())
    }

    /// All values of entries named `name`, in advertised order (`symref` repeats).
    pub fn values(&self, name: &str) -> impl Iterator<Item = &str> {
        self.0.iter().filter(move |(key, _)| key == name).filter_map(|(_, value)| value.as_deref())
    }

    /// The target of a `symref=<name>:<target>` entry for `name`, e.g. HEAD's branch.
    pub fn symref_target(&self, name: &str) -> Option<&str> {
        self.values("symref").find_map(|entry| entry.split_once(':').filter(|(src, _)| *src == name).map(|(_, target)| target))
    }

    /// Format as the client wants to send it back: every entry this side supports
    /// that the server also advertised, in [`CLIENT_PREFERENCE`] order.
    pub fn negotiate(&self) -> Vec<&'static str> {
        CLIENT_PREFERENCE.iter().copied().filter(|name| self.supports(name)).collect()
    }

    pub fn to_line(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{}={}", key, value),
                None => key.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.push((name.into(), value));
    }
}

/// Split a ref-advertisement line's trailing `\0capabilities...` suffix off, if present.
pub fn split_capabilities(line: &[u8]) -> (&[u8], Capabilities) {
    match line.find_byte(0) {
        Some(pos) => (&line[..pos], Capabilities::parse(&String::from_utf8_lossy(&line[pos + 1..]))),
        None => (line, Capabilities::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_and_valued_tokens() {
        let caps = Capabilities::parse("multi_ack_detailed side-band-64k agent=git/2.30.0");
        assert!(caps.supports("multi_ack_detailed"));
        assert!(caps.supports("side-band-64k"));
        assert_eq!(caps.value("agent"), Some("git/2.30.0"));
        assert!(!caps.supports("shallow"));
    }

    #[test]
    fn negotiate_keeps_client_preference_order_filtered_to_server_support() {
        let caps = Capabilities::parse("shallow ofs-delta side-band-64k");
        assert_eq!(caps.negotiate(), vec!["side-band-64k", "ofs-delta", "shallow"]);
    }

    #[test]
    fn symref_target_finds_the_matching_entry_among_repeats() {
        let caps = Capabilities::parse("symref=HEAD:refs/heads/main symref=refs/remotes/origin/HEAD:refs/remotes/origin/main");
        assert_eq!(caps.symref_target("HEAD"), Some("refs/heads/main"));
    }

    #[test]
    fn split_capabilities_separates_the_null_suffix() {
        let line = b"0000000000000000000000000000000000000000 HEAD\0multi_ack thin-pack";
        let (head, caps) = split_capabilities(line);
        assert_eq!(head, b"0000000000000000000000000000000000000000 HEAD");
        assert!(caps.supports("thin-pack"));
    }

    #[test]
    fn line_without_a_null_byte_has_no_capabilities() {
        let (head, caps) = split_capabilities(b"0000000000000000000000000000000000000000 refs/heads/main");
        assert_eq!(head, b"0000000000000000000000000000000000000000 refs/heads/main");
        assert_eq!(caps, Capabilities::default());
    }
}
