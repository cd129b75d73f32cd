use bstr::{BStr, BString, ByteSlice};
use git_actor::Signature;
use git_hash::ObjectId;

use crate::Error;

/// A commit: a tree plus zero or more parents, two identities, and a free-form message.
///
/// `parents` is ordered; the first parent is the mainline used by first-parent walks
/// (blame, `--first-parent` log).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Commit {
    /// The root tree of this commit's snapshot.
    pub tree: ObjectId,
    /// Parent commits, mainline first.
    pub parents: Vec<ObjectId>,
    /// Who wrote the change.
    pub author: Signature,
    /// Who committed it (may differ from the author, e.g. after a rebase).
    pub committer: Signature,
    /// Extra header lines preserved verbatim and in order, e.g. `gpgsig`, `mergetag`,
    /// `encoding`. Kept so re-serializing a commit we didn't fully understand still
    /// round-trips to the same id.
    pub extra_headers: Vec<(BString, BString)>,
    /// The commit message, including any trailing newline as originally written.
    pub message: BString,
}

impl Commit {
    /// Parse a commit from its canonical byte representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut lines = Lines::new(data);
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut extra_headers = Vec::new();

        while let Some(line) = lines.next_header_line() {
            let (key, value) = split_header(line);
            match key {
                b"tree" => tree = Some(ObjectId::from_hex(value)?),
                b"parent" => parents.push(ObjectId::from_hex(value)?),
                b"author" => author = Some(Signature::from_bytes(value)?),
                b"committer" => committer = Some(Signature::from_bytes(value)?),
                other => extra_headers.push((BString::from(other.to_vec()), BString::from(value.to_vec()))),
            }
        }

        Ok(Commit {
            tree: tree.ok_or(Error::MissingCommitField("tree"))?,
            parents,
            author: author.ok_or(Error::MissingCommitField("author"))?,
            committer: committer.ok_or(Error::MissingCommitField("committer"))?,
            extra_headers,
            message: BString::from(lines.remainder().to_vec()),
        })
    }

    /// Serialize into the canonical byte representation that re-hashes to this commit's id.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, b"tree", self.tree.to_hex().as_bytes());
        for parent in &self.parents {
            write_header(&mut out, b"parent", parent.to_hex().as_bytes());
        }
        out.extend_from_slice(b"author ");
        self.author.write_to(&mut out);
        out.push(b'\n');
        out.extend_from_slice(b"committer ");
        self.committer.write_to(&mut out);
        out.push(b'\n');
        for (key, value) in &self.extra_headers {
            write_header(&mut out, key, value);
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// The first line of the message, conventionally the commit's summary.
    pub fn summary(&self) -> &BStr {
        self.message
            .find_byte(b'\n')
            .map(|pos| self.message[..pos].as_bstr())
            .unwrap_or_else(|| self.message.as_bstr())
    }
}

fn write_header(out: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    out.extend_from_slice(key);
    out.push(b' ');
    out.extend_from_slice(value);
    out.push(b'\n');
}

fn split_header(line: &[u8]) -> (&[u8], &[u8]) {
    match line.find_byte(b' ') {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => (line, b""),
    }
}

/// A tiny line-oriented cursor used by both commit and tag parsing: headers are one
/// line each until the first blank line, after which everything remaining is the message.
pub(crate) struct Lines<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Lines { data, pos: 0 }
    }

    pub(crate) fn next_header_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        if rest.first() == Some(&b'\n') {
            self.pos += 1;
            return None;
        }
        let nl = rest.find_byte(b'\n').unwrap_or(rest.len());
        self.pos += nl + 1;
        Some(&rest[..nl])
    }

    pub(crate) fn remainder(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_date::Time;

    fn sig(name: &str) -> Signature {
        Signature {
            name: name.into(),
            email: format!("{name}@example.com").into(),
            time: Time::new(1_660_000_000, 3600),
        }
    }

    #[test]
    fn roundtrip_simple_commit() {
        let commit = Commit {
            tree: ObjectId::from_hex(b"4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap(),
            parents: vec![],
            author: sig("author"),
            committer: sig("committer"),
            extra_headers: vec![],
            message: "initial commit\n".into(),
        };
        let bytes = commit.to_bytes();
        let parsed = Commit::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, commit);
    }

    #[test]
    fn preserves_extra_headers_and_parent_order() {
        let mut commit = Commit {
            tree: ObjectId::null(git_hash::Kind::Sha1),
            parents: vec![
                ObjectId::from_hex(b"1111111111111111111111111111111111111111").unwrap(),
                ObjectId::from_hex(b"2222222222222222222222222222222222222222").unwrap(),
            ],
            author: sig("author"),
            committer: sig("committer"),
            extra_headers: vec![("encoding".into(), "UTF-8".into())],
            message: "merge\n".into(),
        };
        let bytes = commit.to_bytes();
        let parsed = Commit::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.parents, commit.parents);
        assert_eq!(parsed.extra_headers, commit.extra_headers);
        commit.message = "merge\n".into();
        assert_eq!(parsed, commit);
    }

    #[test]
    fn summary_stops_at_first_newline() {
        let commit = Commit {
            tree: ObjectId::null(git_hash::Kind::Sha1),
            parents: vec![],
            author: sig("author"),
            committer: sig("committer"),
            extra_headers: vec![],
            message: "subject line\n\nbody\n".into(),
        };
        assert_eq!(commit.summary(), "subject line");
    }
}
