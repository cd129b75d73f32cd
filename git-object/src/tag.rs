use bstr::{BString, ByteSlice};
use git_actor::Signature;
use git_hash::ObjectId;

use crate::{Error, Kind};

/// An annotated tag: a named, optionally signed pointer to another object, usually a
/// commit.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// The object this tag points at.
    pub target: ObjectId,
    /// The kind of the target object.
    pub target_kind: Kind,
    /// The tag's name, e.g. `v1.0.0`.
    pub name: BString,
    /// Who made the tag. Lightweight tags aren't represented by this type at all, so
    /// this is mandatory here even though git's wire format technically allows omitting it.
    pub tagger: Option<Signature>,
    /// The tag message, including any trailing newline as originally written.
    pub message: BString,
}

impl Tag {
    /// Parse a tag from its canonical byte representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut lines = super::commit::Lines::new(data);
        let mut target = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;

        while let Some(line) = lines.next_header_line() {
            let (key, value) = split_header(line);
            match key {
                b"object" => target = Some(ObjectId::from_hex(value)?),
                b"type" => {
                    target_kind =
                        Some(Kind::from_bytes(value).ok_or(Error::MissingTagField("type"))?)
                }
                b"tag" => name = Some(BString::from(value.to_vec())),
                b"tagger" => tagger = Some(Signature::from_bytes(value)?),
                _ => {}
            }
        }

        Ok(Tag {
            target: target.ok_or(Error::MissingTagField("object"))?,
            target_kind: target_kind.ok_or(Error::MissingTagField("type"))?,
            name: name.ok_or(Error::MissingTagField("tag"))?,
            tagger,
            message: BString::from(lines.remainder().to_vec()),
        })
    }

    /// Serialize into the canonical byte representation that re-hashes to this tag's id.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, b"object", self.target.to_hex().as_bytes());
        write_header(&mut out, b"type", self.target_kind.as_str().as_bytes());
        write_header(&mut out, b"tag", &self.name);
        if let Some(tagger) = &self.tagger {
            out.extend_from_slice(b"tagger ");
            tagger.write_to(&mut out);
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
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

#[cfg(test)]
mod tests {
    use super::*;
    use git_date::Time;

    fn sig() -> Signature {
        Signature {
            name: "A U Thor".into(),
            email: "author@example.com".into(),
            time: Time::new(1_660_000_000, 7200),
        }
    }

    #[test]
    fn roundtrip_annotated_tag() {
        let tag = Tag {
            target: ObjectId::from_hex(b"4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap(),
            target_kind: Kind::Commit,
            name: "v1.0.0".into(),
            tagger: Some(sig()),
            message: "release\n".into(),
        };
        let bytes = tag.to_bytes();
        let parsed = Tag::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tag);
    }

    #[test]
    fn roundtrip_without_tagger() {
        let tag = Tag {
            target: ObjectId::null(git_hash::Kind::Sha1),
            target_kind: Kind::Blob,
            name: "snapshot".into(),
            tagger: None,
            message: "\n".into(),
        };
        let bytes = tag.to_bytes();
        let parsed = Tag::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tag);
    }

    #[test]
    fn rejects_missing_object_field() {
        let data = b"type commit\ntag v1\n\nmsg\n";
        assert!(matches!(Tag::from_bytes(data), Err(Error::MissingTagField("object"))));
    }
}
