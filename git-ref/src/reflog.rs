use bstr::{BString, ByteSlice};
use git_actor::Signature;
use git_hash::ObjectId;

use crate::Error;

/// One line of a reference's log: the update it recorded and who made it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub previous: ObjectId,
    pub new: ObjectId,
    pub actor: Signature,
    pub message: BString,
}

impl Entry {
    fn to_line(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.previous.to_hex().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.new.to_hex().as_bytes());
        out.push(b' ');
        self.actor.write_to(&mut out);
        out.push(b'\t');
        out.extend_from_slice(&self.message);
        out.push(b'\n');
        out
    }

    fn from_line(line: &[u8]) -> Option<Self> {
        let (header, message) = match line.find_byte(b'\t') {
            Some(pos) => (&line[..pos], line[pos + 1..].as_bstr()),
            None => (line, b"".as_bstr()),
        };
        let mut parts = header.splitn(3, |&b| b == b' ');
        let previous = ObjectId::from_hex(parts.next()?).ok()?;
        let new = ObjectId::from_hex(parts.next()?).ok()?;
        let actor = Signature::from_bytes(parts.next()?).ok()?;
        Some(Entry { previous, new, actor, message: message.to_owned() })
    }
}

/// Append `entry` to the reflog file at `path`, creating parent directories as needed.
/// Failure here must not roll back the ref update that triggered it; callers should log
/// and continue rather than propagate this as a fatal error.
pub fn append(path: &std::path::Path, entry: &Entry) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    use std::io::Write;
    file.write_all(&entry.to_line())?;
    Ok(())
}

/// Read every entry of the reflog at `path`, oldest first. An absent file is an empty log.
pub fn read_all(path: &std::path::Path) -> Result<Vec<Entry>, Error> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    Ok(data.split(|&b| b == b'\n').filter(|line| !line.is_empty()).filter_map(Entry::from_line).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_date::Time;

    fn sig() -> Signature {
        Signature { name: "A U Thor".into(), email: "author@example.com".into(), time: Time::new(1_000_000, 0) }
    }

    #[test]
    fn append_then_read_all_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/HEAD");
        let entry = Entry {
            previous: ObjectId::null(git_hash::Kind::Sha1),
            new: ObjectId::from_hex(b"0123456789abcdef0123456789abcdef01234567").unwrap(),
            actor: sig(),
            message: "commit: initial".into(),
        };
        append(&path, &entry).unwrap();
        let entries = read_all(&path).unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[test]
    fn reading_a_missing_log_is_an_empty_vec() {
        let dir = tempfile::tempdir().unwrap();
        let entries = read_all(&dir.path().join("logs/does-not-exist")).unwrap();
        assert!(entries.is_empty());
    }
}
