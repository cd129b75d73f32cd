//! A minimal reader for the `packed-refs` file: one `<id> <name>` pair per line, with an
//! optional `^<id>` line right after giving the peeled target of an annotated tag.

use git_hash::ObjectId;

use crate::FullName;

/// One entry parsed out of a `packed-refs` file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    pub name: FullName,
    pub target: ObjectId,
    pub peeled: Option<ObjectId>,
}

/// Parse the full contents of a `packed-refs` file. Malformed lines are skipped rather
/// than failing the whole file, matching git's own tolerant reader.
pub fn parse(data: &[u8]) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::new();
    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() || line[0] == b'#' {
            continue;
        }
        if line[0] == b'^' {
            if let (Some(last), Ok(peeled)) = (entries.last_mut(), ObjectId::from_hex(&line[1..])) {
                last.peeled = Some(peeled);
            }
            continue;
        }
        let Some(space) = line.iter().position(|&b| b == b' ') else { continue };
        let Ok(target) = ObjectId::from_hex(&line[..space]) else { continue };
        let Ok(name) = FullName::try_from(line[space + 1..].to_vec()) else { continue };
        entries.push(Entry { name, target, peeled: None });
    }
    entries
}
