//! One file per object at `objects/<first2>/<rest38>`, zlib-wrapped around the
//! canonical `"<type> <size>\0<payload>"` frame.

use std::fs;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use git_hash::ObjectId;
use git_object::{Kind, Object};

use crate::Error;

/// A loose-object directory, i.e. the `objects/` folder minus its `pack/` subdirectory.
pub struct LooseStore {
    root: PathBuf,
}

impl LooseStore {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        LooseStore { root: root.into() }
    }

    fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    pub fn has(&self, id: &ObjectId) -> bool {
        self.path_for(id).is_file()
    }

    /// Read and validate the object at `id`: the frame's declared size must match the
    /// payload length, and the hash of the decompressed frame must equal `id`.
    pub fn load(&self, id: &ObjectId) -> Result<Object, Error> {
        let path = self.path_for(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound(*id)),
            Err(err) => return Err(Error::Io(err)),
        };

        let mut framed = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut framed)
            .map_err(|_| Error::Corrupt { id: *id, reason: "not a valid zlib stream".into() })?;

        let (kind, payload) = parse_frame(&framed).map_err(|reason| Error::Corrupt { id: *id, reason })?;

        let actual = git_hash::hash_framed(git_hash::Kind::Sha1, &framed);
        if actual != *id {
            return Err(Error::Corrupt {
                id: *id,
                reason: format!("hash mismatch: stored under {id} but hashes to {actual}"),
            });
        }

        Object::from_bytes(kind, payload).map_err(|err| Error::Corrupt { id: *id, reason: err.to_string() })
    }

    /// Canonicalize, hash, and atomically write `payload` of kind `kind`. A no-op if
    /// the object is already present, matching the store contract's idempotence.
    pub fn store(&self, kind: Kind, payload: &[u8]) -> Result<ObjectId, Error> {
        let framed = git_object::frame(kind, payload);
        let id = git_hash::hash_framed(git_hash::Kind::Sha1, &framed);
        let path = self.path_for(&id);
        if path.is_file() {
            return Ok(id);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&framed)?;
        let compressed = encoder.finish()?;

        let mut tempfile = git_tempfile::new(&path, git_tempfile::ContainingDirectory::CreateAllRaceproof)?;
        tempfile.write_all(&compressed)?;
        tempfile.persist(&path)?;
        Ok(id)
    }

    pub fn remove(&self, id: &ObjectId) -> Result<bool, Error> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Enumerate every loose object id by walking the two-level directory fan-out.
    pub fn keys(&self) -> Result<Vec<ObjectId>, Error> {
        let mut ids = Vec::new();
        let Ok(top) = fs::read_dir(&self.root) else {
            return Ok(ids);
        };
        for entry in top {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let prefix = entry.file_name();
            let Some(prefix) = prefix.to_str() else { continue };
            if prefix.len() != 2 || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
                continue;
            }
            for rest in fs::read_dir(entry.path())? {
                let rest = rest?;
                let Some(rest_name) = rest.file_name().to_str().map(str::to_owned) else { continue };
                if rest_name.len() != 38 || !rest_name.bytes().all(|b| b.is_ascii_hexdigit()) {
                    continue;
                }
                let hex = format!("{prefix}{rest_name}");
                if let Ok(id) = ObjectId::from_hex(hex.as_bytes()) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn parse_frame(framed: &[u8]) -> Result<(Kind, &[u8]), String> {
    let space = framed.iter().position(|&b| b == b' ').ok_or("missing type in frame header")?;
    let kind = Kind::from_bytes(&framed[..space]).ok_or("unknown object type in frame header")?;
    let nul = framed.iter().position(|&b| b == 0).ok_or("missing NUL terminator in frame header")?;
    let size: usize = std::str::from_utf8(&framed[space + 1..nul])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or("non-numeric size in frame header")?;
    let payload = &framed[nul + 1..];
    if payload.len() != size {
        return Err(format!("declared size {size} does not match payload length {}", payload.len()));
    }
    Ok((kind, payload))
}
