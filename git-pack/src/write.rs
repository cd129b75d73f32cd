//! Assembling a pack from a set of objects, with optional delta compression against
//! a bounded window of recently-written objects of the same kind.

use std::io::Write as _;

use flate2::{write::ZlibEncoder, Compression};
use git_hash::ObjectId;

use crate::header::{self, EntryKind};

/// Tunables for delta selection during [`PackWriter::finalize`].
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// How many of the most recently written same-kind objects to try as a delta base.
    pub delta_search_window: usize,
    /// A candidate delta is kept only if its size is at most `target_size * delta_ratio`.
    pub delta_ratio: f32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            delta_search_window: 10,
            delta_ratio: 0.95,
        }
    }
}

struct PendingObject {
    id: ObjectId,
    kind: git_object::Kind,
    payload: Vec<u8>,
}

/// Builds a pack file in memory from a sequence of objects, writing deltas where they
/// pay off and finalizing with the SHA-1 trailer.
pub struct PackWriter {
    options: Options,
    objects: Vec<PendingObject>,
}

/// One object's placement in the finished pack, used to build the paired `.idx`.
#[derive(Debug, Clone, Copy)]
pub struct PlacedObject {
    pub id: ObjectId,
    pub offset: u64,
    pub crc32: u32,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        PackWriter { options, objects: Vec::new() }
    }

    /// Add `payload` of kind `kind`; returns the id it will be stored under. Callers
    /// choose the write order (commits newest-first, then trees, then blobs, makes for
    /// the best delta locality).
    pub fn push(&mut self, kind: git_object::Kind, payload: Vec<u8>) -> ObjectId {
        let id = git_object::compute_hash(git_hash::Kind::Sha1, kind, &payload);
        self.objects.push(PendingObject { id, kind, payload });
        id
    }

    /// Assemble the final pack bytes and the placement of every object within it.
    pub fn finalize(self) -> (Vec<u8>, Vec<PlacedObject>) {
        let mut out = Vec::new();
        out.extend_from_slice(b"PACK");
        out.extend_from_slice(&2u32.to_be_bytes());
        out.extend_from_slice(&(self.objects.len() as u32).to_be_bytes());

        let mut placed = Vec::with_capacity(self.objects.len());
        for (index, object) in self.objects.iter().enumerate() {
            let base = self.best_delta_base(index);
            let offset = out.len() as u64;
            let (kind, stored_payload) = match base {
                Some((base_id, delta)) => (EntryKind::RefDelta { base_id }, delta),
                None => (EntryKind::from_object_kind(object.kind), object.payload.clone()),
            };

            let entry_start = out.len();
            header::write_entry_header(&mut out, &kind, stored_payload.len() as u64);
            let compressed = compress(&stored_payload);
            out.extend_from_slice(&compressed);

            let crc32 = crc32fast::hash(&out[entry_start..]);
            placed.push(PlacedObject { id: object.id, offset, crc32 });
        }

        let trailer = git_hash::hash_bytes(git_hash::Kind::Sha1, &out);
        out.extend_from_slice(trailer.as_slice());
        (out, placed)
    }

    fn best_delta_base(&self, index: usize) -> Option<(ObjectId, Vec<u8>)> {
        let object = &self.objects[index];
        let window_start = index.saturating_sub(self.options.delta_search_window);
        let mut best: Option<(ObjectId, Vec<u8>)> = None;
        for candidate in self.objects[window_start..index].iter().rev() {
            if candidate.kind != object.kind {
                continue;
            }
            let delta = crate::delta::compute(&candidate.payload, &object.payload);
            let within_ratio = (delta.len() as f32) <= (object.payload.len() as f32) * self.options.delta_ratio;
            if !within_ratio {
                continue;
            }
            if best.as_ref().map_or(true, |(_, best_delta)| delta.len() < best_delta.len()) {
                best = Some((candidate.id, delta));
            }
        }
        best
    }
}

impl Default for PackWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to an in-memory Vec cannot fail");
    encoder.finish().expect("writing to an in-memory Vec cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{verify_trailer, Entries};

    #[test]
    fn writes_a_valid_trailer() {
        let mut writer = PackWriter::new();
        writer.push(git_object::Kind::Blob, b"alpha".to_vec());
        writer.push(git_object::Kind::Blob, b"beta".to_vec());
        let (bytes, placed) = writer.finalize();
        verify_trailer(&bytes).unwrap();
        assert_eq!(placed.len(), 2);
    }

    #[test]
    fn similar_objects_are_deltified() {
        let mut writer = PackWriter::new();
        let base = "shared prefix that is reasonably long so the delta is worthwhile".repeat(4);
        writer.push(git_object::Kind::Blob, base.clone().into_bytes());
        let mut similar = base;
        similar.push_str(" and a small tail");
        writer.push(git_object::Kind::Blob, similar.into_bytes());
        let (bytes, _placed) = writer.finalize();

        let entries: Vec<_> = Entries::new(&bytes).unwrap().collect::<Result<_, _>>().unwrap();
        assert!(matches!(entries[1].kind, crate::header::EntryKind::RefDelta { .. }));
    }
}
