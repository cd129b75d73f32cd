//! The client side of `git-upload-pack`: advertisement, want/have negotiation, and
//! receiving the resulting (possibly side-banded) pack stream.
use std::io::{BufRead, Write};

use bstr::ByteSlice;
use git_hash::ObjectId;

use crate::capabilities::Capabilities;
use crate::pktline::{self, PacketLine};
use crate::refs::{self, RemoteRef};
use crate::sideband::{self, Channel};
use crate::Error;

/// How many `have` lines to send before pausing for an ack round.
const HAVE_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct Advertisement {
    pub refs: Vec<RemoteRef>,
    pub capabilities: Capabilities,
    pub head: Option<ObjectId>,
}

/// Which refs an `ls_remote` call should keep. Both flags unset (the default) keeps
/// everything; either flag set narrows the result to that one namespace, matching
/// the two independent `setHeads`/`setTags` switches a caller can flip.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct LsRemoteFilter {
    pub heads: bool,
    pub tags: bool,
}

impl LsRemoteFilter {
    fn matches(&self, name: &bstr::BStr) -> bool {
        if !self.heads && !self.tags {
            return true;
        }
        (self.heads && name.starts_with(b"refs/heads/")) || (self.tags && name.starts_with(b"refs/tags/"))
    }
}

/// Read a full ref advertisement (the CONNECT/ADVERT states) without starting a
/// fetch, keeping only the refs `filter` selects. `HEAD` resolution still considers
/// every advertised ref regardless of `filter`, since `HEAD` itself lives outside
/// both the `refs/heads/` and `refs/tags/` namespaces.
pub fn ls_remote<R: BufRead>(reader: &mut R, filter: LsRemoteFilter) -> Result<Advertisement, Error> {
    let lines = pktline::read_lines_until_flush(&mut *reader)?;
    let (refs, capabilities) = refs::parse_advertisement(&lines)?;
    let head = refs::resolve_head(&refs, &capabilities).map(|r| r.id);
    let refs = refs.into_iter().filter(|r| filter.matches(r.name.as_bstr())).collect();
    Ok(Advertisement { refs, capabilities, head })
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Ack {
    Common(ObjectId),
    Ready,
    Nak,
}

pub fn parse_ack(line: &[u8]) -> Result<Ack, Error> {
    let line = pktline::trim_newline(line.to_vec());
    let text = std::str::from_utf8(&line).map_err(|_| Error::InvalidAck("ack/nak line is not UTF-8".into()))?;
    if text == "NAK" {
        return Ok(Ack::Nak);
    }
    let mut parts = text.split(' ');
    match parts.next() {
        Some("ACK") => {
            let id: ObjectId = parts
                .next()
                .ok_or_else(|| Error::InvalidAck(text.into()))?
                .parse()
                .map_err(|_| Error::InvalidAck(text.into()))?;
            match parts.next() {
                Some("ready") => Ok(Ack::Ready),
                _ => Ok(Ack::Common(id)),
            }
        }
        _ => Err(Error::InvalidAck(text.into())),
    }
}

pub struct FetchRequest<'a> {
    pub wants: &'a [ObjectId],
    pub haves: &'a [ObjectId],
    /// A fixed shallow boundary already known to the client, re-sent so the server
    /// doesn't have to walk past it again.
    pub shallow: &'a [ObjectId],
    /// `deepen <n>`, if the client wants to extend a shallow clone by `n` commits.
    pub deepen: Option<u32>,
}

/// Send the `want`/`have` negotiation (the WANT and HAVE/ACK-loop states) and return
/// the ids the server acknowledged as common, so the caller knows what it need not
/// send objects for on a subsequent push.
pub fn negotiate<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    request: &FetchRequest<'_>,
    capabilities: &Capabilities,
) -> Result<Vec<ObjectId>, Error> {
    let negotiated = capabilities.negotiate();
    let mut wants = request.wants.iter();
    if let Some(first) = wants.next() {
        let mut line = format!("want {}", first.to_hex());
        if !negotiated.is_empty() {
            line.push(' ');
            line.push_str(&negotiated.join(" "));
        }
        pktline::write_text(&mut writer, &line)?;
    }
    for want in wants {
        pktline::write_text(&mut writer, &format!("want {}", want.to_hex()))?;
    }
    for id in request.shallow {
        pktline::write_text(&mut writer, &format!("shallow {}", id.to_hex()))?;
    }
    if let Some(depth) = request.deepen {
        pktline::write_text(&mut writer, &format!("deepen {}", depth))?;
    }
    pktline::write_flush(&mut writer)?;

    let mut acknowledged = Vec::new();
    if request.haves.is_empty() {
        pktline::write_text(&mut writer, "done")?;
        return Ok(acknowledged);
    }

    for batch in request.haves.chunks(HAVE_BATCH_SIZE) {
        for have in batch {
            pktline::write_text(&mut writer, &format!("have {}", have.to_hex()))?;
        }
        pktline::write_flush(&mut writer)?;

        loop {
            match pktline::read_line(&mut reader)? {
                Some(PacketLine::Data(line)) => match parse_ack(&line)? {
                    Ack::Common(id) => acknowledged.push(id),
                    Ack::Ready => break,
                    Ack::Nak => break,
                },
                Some(PacketLine::Flush) | None => break,
                Some(PacketLine::Delimiter) | Some(PacketLine::ResponseEnd) => continue,
            }
        }
    }

    pktline::write_text(&mut writer, "done")?;
    Ok(acknowledged)
}

/// Drain the PACK phase from `reader`, demultiplexing sideband channels if
/// `side_band_64k` was negotiated, and return the raw pack bytes (progress lines are
/// dropped; an error-channel payload aborts the fetch).
pub fn receive_pack<R: BufRead>(mut reader: R, side_band_64k: bool) -> Result<Vec<u8>, Error> {
    let mut pack = Vec::new();
    loop {
        match pktline::read_line(&mut reader)? {
            None | Some(PacketLine::Flush) => break,
            Some(PacketLine::Delimiter) | Some(PacketLine::ResponseEnd) => continue,
            Some(PacketLine::Data(payload)) => {
                if side_band_64k {
                    match sideband::demux(&payload)? {
                        Channel::Data(bytes) => pack.extend_from_slice(&bytes),
                        Channel::Progress(_) => {}
                        Channel::Error(message) => {
                            return Err(Error::Remote(String::from_utf8_lossy(&message).into_owned()))
                        }
                    }
                } else {
                    pack.extend_from_slice(&payload);
                }
            }
        }
    }
    Ok(pack)
}

/// Run a whole fetch against an already-connected, already-advertised transport:
/// negotiate, receive and decode the pack, and import the objects it carried. This
/// stops short of moving any ref: the caller derives the remote-tracking updates it
/// wants from `advertisement.refs` and the returned ids, then applies them with
/// [`update_refs`]. Splitting it this way keeps the stage (write objects, all of
/// which are safe to leave behind content-addressed) separate from the commit
/// (flip refs with CAS), so a fetch that dies mid-pack never moves a ref to an
/// object the store doesn't have.
pub fn fetch<R: BufRead, W: Write, S: git_odb::Find + git_odb::Write>(
    mut reader: R,
    mut writer: W,
    advertisement: &Advertisement,
    request: &FetchRequest<'_>,
    odb: &S,
) -> Result<Vec<ObjectId>, Error> {
    negotiate(&mut reader, &mut writer, request, &advertisement.capabilities)?;
    let side_band_64k = advertisement.capabilities.supports("side-band-64k");
    let pack = receive_pack(&mut reader, side_band_64k)?;
    Ok(git_pack::import_pack(&pack, odb)?)
}

/// One remote-tracking ref to move once a fetch's pack has been imported successfully.
pub struct RefUpdate {
    pub name: git_ref::FullName,
    /// The id this ref is expected to currently point at (`None` for a ref that
    /// must not yet exist locally); the update is rejected if this doesn't hold.
    pub expected: Option<ObjectId>,
    pub new: ObjectId,
}

/// Apply every update via compare-and-swap, stopping at the first one that doesn't
/// hold rather than leaving some refs moved and others not: a fetch's ref updates
/// are a single all-or-nothing step following the object import.
pub fn update_refs(refs: &git_ref::Store, updates: &[RefUpdate]) -> Result<(), Error> {
    for update in updates {
        refs.compare_and_swap(&update.name, update.expected, git_ref::Target::Direct(update.new))?;
    }
    Ok(())
}
