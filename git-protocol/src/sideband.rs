//! Demultiplexing the `side-band`/`side-band-64k` channel: once negotiated, every
//! packet in the pack phase carries a leading channel byte ahead of its payload.
use crate::Error;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Channel {
    /// Channel 1: raw pack data.
    Data(Vec<u8>),
    /// Channel 2: human-readable progress, meant for display rather than parsing.
    Progress(Vec<u8>),
    /// Channel 3: a fatal error; the remote is about to hang up.
    Error(Vec<u8>),
}

pub fn demux(payload: &[u8]) -> Result<Channel, Error> {
    let (&band, rest) = payload.split_first().ok_or(Error::EmptySidebandPayload)?;
    match band {
        1 => Ok(Channel::Data(rest.to_vec())),
        2 => Ok(Channel::Progress(rest.to_vec())),
        3 => Ok(Channel::Error(rest.to_vec())),
        other => Err(Error::UnknownSidebandChannel(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_one_is_pack_data() {
        assert_eq!(demux(&[1, 0xde, 0xad]).unwrap(), Channel::Data(vec![0xde, 0xad]));
    }

    #[test]
    fn channel_two_is_progress_text() {
        assert_eq!(demux(b"\x02Counting objects: 10\n").unwrap(), Channel::Progress(b"Counting objects: 10\n".to_vec()));
    }

    #[test]
    fn channel_three_is_a_fatal_error() {
        assert_eq!(demux(b"\x03remote went away").unwrap(), Channel::Error(b"remote went away".to_vec()));
    }

    #[test]
    fn unknown_channel_byte_is_rejected() {
        assert!(demux(&[9, 1, 2]).is_err());
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(demux(&[]).is_err());
    }
}
