//! pkt-line framing: every line on the wire is a four hex digit length header
//! (counting the header itself) followed by that many bytes of payload, with the
//! special all-zero lengths `0000`, `0001`, `0002` reserved as control packets.
use std::io::{self, BufRead, Read, Write};

use crate::Error;

/// The largest payload a single data packet may carry (65520 total minus the 4 byte
/// length header).
pub const MAX_DATA_LEN: usize = 65516;

/// One line read off the wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PacketLine {
    Data(Vec<u8>),
    /// `0000`: ends a list, or a whole negotiation round.
    Flush,
    /// `0001`: separates sections within a protocol v2 request.
    Delimiter,
    /// `0002`: protocol v2 marks the end of a response.
    ResponseEnd,
}

impl PacketLine {
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            PacketLine::Data(bytes) => Some(bytes),
            _ => None,
        }
    }
}

pub fn write_data(mut out: impl Write, payload: &[u8]) -> Result<(), Error> {
    if payload.len() > MAX_DATA_LEN {
        return Err(Error::PacketTooLong(payload.len() + 4));
    }
    let header = format!("{:04x}", payload.len() + 4);
    out.write_all(header.as_bytes())?;
    out.write_all(payload)?;
    Ok(())
}

pub fn write_text(out: impl Write, line: &str) -> Result<(), Error> {
    let mut buf = line.as_bytes().to_vec();
    if !buf.ends_with(b"\n") {
        buf.push(b'\n');
    }
    write_data(out, &buf)
}

pub fn write_flush(mut out: impl Write) -> Result<(), Error> {
    out.write_all(b"0000")?;
    Ok(())
}

pub fn write_delim(mut out: impl Write) -> Result<(), Error> {
    out.write_all(b"0001")?;
    Ok(())
}

pub fn write_response_end(mut out: impl Write) -> Result<(), Error> {
    out.write_all(b"0002")?;
    Ok(())
}

/// Read one packet line, or `None` on a clean EOF before any header byte arrived.
pub fn read_line(mut input: impl BufRead) -> Result<Option<PacketLine>, Error> {
    let mut header = [0u8; 4];
    match read_exact_or_eof(&mut input, &mut header)? {
        false => return Ok(None),
        true => {}
    }
    let text = std::str::from_utf8(&header).map_err(|_| Error::InvalidLengthHeader(header.to_vec()))?;
    let len = usize::from_str_radix(text, 16).map_err(|_| Error::InvalidLengthHeader(header.to_vec()))?;
    match len {
        0 => Ok(Some(PacketLine::Flush)),
        1 => Ok(Some(PacketLine::Delimiter)),
        2 => Ok(Some(PacketLine::ResponseEnd)),
        n if n < 4 => Err(Error::InvalidLengthHeader(header.to_vec())),
        n if n > 65520 => Err(Error::PacketTooLong(n)),
        n => {
            let mut payload = vec![0u8; n - 4];
            input.read_exact(&mut payload).map_err(|_| Error::TruncatedPacket(n - 4))?;
            Ok(Some(PacketLine::Data(payload)))
        }
    }
}

fn read_exact_or_eof(mut input: impl Read, buf: &mut [u8]) -> Result<bool, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..])? {
            0 if filled == 0 => return Ok(false),
            0 => return Err(Error::TruncatedPacket(buf.len() - filled)),
            n => filled += n,
        }
    }
    Ok(true)
}

/// Read packet lines until a flush (exclusive) or EOF, returning only data packets.
pub fn read_lines_until_flush(mut input: impl BufRead) -> Result<Vec<Vec<u8>>, Error> {
    let mut lines = Vec::new();
    loop {
        match read_line(&mut input)? {
            None | Some(PacketLine::Flush) => return Ok(lines),
            Some(PacketLine::Data(bytes)) => lines.push(bytes),
            Some(PacketLine::Delimiter) | Some(PacketLine::ResponseEnd) => continue,
        }
    }
}

/// Strip a single trailing `\n` or `\r\n`, the way pkt-line text lines are usually sent.
pub fn trim_newline(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writes_the_four_byte_hex_length_header() {
        let mut buf = Vec::new();
        write_data(&mut buf, b"hello").unwrap();
        assert_eq!(buf, b"0009hello");
    }

    #[test]
    fn flush_delim_and_response_end_round_trip() {
        let mut buf = Vec::new();
        write_flush(&mut buf).unwrap();
        write_delim(&mut buf).unwrap();
        write_response_end(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_line(&mut cursor).unwrap(), Some(PacketLine::Flush));
        assert_eq!(read_line(&mut cursor).unwrap(), Some(PacketLine::Delimiter));
        assert_eq!(read_line(&mut cursor).unwrap(), Some(PacketLine::ResponseEnd));
        assert_eq!(read_line(&mut cursor).unwrap(), None);
    }

    #[test]
    fn reads_lines_until_flush_and_stops() {
        let mut buf = Vec::new();
        write_text(&mut buf, "first").unwrap();
        write_text(&mut buf, "second").unwrap();
        write_flush(&mut buf).unwrap();
        write_text(&mut buf, "unreachable").unwrap();

        let lines = read_lines_until_flush(Cursor::new(buf)).unwrap();
        assert_eq!(lines, vec![b"first\n".to_vec(), b"second\n".to_vec()]);
    }

    #[test]
    fn rejects_a_packet_longer_than_the_wire_limit() {
        let huge = vec![0u8; MAX_DATA_LEN + 1];
        let mut buf = Vec::new();
        assert!(write_data(&mut buf, &huge).is_err());
    }

    #[test]
    fn errors_on_a_truncated_payload() {
        let mut buf = Vec::new();
        write_data(&mut buf, b"hello world").unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_line(Cursor::new(buf)).is_err());
    }
}
