use bstr::{BString, ByteSlice};

use crate::Signature;

/// The error returned by [`decode()`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a signature needs a name, an email in angle brackets, and a time")]
    Malformed,
    #[error(transparent)]
    Time(#[from] git_date::Error),
}

/// Parse `Name <email> seconds tz` into a [`Signature`].
pub fn decode(input: &[u8]) -> Result<Signature, Error> {
    let open = input.find_byte(b'<').ok_or(Error::Malformed)?;
    let close = input.find_byte(b'>').ok_or(Error::Malformed)?;
    if close < open {
        return Err(Error::Malformed);
    }

    let name = input[..open].trim_end().as_bstr();
    let email = input[open + 1..close].as_bstr();
    let rest = input[close + 1..].trim_start();
    let time = git_date::parse(rest)?;

    Ok(Signature {
        name: BString::from(name.to_vec()),
        email: BString::from(email.to_vec()),
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_signature() {
        let sig = decode(b"A U Thor <author@example.com> 1660000000 +0200").unwrap();
        assert_eq!(sig.name, "A U Thor");
        assert_eq!(sig.email, "author@example.com");
        assert_eq!(sig.time.seconds_since_unix_epoch, 1_660_000_000);
        assert_eq!(sig.time.offset_in_seconds, 7200);
    }

    #[test]
    fn roundtrips_through_write_to() {
        let sig = decode(b"A U Thor <author@example.com> 1660000000 +0200").unwrap();
        let mut buf = Vec::new();
        sig.write_to(&mut buf);
        assert_eq!(buf, b"A U Thor <author@example.com> 1660000000 +0200");
    }

    #[test]
    fn rejects_missing_brackets() {
        assert!(decode(b"A U Thor author@example.com 1660000000 +0200").is_err());
    }
}
