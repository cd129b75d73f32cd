use std::fmt;

use bstr::ByteSlice;

/// A point in time expressed the way git stores it: seconds since the Unix epoch, plus
/// the timezone offset of whoever made the commit, in seconds east of UTC.
///
/// Keeping author-local offset rather than normalizing to UTC matches git, where
/// `git log` renders commit times in the author's original timezone by default.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Time {
    /// Seconds since 1970-01-01 00:00:00 UTC.
    pub seconds_since_unix_epoch: i64,
    /// The offset east of UTC, in seconds, e.g. `7200` for `+0200`.
    pub offset_in_seconds: i32,
}

/// The error returned by [`parse()`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the timestamp field was not a valid integer")]
    InvalidSeconds,
    #[error("the timezone offset must look like +HHMM or -HHMM")]
    InvalidOffset,
    #[error("expected '<seconds> <+/-HHMM>', got {input:?}")]
    Malformed { input: String },
}

impl Time {
    /// Build a `Time` from raw components.
    pub fn new(seconds_since_unix_epoch: i64, offset_in_seconds: i32) -> Self {
        Time {
            seconds_since_unix_epoch,
            offset_in_seconds,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_in_seconds < 0 { '-' } else { '+' };
        let abs = self.offset_in_seconds.unsigned_abs();
        write!(
            f,
            "{} {}{:02}{:02}",
            self.seconds_since_unix_epoch,
            sign,
            abs / 3600,
            (abs % 3600) / 60
        )
    }
}

/// Parse a `Time` from its `<seconds> <+/-HHMM>` wire form.
pub fn parse(input: &[u8]) -> Result<Time, Error> {
    let input = input.trim();
    let mut parts = input.splitn(2, |b| *b == b' ');
    let seconds = parts.next().ok_or_else(|| Error::Malformed {
        input: input.as_bstr().to_string(),
    })?;
    let tz = parts.next().ok_or_else(|| Error::Malformed {
        input: input.as_bstr().to_string(),
    })?;

    let seconds_since_unix_epoch: i64 = std::str::from_utf8(seconds)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::InvalidSeconds)?;

    let offset_in_seconds = parse_offset(tz)?;
    Ok(Time {
        seconds_since_unix_epoch,
        offset_in_seconds,
    })
}

fn parse_offset(tz: &[u8]) -> Result<i32, Error> {
    if tz.len() != 5 || !(tz[0] == b'+' || tz[0] == b'-') {
        return Err(Error::InvalidOffset);
    }
    let sign = if tz[0] == b'-' { -1 } else { 1 };
    let digits = std::str::from_utf8(&tz[1..]).map_err(|_| Error::InvalidOffset)?;
    let hours: i32 = digits[0..2].parse().map_err(|_| Error::InvalidOffset)?;
    let minutes: i32 = digits[2..4].parse().map_err(|_| Error::InvalidOffset)?;
    Ok(sign * (hours * 3600 + minutes * 60))
}
