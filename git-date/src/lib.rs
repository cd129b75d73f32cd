//! Parse and format timestamps the way git does: seconds since the epoch, followed
//! by a `+HHMM`/`-HHMM` timezone offset, e.g. `1660000000 +0200`.
#![deny(unsafe_code)]

mod time;
pub use time::{parse, Error, Time};
