//! The git wire protocol: pkt-line framing, sideband demultiplexing, capability
//! negotiation, and the client side of fetch and push, synchronous over any
//! `BufRead`/`Write` transport (a TCP stream, a subprocess's stdio, or an in-memory
//! buffer in tests) rather than tied to one async runtime.
#![deny(unsafe_code)]

pub mod capabilities;
pub mod error;
pub mod fetch;
pub mod pktline;
pub mod push;
pub mod refs;
pub mod sideband;

pub use capabilities::Capabilities;
pub use error::Error;
pub use fetch::{fetch, ls_remote, negotiate, receive_pack, Ack, Advertisement, FetchRequest, LsRemoteFilter};
pub use pktline::PacketLine;
pub use push::{check_report, parse_report, send_commands, Command, Report};
pub use refs::RemoteRef;
