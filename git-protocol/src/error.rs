/// Everything that can go wrong while speaking the wire protocol.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("pkt-line length header {0:?} is not four hex digits")]
    InvalidLengthHeader(Vec<u8>),
    #[error("pkt-line announces a total length of {0} bytes, longer than the 65520 byte limit")]
    PacketTooLong(usize),
    #[error("pkt-line announced a payload of {0} bytes but the connection closed early")]
    TruncatedPacket(usize),
    #[error("sideband payload was empty, expected a leading channel byte")]
    EmptySidebandPayload,
    #[error("unknown sideband channel {0}")]
    UnknownSidebandChannel(u8),
    #[error("remote reported an error: {0}")]
    Remote(String),
    #[error("server advertised no references and no capabilities")]
    EmptyAdvertisement,
    #[error("malformed ref advertisement line: {0}")]
    InvalidRefLine(String),
    #[error("malformed ack/nak line: {0}")]
    InvalidAck(String),
    #[error("remote rejected ref update for {name}: {reason}")]
    RefUpdateRejected { name: String, reason: String },
    #[error(transparent)]
    PackImport(#[from] git_pack::import::Error),
    #[error(transparent)]
    Ref(#[from] git_ref::Error),
}
