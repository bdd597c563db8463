//! Error types for the WebSocket endpoint

use std::io;

use thiserror::Error;

use crate::frame::Opcode;

/// Result type alias for WebSocket operations
pub type Result<T> = std::result::Result<T, Error>;

/// WebSocket error types
///
/// One variant per failure the protocol can surface: the handshake errors for
/// each role, the frame-level protocol violations, the two UTF-8 failure
/// modes of text messages, and transport errors passed through verbatim.
#[derive(Debug, Error)]
pub enum Error {
    /// The initiator could not parse the peer's HTTP response
    #[error("malformed handshake response")]
    BadHandshakeResponse,
    /// The handshake response carries no `Sec-WebSocket-Accept` header
    #[error("handshake response carries no Sec-WebSocket-Accept")]
    MissingAccept,
    /// The handshake response repeats the `Sec-WebSocket-Accept` header
    #[error("handshake response repeats Sec-WebSocket-Accept")]
    DuplicateAccept,
    /// The accept value does not match the one derived from our key
    #[error("handshake response Sec-WebSocket-Accept does not match the key")]
    BadAccept,

    /// The acceptor could not parse the peer's HTTP request
    #[error("malformed handshake request")]
    BadHandshakeRequest,
    /// The handshake request carries no `Sec-WebSocket-Key` header
    #[error("handshake request carries no Sec-WebSocket-Key")]
    MissingKey,
    /// The handshake request repeats the `Sec-WebSocket-Key` header
    #[error("handshake request repeats Sec-WebSocket-Key")]
    DuplicateKey,

    /// The peer sent a CLOSE frame; the current read is aborted
    #[error("close frame received")]
    CloseFrameReceived,
    /// A control frame exceeds 125 payload bytes or is fragmented
    #[error("control frame exceeds 125 bytes or is fragmented")]
    ControlFrameTooBig,
    /// RSV1/RSV2/RSV3 set although no extension was negotiated
    #[error("reserved bits set without a negotiated extension")]
    ReservedBitsNotNegotiated,
    /// An opcode that is not valid at this point of the message stream
    #[error("unexpected opcode {0}")]
    UnexpectedOpcode(Opcode),
    /// The frame's MASK bit contradicts the peer's role
    #[error("frame mask bit does not match the peer role")]
    BadMaskBit,
    /// Extended payload length is non-minimal or has the top bit set
    #[error("bad extended payload length")]
    BadPayloadLength,

    /// A text message ended in the middle of a multi-byte codepoint
    #[error("truncated UTF-8 sequence at message end")]
    ShortUtf8,
    /// A text message contains malformed UTF-8
    #[error("invalid UTF-8 in text message")]
    InvalidUtf8,

    /// I/O error from the underlying transport
    #[error(transparent)]
    Io(#[from] io::Error),
}
