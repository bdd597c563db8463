//! # Sockline: blocking RFC 6455 WebSocket endpoint
//!
//! A WebSocket protocol endpoint over a caller-provided byte stream: the
//! opening HTTP handshake, the frame codec, message reassembly across
//! fragments, in-band control-frame handling, client-side masking, and
//! streaming UTF-8 validation of text messages. The endpoint speaks either
//! role (initiator or acceptor) and all I/O blocks the calling thread.
//!
//! What stays outside: the socket itself (anything implementing
//! [`Transport`] will do), TLS, listeners and accept loops, extension
//! negotiation, subprotocols, and automatic completion of the CLOSE
//! handshake; callers send their own CLOSE frame and then call
//! [`Endpoint::close`].
//!
//! ## Example
//!
//! ```no_run
//! use std::net::TcpStream;
//! use sockline::{Endpoint, MessageKind};
//!
//! # fn main() -> sockline::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:9001")?;
//! let mut ws = Endpoint::connect(stream, "127.0.0.1:9001", "/")?;
//! ws.send_text("hello")?;
//! let reply = ws.read_message()?;
//! println!("{:?}", reply.as_text());
//! ws.send_close()?;
//! ws.close()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod protocol;
pub mod transport;
pub mod utf8;

mod endpoint;

pub use endpoint::{Endpoint, Reader, Writer};
pub use error::{Error, Result};
pub use frame::{FrameHeader, Opcode};
pub use protocol::{Message, MessageKind, Role};
pub use transport::Transport;

/// WebSocket GUID for handshake
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Maximum WebSocket frame header size (2 + 8 + 4 = 14 bytes)
pub const MAX_FRAME_HEADER_SIZE: usize = 14;

/// Largest payload length expressible in the 7-bit length field
pub const SMALL_PAYLOAD_THRESHOLD: usize = 125;

/// Largest payload length expressible in the 16-bit length field
pub const MEDIUM_PAYLOAD_THRESHOLD: usize = 65535;

/// Payload bytes per frame emitted by `send_message`, and the unit in which
/// payloads are streamed through the codec
pub const CHUNK_SIZE: usize = 1024;

/// Peek window for the peer's HTTP header block during the handshake
pub const MAX_HANDSHAKE_SIZE: usize = 1024;

/// Bytes discarded at most while draining the read side in `close`
pub const CLOSE_DRAIN_LIMIT: usize = 64 * 1024;
