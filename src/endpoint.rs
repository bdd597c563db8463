//! The WebSocket endpoint facade
//!
//! An [`Endpoint`] owns a [`Transport`] for the lifetime of the connection
//! and speaks one role over it. Construction runs the opening handshake;
//! [`read_message`] drives the frame reader and reassembles fragmented
//! messages while answering PINGs in-band; the `send_*` family fragments and
//! masks outgoing payloads. Everything blocks the calling thread.
//!
//! Closing is a three-step sequence: half-close the write direction, drain
//! whatever the peer still has in flight (so the OS does not answer the
//! close with an RST while input is pending), then tear the socket down.
//! `close` does not emit a CLOSE frame by itself; callers that want the
//! frame-level goodbye send [`send_close`] first.
//!
//! [`read_message`]: Endpoint::read_message
//! [`send_close`]: Endpoint::send_close

use std::cmp;

use bytes::BytesMut;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::error::{Error, Result};
use crate::frame::{self, FrameHeader, Opcode};
use crate::handshake;
use crate::mask::{apply_mask_offset, generate_mask};
use crate::protocol::{Message, MessageKind, Role};
use crate::transport::Transport;
use crate::utf8::{self, DecodeError};
use crate::{CHUNK_SIZE, CLOSE_DRAIN_LIMIT};

/// A WebSocket protocol endpoint over a blocking byte stream
pub struct Endpoint<T: Transport> {
    transport: T,
    role: Role,
    debug: bool,
    mask_rng: Box<dyn RngCore + Send>,
    scratch: Vec<u8>,
}

impl<T: Transport> Endpoint<T> {
    /// Accept an incoming connection: run the server handshake and return a
    /// server-role endpoint
    pub fn accept(mut transport: T) -> Result<Self> {
        handshake::server_handshake(&mut transport)?;
        Ok(Self::new(transport, Role::Server))
    }

    /// Initiate a connection: run the client handshake for `resource` on
    /// `host` and return a client-role endpoint
    pub fn connect(mut transport: T, host: &str, resource: &str) -> Result<Self> {
        handshake::client_handshake(&mut transport, host, resource)?;
        Ok(Self::new(transport, Role::Client))
    }

    fn new(transport: T, role: Role) -> Self {
        Self {
            transport,
            role,
            debug: false,
            mask_rng: Box::new(OsRng),
            scratch: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    /// The endpoint's role
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether per-frame traces are emitted
    #[inline]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Enable or disable per-frame DEBUG traces
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    /// Replace the masking-key RNG
    ///
    /// The default is the platform CSPRNG; tests swap in a deterministic one
    /// to pin down the wire bytes.
    pub fn set_mask_rng(&mut self, rng: impl RngCore + Send + 'static) {
        self.mask_rng = Box::new(rng);
    }

    /// Consume the endpoint, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write a single frame
    ///
    /// Client-role endpoints draw a fresh masking key per frame and mask the
    /// payload on the way out; server-role endpoints send it verbatim.
    pub fn send_frame(&mut self, fin: bool, opcode: Opcode, payload: &[u8]) -> Result<()> {
        if self.debug {
            debug!(fin, opcode = %opcode, len = payload.len(), "tx frame");
        }
        let mask = if self.role.masks_outgoing() {
            Some(generate_mask(self.mask_rng.as_mut()))
        } else {
            None
        };
        frame::write_frame(&mut self.transport, fin, opcode, payload, mask, &mut self.scratch)
    }

    /// Send a complete message, fragmenting into frames of at most
    /// [`CHUNK_SIZE`] payload bytes
    ///
    /// The leading frame carries the kind's opcode, the rest CONT; only the
    /// last has FIN set. An empty payload goes out as one empty FIN frame.
    pub fn send_message(&mut self, kind: MessageKind, mut payload: &[u8]) -> Result<()> {
        let mut opcode = kind.opcode();
        loop {
            let (chunk, rest) = payload.split_at(cmp::min(payload.len(), CHUNK_SIZE));
            self.send_frame(rest.is_empty(), opcode, chunk)?;
            if rest.is_empty() {
                return Ok(());
            }
            payload = rest;
            opcode = Opcode::Continuation;
        }
    }

    /// Send a text message
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_message(MessageKind::Text, text.as_bytes())
    }

    /// Send a binary message
    pub fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.send_message(MessageKind::Binary, data)
    }

    /// Send a PING frame
    pub fn send_ping(&mut self, payload: &[u8]) -> Result<()> {
        self.send_frame(true, Opcode::Ping, payload)
    }

    /// Send a PONG frame
    pub fn send_pong(&mut self, payload: &[u8]) -> Result<()> {
        self.send_frame(true, Opcode::Pong, payload)
    }

    /// Send an empty CLOSE frame
    pub fn send_close(&mut self) -> Result<()> {
        self.send_frame(true, Opcode::Close, &[])
    }

    /// Block until one complete message has been assembled
    ///
    /// Control frames interleaved between the message's fragments are
    /// handled in-band: PINGs are answered with an echoing PONG, PONGs are
    /// discarded, and a CLOSE aborts the read with
    /// [`Error::CloseFrameReceived`]. Text payloads are UTF-8 validated as
    /// they stream in; a codepoint split across fragments is tolerated until
    /// the final fragment settles it.
    pub fn read_message(&mut self) -> Result<Message> {
        let mut payload = BytesMut::new();
        let mut kind: Option<MessageKind> = None;
        let mut verify_pos = 0;

        loop {
            let header = self.read_frame_header()?;

            if header.opcode.is_control() {
                match header.opcode {
                    Opcode::Close => return Err(Error::CloseFrameReceived),
                    Opcode::Ping => {
                        let body = self.read_control_payload(&header)?;
                        self.send_frame(true, Opcode::Pong, &body)?;
                    }
                    Opcode::Pong => {
                        // Unsolicited PONGs carry no obligation
                        self.read_control_payload(&header)?;
                    }
                    other => return Err(Error::UnexpectedOpcode(other)),
                }
                continue;
            }

            match (kind, header.opcode) {
                (None, Opcode::Text) => kind = Some(MessageKind::Text),
                (None, Opcode::Binary) => kind = Some(MessageKind::Binary),
                (Some(_), Opcode::Continuation) => {}
                (_, other) => return Err(Error::UnexpectedOpcode(other)),
            }
            let text = kind == Some(MessageKind::Text);

            let mut remaining = header.payload_len;
            let mut frame_pos = 0;
            while remaining > 0 {
                let n = cmp::min(remaining, CHUNK_SIZE as u64) as usize;
                let start = payload.len();
                payload.resize(start + n, 0);
                self.transport.read_exact(&mut payload[start..])?;
                if let Some(mask) = header.mask {
                    apply_mask_offset(&mut payload[start..], mask, frame_pos);
                }
                frame_pos += n;
                remaining -= n as u64;

                if text {
                    // A truncated codepoint is only fatal once no more
                    // payload can follow it
                    advance_utf8(&payload, &mut verify_pos, header.fin && remaining == 0)?;
                }
            }
            if text && header.fin && header.payload_len == 0 {
                // Empty final fragment: settle any carried-over truncation
                advance_utf8(&payload, &mut verify_pos, true)?;
            }

            if header.fin {
                break;
            }
        }

        let payload = payload.freeze();
        match kind {
            Some(MessageKind::Text) => Ok(Message::Text(payload)),
            Some(MessageKind::Binary) => Ok(Message::Binary(payload)),
            None => unreachable!("the loop only ends after a data frame fixed the kind"),
        }
    }

    /// Split into typed read and write halves
    ///
    /// Each half carries its own handle to the transport, so this requires a
    /// clonable transport such as `&TcpStream`. Whether the two halves may
    /// actually run concurrently is the transport's promise to keep; the
    /// protocol state itself is already disjoint between the paths.
    pub fn split(self) -> (Reader<T>, Writer<T>)
    where
        T: Clone,
    {
        let reader = Endpoint {
            transport: self.transport.clone(),
            role: self.role,
            debug: self.debug,
            mask_rng: Box::new(OsRng),
            scratch: Vec::new(),
        };
        (Reader { inner: reader }, Writer { inner: self })
    }

    /// Shut the connection down
    ///
    /// Half-closes the write direction, drains the read side until the peer
    /// closes (or [`CLOSE_DRAIN_LIMIT`] bytes have been discarded), then
    /// closes the transport. The socket is closed even when the drain
    /// errors; the drain error is still reported.
    pub fn close(mut self) -> Result<()> {
        self.transport.shutdown_write()?;

        let mut buf = [0u8; CHUNK_SIZE];
        let mut drained = 0;
        let drain_result = loop {
            if drained >= CLOSE_DRAIN_LIMIT {
                break Ok(());
            }
            match self.transport.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(n) => drained += n,
                Err(err) => break Err(err),
            }
        };

        self.transport.close()?;
        drain_result.map_err(Error::from)
    }

    fn read_frame_header(&mut self) -> Result<FrameHeader> {
        let header = frame::read_header(&mut self.transport, self.role.expects_masked_input())?;
        if self.debug {
            debug!(
                fin = header.fin,
                opcode = %header.opcode,
                rsv1 = header.rsv1,
                rsv2 = header.rsv2,
                rsv3 = header.rsv3,
                len = header.payload_len,
                "rx frame"
            );
        }
        Ok(header)
    }

    /// Read a control frame's payload in one piece (at most 125 bytes,
    /// enforced by header validation)
    fn read_control_payload(&mut self, header: &FrameHeader) -> Result<Vec<u8>> {
        let mut body = vec![0u8; header.payload_len as usize];
        self.transport.read_exact(&mut body)?;
        if let Some(mask) = header.mask {
            apply_mask_offset(&mut body, mask, 0);
        }
        Ok(body)
    }
}

/// Advance the UTF-8 cursor over the newly appended payload bytes
fn advance_utf8(payload: &[u8], verify_pos: &mut usize, at_message_end: bool) -> Result<()> {
    while *verify_pos < payload.len() {
        match utf8::decode_codepoint(&payload[*verify_pos..]) {
            Ok((_, consumed)) => *verify_pos += consumed,
            Err(DecodeError::Short) if !at_message_end => break,
            Err(DecodeError::Short) => return Err(Error::ShortUtf8),
            Err(DecodeError::Invalid) => return Err(Error::InvalidUtf8),
        }
    }
    Ok(())
}

/// The read half of a split endpoint
pub struct Reader<T: Transport> {
    inner: Endpoint<T>,
}

impl<T: Transport> Reader<T> {
    /// See [`Endpoint::read_message`]
    pub fn read_message(&mut self) -> Result<Message> {
        self.inner.read_message()
    }

    /// See [`Endpoint::set_debug`]
    pub fn set_debug(&mut self, enabled: bool) {
        self.inner.set_debug(enabled);
    }
}

/// The write half of a split endpoint
pub struct Writer<T: Transport> {
    inner: Endpoint<T>,
}

impl<T: Transport> Writer<T> {
    /// See [`Endpoint::send_frame`]
    pub fn send_frame(&mut self, fin: bool, opcode: Opcode, payload: &[u8]) -> Result<()> {
        self.inner.send_frame(fin, opcode, payload)
    }

    /// See [`Endpoint::send_message`]
    pub fn send_message(&mut self, kind: MessageKind, payload: &[u8]) -> Result<()> {
        self.inner.send_message(kind, payload)
    }

    /// See [`Endpoint::send_text`]
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.inner.send_text(text)
    }

    /// See [`Endpoint::send_binary`]
    pub fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.inner.send_binary(data)
    }

    /// See [`Endpoint::send_ping`]
    pub fn send_ping(&mut self, payload: &[u8]) -> Result<()> {
        self.inner.send_ping(payload)
    }

    /// See [`Endpoint::send_pong`]
    pub fn send_pong(&mut self, payload: &[u8]) -> Result<()> {
        self.inner.send_pong(payload)
    }

    /// See [`Endpoint::send_close`]
    pub fn send_close(&mut self) -> Result<()> {
        self.inner.send_close()
    }

    /// See [`Endpoint::close`]
    pub fn close(self) -> Result<()> {
        self.inner.close()
    }

    /// See [`Endpoint::set_debug`]
    pub fn set_debug(&mut self, enabled: bool) {
        self.inner.set_debug(enabled);
    }
}
