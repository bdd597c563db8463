//! The byte-stream boundary the endpoint speaks over
//!
//! The protocol core never touches sockets directly; everything goes through
//! the [`Transport`] trait. Any bidirectional blocking byte stream with a
//! peek primitive can carry a WebSocket endpoint. Implementations are
//! provided for `TcpStream` and `&TcpStream` (the latter lets a split
//! endpoint read and write from two threads over one socket).

use std::io;
use std::net::{Shutdown, TcpStream};

/// A blocking bidirectional byte stream
///
/// `read`/`write` have the usual short-count semantics; [`read_exact`] and
/// [`write_all`] provide the retry loops the codec is built on. `peek` must
/// return buffered inbound bytes without consuming them; the handshake uses
/// it to examine the peer's HTTP header block before deciding how much of
/// the stream belongs to HTTP and how much to the first frames.
///
/// [`read_exact`]: Transport::read_exact
/// [`write_all`]: Transport::write_all
pub trait Transport {
    /// Read up to `buf.len()` bytes, returning the count read (0 = EOF)
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes, returning the count written
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes without consuming them
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Half-close the write direction, signalling EOF to the peer
    fn shutdown_write(&mut self) -> io::Result<()>;

    /// Tear the stream down completely
    fn close(&mut self) -> io::Result<()>;

    /// Read until `buf` is full, retrying short reads
    ///
    /// EOF before the buffer fills is reported as `UnexpectedEof`.
    fn read_exact(&mut self, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read(buf)? {
                0 => return Err(io::ErrorKind::UnexpectedEof.into()),
                n => {
                    let rest = buf;
                    buf = &mut rest[n..];
                }
            }
        }
        Ok(())
    }

    /// Write all of `buf`, retrying short writes
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

impl Transport for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(self, buf)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::peek(self, buf)
    }

    fn shutdown_write(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

impl Transport for &TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(self, buf)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::peek(self, buf)
    }

    fn shutdown_write(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Transport;
    use std::io;

    /// In-memory transport scripted with the peer's inbound bytes
    ///
    /// Outbound bytes accumulate in `written` for assertions. `read_limit`
    /// caps every read to simulate short reads from the kernel.
    pub(crate) struct ScriptedTransport {
        input: Vec<u8>,
        pos: usize,
        pub(crate) written: Vec<u8>,
        pub(crate) read_limit: Option<usize>,
        pub(crate) write_shut: bool,
        pub(crate) closed: bool,
    }

    impl ScriptedTransport {
        pub(crate) fn new(input: impl Into<Vec<u8>>) -> Self {
            Self {
                input: input.into(),
                pos: 0,
                written: Vec::new(),
                read_limit: None,
                write_shut: false,
                closed: false,
            }
        }

        pub(crate) fn remaining_input(&self) -> &[u8] {
            &self.input[self.pos..]
        }
    }

    impl Transport for ScriptedTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut n = buf.len().min(self.input.len() - self.pos);
            if let Some(limit) = self.read_limit {
                n = n.min(limit);
            }
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.input.len() - self.pos);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            Ok(n)
        }

        fn shutdown_write(&mut self) -> io::Result<()> {
            self.write_shut = true;
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn test_read_exact_retries_short_reads() {
        let mut t = ScriptedTransport::new(b"abcdefgh".to_vec());
        t.read_limit = Some(3);

        let mut buf = [0u8; 8];
        t.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcdefgh");
    }

    #[test]
    fn test_read_exact_eof() {
        let mut t = ScriptedTransport::new(b"abc".to_vec());

        let mut buf = [0u8; 8];
        let err = t.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut t = ScriptedTransport::new(b"hello".to_vec());

        let mut buf = [0u8; 5];
        assert_eq!(t.peek(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");

        let mut buf = [0u8; 5];
        t.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_write_all() {
        let mut t = ScriptedTransport::new(Vec::new());
        t.write_all(b"payload").unwrap();
        assert_eq!(t.written, b"payload");
    }
}
