//! WebSocket opening handshake
//!
//! One-shot HTTP/1.1 upgrade exchange. Either side peeks the peer's header
//! block, parses it, and only then consumes exactly the bytes the parser
//! examined, so any frame data the peer pipelined behind the HTTP block
//! stays in the transport for the frame layer. Header names are matched
//! case-insensitively per RFC 7230.
//!
//! The initiator sends the RFC 6455 sample nonce as its key and requires the
//! matching accept value. A per-connection random key would defend against
//! cache poisoning by broken intermediaries; with the nonce fixed, the
//! accept check only proves the peer actually speaks WebSocket.

use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::{MAX_HANDSHAKE_SIZE, WS_GUID};

/// The `Sec-WebSocket-Key` every initiator sends (the RFC 6455 sample nonce)
pub const HANDSHAKE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

const MAX_HEADERS: usize = 32;

/// Derive the `Sec-WebSocket-Accept` value for a key
///
/// This computes Base64(SHA-1(key + GUID)).
#[inline]
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Extract `Sec-WebSocket-Key` from an upgrade request
///
/// Returns the key and the length of the HTTP block (the bytes to consume
/// from the transport).
fn parse_request(buf: &[u8]) -> Result<(String, usize)> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        // A request that does not fit the peek window is treated as malformed
        Ok(httparse::Status::Partial) | Err(_) => return Err(Error::BadHandshakeRequest),
    };

    let mut key = None;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("Sec-WebSocket-Key") {
            if key.is_some() {
                return Err(Error::DuplicateKey);
            }
            let value = std::str::from_utf8(header.value)
                .map_err(|_| Error::BadHandshakeRequest)?;
            key = Some(value.trim().to_owned());
        }
    }
    Ok((key.ok_or(Error::MissingKey)?, len))
}

/// Extract `Sec-WebSocket-Accept` from an upgrade response
fn parse_response(buf: &[u8]) -> Result<(String, usize)> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut res = httparse::Response::new(&mut headers);
    let len = match res.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) | Err(_) => return Err(Error::BadHandshakeResponse),
    };

    if res.code != Some(101) {
        return Err(Error::BadHandshakeResponse);
    }

    let mut accept = None;
    for header in res.headers.iter() {
        if header.name.eq_ignore_ascii_case("Sec-WebSocket-Accept") {
            if accept.is_some() {
                return Err(Error::DuplicateAccept);
            }
            let value = std::str::from_utf8(header.value)
                .map_err(|_| Error::BadHandshakeResponse)?;
            accept = Some(value.trim().to_owned());
        }
    }
    Ok((accept.ok_or(Error::MissingAccept)?, len))
}

/// Build the 101 Switching Protocols response
fn build_response(accept: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(256);
    buf.put_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
    buf.put_slice(b"Upgrade: websocket\r\n");
    buf.put_slice(b"Connection: Upgrade\r\n");
    buf.put_slice(b"Sec-WebSocket-Accept: ");
    buf.put_slice(accept.as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Build the upgrade request for `resource` on `host`
fn build_request(host: &str, resource: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(512);
    buf.put_slice(b"GET ");
    buf.put_slice(resource.as_bytes());
    buf.put_slice(b" HTTP/1.1\r\n");
    buf.put_slice(b"Host: ");
    buf.put_slice(host.as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(b"Upgrade: websocket\r\n");
    buf.put_slice(b"Connection: Upgrade\r\n");
    buf.put_slice(b"Sec-WebSocket-Key: ");
    buf.put_slice(HANDSHAKE_KEY.as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(b"Sec-WebSocket-Version: 13\r\n");
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Run the acceptor side of the handshake
pub(crate) fn server_handshake<T: Transport>(transport: &mut T) -> Result<()> {
    let mut buf = [0u8; MAX_HANDSHAKE_SIZE];
    let peeked = transport.peek(&mut buf)?;
    let (key, consumed) = parse_request(&buf[..peeked])?;
    transport.read_exact(&mut buf[..consumed])?;

    let response = build_response(&accept_key(&key));
    transport.write_all(&response)?;
    Ok(())
}

/// Run the initiator side of the handshake
pub(crate) fn client_handshake<T: Transport>(
    transport: &mut T,
    host: &str,
    resource: &str,
) -> Result<()> {
    let request = build_request(host, resource);
    transport.write_all(&request)?;

    let mut buf = [0u8; MAX_HANDSHAKE_SIZE];
    let peeked = transport.peek(&mut buf)?;
    let (accept, consumed) = parse_response(&buf[..peeked])?;
    transport.read_exact(&mut buf[..consumed])?;

    if accept != accept_key(HANDSHAKE_KEY) {
        return Err(Error::BadAccept);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;

    const REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
        Host: server.example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\
        \r\n";

    const RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
        \r\n";

    #[test]
    fn test_accept_key_rfc_vector() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_parse_request() {
        let (key, len) = parse_request(REQUEST).unwrap();
        assert_eq!(key, "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(len, REQUEST.len());
    }

    #[test]
    fn test_parse_request_header_names_case_insensitive() {
        let request = b"GET / HTTP/1.1\r\n\
            Host: x\r\n\
            SEC-WEBSOCKET-KEY: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            \r\n";
        let (key, _) = parse_request(request).unwrap();
        assert_eq!(key, "dGhlIHNhbXBsZSBub25jZQ==");
    }

    #[test]
    fn test_parse_request_missing_key() {
        let request = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::MissingKey)));
    }

    #[test]
    fn test_parse_request_duplicate_key() {
        let request = b"GET / HTTP/1.1\r\n\
            Sec-WebSocket-Key: a2V5MQ==\r\n\
            Sec-WebSocket-Key: a2V5Mg==\r\n\
            \r\n";
        assert!(matches!(parse_request(request), Err(Error::DuplicateKey)));
    }

    #[test]
    fn test_parse_request_truncated() {
        assert!(matches!(
            parse_request(&REQUEST[..REQUEST.len() - 4]),
            Err(Error::BadHandshakeRequest)
        ));
    }

    #[test]
    fn test_parse_response() {
        let (accept, len) = parse_response(RESPONSE).unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert_eq!(len, RESPONSE.len());
    }

    #[test]
    fn test_parse_response_rejects_non_101() {
        let response = b"HTTP/1.1 400 Bad Request\r\n\r\n";
        assert!(matches!(
            parse_response(response),
            Err(Error::BadHandshakeResponse)
        ));
    }

    #[test]
    fn test_parse_response_missing_accept() {
        let response = b"HTTP/1.1 101 Switching Protocols\r\n\r\n";
        assert!(matches!(parse_response(response), Err(Error::MissingAccept)));
    }

    #[test]
    fn test_parse_response_duplicate_accept() {
        let response = b"HTTP/1.1 101 Switching Protocols\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            \r\n";
        assert!(matches!(
            parse_response(response),
            Err(Error::DuplicateAccept)
        ));
    }

    #[test]
    fn test_server_handshake_responds_and_consumes_exactly() {
        // A frame the peer pipelined right behind its HTTP block
        let mut input = REQUEST.to_vec();
        input.extend_from_slice(&[0x81, 0x80, 0, 0, 0, 0]);
        let mut t = ScriptedTransport::new(input);

        server_handshake(&mut t).unwrap();

        let written = String::from_utf8(t.written.clone()).unwrap();
        assert!(written.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(written.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(written.ends_with("\r\n\r\n"));
        // The pipelined frame is still in the stream
        assert_eq!(t.remaining_input(), &[0x81, 0x80, 0, 0, 0, 0]);
    }

    #[test]
    fn test_client_handshake_round_trip() {
        let mut t = ScriptedTransport::new(RESPONSE.to_vec());
        client_handshake(&mut t, "server.example.com", "/chat").unwrap();

        let written = String::from_utf8(t.written.clone()).unwrap();
        assert!(written.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(written.contains("Host: server.example.com\r\n"));
        assert!(written.contains("Upgrade: websocket\r\n"));
        assert!(written.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
        assert!(written.contains("Sec-WebSocket-Version: 13\r\n"));
    }

    #[test]
    fn test_client_handshake_bad_accept() {
        let response = b"HTTP/1.1 101 Switching Protocols\r\n\
            Sec-WebSocket-Accept: bm90IHRoZSByaWdodCBvbmU=\r\n\
            \r\n";
        let mut t = ScriptedTransport::new(response.to_vec());
        assert!(matches!(
            client_handshake(&mut t, "x", "/"),
            Err(Error::BadAccept)
        ));
    }
}
