//! Roles and messages

use bytes::Bytes;

use crate::frame::Opcode;

/// WebSocket endpoint role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Connection initiator: masks outgoing frames, expects unmasked input
    Client,
    /// Connection acceptor: sends unmasked frames, expects masked input
    Server,
}

impl Role {
    #[inline]
    pub(crate) fn masks_outgoing(self) -> bool {
        self == Role::Client
    }

    #[inline]
    pub(crate) fn expects_masked_input(self) -> bool {
        self == Role::Server
    }
}

/// The two kinds of data message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// UTF-8 text
    Text,
    /// Raw bytes
    Binary,
}

impl MessageKind {
    /// Opcode of the leading frame of a message of this kind
    #[inline]
    pub(crate) fn opcode(self) -> Opcode {
        match self {
            MessageKind::Text => Opcode::Text,
            MessageKind::Binary => Opcode::Binary,
        }
    }
}

/// A complete message, reassembled from one or more frames
///
/// Text payloads have been validated as UTF-8 during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Text message
    Text(Bytes),
    /// Binary message
    Binary(Bytes),
}

impl Message {
    /// The message kind
    #[inline]
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Text(_) => MessageKind::Text,
            Message::Binary(_) => MessageKind::Binary,
        }
    }

    /// The raw payload bytes
    #[inline]
    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Text(payload) | Message::Binary(payload) => payload,
        }
    }

    /// Consume the message, keeping the payload
    #[inline]
    pub fn into_payload(self) -> Bytes {
        match self {
            Message::Text(payload) | Message::Binary(payload) => payload,
        }
    }

    /// View a text payload as `&str`; `None` for binary messages
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(payload) => std::str::from_utf8(payload).ok(),
            Message::Binary(_) => None,
        }
    }
}
