//! Packet codec for the operation-framed protocol.
//!
//! Every packet starts with a 16-byte big-endian header followed by the body:
//!
//! | field      | size | meaning                               |
//! |------------|------|---------------------------------------|
//! | packet len | u32  | header plus body                      |
//! | header len | u16  | always [`HEADER_LEN`] when encoding   |
//! | version    | u16  | body encoding, see `VERSION_*`        |
//! | operation  | u32  | operation code, see [`op`]            |
//! | sequence   | u32  | [`DEFAULT_SEQUENCE`] unless overridden |
//!
//! One transport frame may carry several packets back to back. A packet with
//! [`VERSION_ZLIB`] carries a zlib-deflated body that itself holds further
//! uncompressed packets; [`unpack`] flattens them in order.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

mod error;

pub use error::ProtoError;

/// Length of the packet header in bytes.
pub const HEADER_LEN: usize = 16;
const HEADER_LEN_FIELD: u16 = 16;

/// Sequence number stamped on client-originated packets.
pub const DEFAULT_SEQUENCE: u32 = 1;

/// Upper bound on the inflated size of one compressed body (16 MiB).
pub const MAX_INFLATED_LEN: usize = 16 * 1024 * 1024;

/// Plain body.
pub const VERSION_NORMAL: u16 = 0;
/// Zlib-deflated body containing further packets.
pub const VERSION_ZLIB: u16 = 2;
/// Brotli-compressed body.
///
/// Not decoded: [`unpack`] fails with [`ProtoError::UnsupportedVersion`] and
/// the client drops the whole frame, packets before and after included.
/// Servers that let the client pick the body encoding must be asked for zlib.
pub const VERSION_BROTLI: u16 = 3;

/// Well-known operation codes.
pub mod op {
    /// Client heartbeat.
    pub const HEARTBEAT: u32 = 2;
    /// Server reply to a heartbeat.
    pub const HEARTBEAT_REPLY: u32 = 3;
    /// Server-pushed application message.
    pub const SEND_MSG_REPLY: u32 = 5;
    /// Client authentication request.
    pub const AUTH: u32 = 7;
    /// Server reply to an authentication request.
    pub const AUTH_REPLY: u32 = 8;
}

/// One application message: an operation code and an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    version: u16,
    operation: u32,
    sequence: u32,
    payload: Bytes,
}

impl Message {
    /// Build an uncompressed message.
    ///
    /// # Examples
    ///
    /// ```
    /// use opframe::proto::{DEFAULT_SEQUENCE, Message, op};
    ///
    /// let message = Message::new(DEFAULT_SEQUENCE, op::AUTH, &b"{}"[..]);
    /// assert_eq!(message.operation(), op::AUTH);
    /// assert_eq!(message.payload().as_ref(), b"{}");
    /// ```
    #[must_use]
    pub fn new(sequence: u32, operation: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            version: VERSION_NORMAL,
            operation,
            sequence,
            payload: payload.into(),
        }
    }

    /// The zero-payload heartbeat sent on every heartbeat tick.
    #[must_use]
    pub fn heartbeat() -> Self { Self::new(DEFAULT_SEQUENCE, op::HEARTBEAT, Bytes::new()) }

    /// An authentication request carrying `payload`.
    #[must_use]
    pub fn auth(payload: impl Into<Bytes>) -> Self {
        Self::new(DEFAULT_SEQUENCE, op::AUTH, payload)
    }

    /// Pack `messages` into a single zlib-compressed message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::NestedCompression`] if any input is itself
    /// compressed, or [`ProtoError::Deflate`] if compression fails.
    pub fn compressed(messages: &[Message]) -> Result<Self, ProtoError> {
        let mut body = BytesMut::new();
        for message in messages {
            if message.version == VERSION_ZLIB {
                return Err(ProtoError::NestedCompression);
            }
            message.write_to(&mut body)?;
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).map_err(ProtoError::Deflate)?;
        let payload = encoder.finish().map_err(ProtoError::Deflate)?;
        Ok(Self {
            version: VERSION_ZLIB,
            operation: op::SEND_MSG_REPLY,
            sequence: 0,
            payload: Bytes::from(payload),
        })
    }

    /// Operation code selecting the handler for this message.
    #[must_use]
    pub fn operation(&self) -> u32 { self.operation }

    /// Sequence number from the packet header.
    #[must_use]
    pub fn sequence(&self) -> u32 { self.sequence }

    /// Body encoding version from the packet header.
    #[must_use]
    pub fn version(&self) -> u16 { self.version }

    /// Raw message body.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the message, returning its body.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Number of bytes [`to_bytes`](Self::to_bytes) produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize { HEADER_LEN + self.payload.len() }

    /// Encode the message as one packet.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::PayloadTooLarge`] if the packet length does not
    /// fit the 32-bit length field.
    pub fn to_bytes(&self) -> Result<Bytes, ProtoError> {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut dst)?;
        Ok(dst.freeze())
    }

    fn write_to(&self, dst: &mut BytesMut) -> Result<(), ProtoError> {
        let packet_len = u32::try_from(self.encoded_len())
            .map_err(|_| ProtoError::PayloadTooLarge(self.payload.len()))?;
        dst.reserve(self.encoded_len());
        dst.put_u32(packet_len);
        dst.put_u16(HEADER_LEN_FIELD);
        dst.put_u16(self.version);
        dst.put_u32(self.operation);
        dst.put_u32(self.sequence);
        dst.extend_from_slice(&self.payload);
        Ok(())
    }
}

/// Decode every message carried by one transport frame.
///
/// Packets are returned in wire order; compressed packets are replaced by the
/// packets inside them.
///
/// # Errors
///
/// Returns a [`ProtoError`] if any packet is truncated, declares inconsistent
/// lengths, uses an unsupported version, or fails to inflate. No messages are
/// returned for a frame that fails to decode.
///
/// # Examples
///
/// ```
/// use opframe::proto::{Message, op, unpack};
///
/// let message = Message::new(1, op::SEND_MSG_REPLY, &b"hello"[..]);
/// let decoded = unpack(message.to_bytes().expect("encode")).expect("decode");
/// assert_eq!(decoded, vec![message]);
/// ```
pub fn unpack(buf: Bytes) -> Result<Vec<Message>, ProtoError> {
    let mut out = Vec::new();
    unpack_into(buf, false, &mut out)?;
    Ok(out)
}

fn unpack_into(mut buf: Bytes, nested: bool, out: &mut Vec<Message>) -> Result<(), ProtoError> {
    while !buf.is_empty() {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::Truncated {
                needed: HEADER_LEN,
                available: buf.len(),
            });
        }
        let mut header = &buf[..HEADER_LEN];
        let packet_len = header.get_u32();
        let header_len = header.get_u16();
        let version = header.get_u16();
        let operation = header.get_u32();
        let sequence = header.get_u32();

        let invalid = ProtoError::InvalidHeader {
            packet_len,
            header_len,
        };
        let head = usize::from(header_len);
        let Ok(total) = usize::try_from(packet_len) else {
            return Err(invalid);
        };
        if head < HEADER_LEN || total < head {
            return Err(invalid);
        }
        if total > buf.len() {
            return Err(ProtoError::Truncated {
                needed: total,
                available: buf.len(),
            });
        }

        let mut packet = buf.split_to(total);
        let body = packet.split_off(head);
        match version {
            VERSION_ZLIB if nested => return Err(ProtoError::NestedCompression),
            VERSION_ZLIB => unpack_into(inflate(&body)?, true, out)?,
            VERSION_BROTLI => return Err(ProtoError::UnsupportedVersion(version)),
            _ => out.push(Message {
                version,
                operation,
                sequence,
                payload: body,
            }),
        }
    }
    Ok(())
}

fn inflate(body: &[u8]) -> Result<Bytes, ProtoError> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(body)
        .take(MAX_INFLATED_LEN as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(ProtoError::Inflate)?;
    if inflated.len() > MAX_INFLATED_LEN {
        return Err(ProtoError::Inflate(io::Error::new(
            io::ErrorKind::InvalidData,
            "inflated body exceeds limit",
        )));
    }
    Ok(Bytes::from(inflated))
}

#[cfg(test)]
mod tests;
