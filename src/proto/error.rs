//! Error types for the packet codec.

use std::io;

use thiserror::Error;

/// Errors raised while packing or unpacking protocol packets.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The buffer ended before a complete header or body was available.
    #[error("truncated packet: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to finish the current packet.
        needed: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
    /// The header declared lengths that cannot describe a packet.
    #[error("invalid header: packet length {packet_len}, header length {header_len}")]
    InvalidHeader {
        /// Declared total packet length.
        packet_len: u32,
        /// Declared header length.
        header_len: u16,
    },
    /// The packet uses a body encoding this codec does not implement, such as
    /// brotli. The frame carrying it is dropped.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u16),
    /// A compressed body contained another compressed packet.
    #[error("compressed packet nested inside a compressed body")]
    NestedCompression,
    /// Inflating a compressed body failed or exceeded the size limit.
    #[error("failed to inflate compressed body")]
    Inflate(#[source] io::Error),
    /// Deflating a body for a compressed packet failed.
    #[error("failed to deflate body")]
    Deflate(#[source] io::Error),
    /// The body does not fit the 32-bit length field.
    #[error("payload of {0} bytes exceeds the packet length field")]
    PayloadTooLarge(usize),
}
