//! Unit tests for the packet codec.

use bytes::{BufMut, Bytes, BytesMut};
use proptest::prelude::*;
use rstest::rstest;

use super::*;

fn raw_header(packet_len: u32, header_len: u16, version: u16, operation: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u32(packet_len);
    buf.put_u16(header_len);
    buf.put_u16(version);
    buf.put_u32(operation);
    buf.put_u32(DEFAULT_SEQUENCE);
    buf
}

#[test]
fn heartbeat_encodes_to_bare_header() {
    let bytes = Message::heartbeat().to_bytes().expect("encode heartbeat");
    assert_eq!(
        bytes.as_ref(),
        &[0, 0, 0, 16, 0, 16, 0, 0, 0, 0, 0, 2, 0, 0, 0, 1],
        "heartbeat should be a 16-byte header with operation 2 and sequence 1"
    );
}

#[test]
fn unpack_preserves_packet_order_within_a_frame() {
    let first = Message::new(1, op::SEND_MSG_REPLY, &b"first"[..]);
    let second = Message::new(2, op::AUTH_REPLY, &b"second"[..]);
    let mut frame = BytesMut::new();
    frame.extend_from_slice(&first.to_bytes().expect("encode first"));
    frame.extend_from_slice(&second.to_bytes().expect("encode second"));

    let decoded = unpack(frame.freeze()).expect("decode frame");

    assert_eq!(decoded, vec![first, second]);
}

#[test]
fn unpack_empty_frame_yields_no_messages() {
    assert!(unpack(Bytes::new()).expect("decode empty").is_empty());
}

#[test]
fn compressed_packet_is_flattened() {
    let inner = vec![
        Message::new(0, op::SEND_MSG_REPLY, &b"{\"cmd\":\"a\"}"[..]),
        Message::new(0, op::SEND_MSG_REPLY, &b"{\"cmd\":\"b\"}"[..]),
    ];
    let outer = Message::compressed(&inner).expect("compress");
    assert_eq!(outer.version(), VERSION_ZLIB);

    let mut frame = BytesMut::new();
    frame.extend_from_slice(&outer.to_bytes().expect("encode outer"));
    let trailing = Message::new(7, op::HEARTBEAT_REPLY, &b"\x00\x00\x00\x01"[..]);
    frame.extend_from_slice(&trailing.to_bytes().expect("encode trailing"));

    let decoded = unpack(frame.freeze()).expect("decode");

    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[..2], inner[..]);
    assert_eq!(decoded[2], trailing);
}

#[test]
fn compressing_a_compressed_message_is_rejected() {
    let inner = Message::compressed(&[Message::heartbeat()]).expect("compress");
    assert!(matches!(
        Message::compressed(&[inner]),
        Err(ProtoError::NestedCompression)
    ));
}

#[test]
fn nested_compression_on_the_wire_is_rejected() {
    let inner = Message::compressed(&[Message::heartbeat()]).expect("compress inner");
    let mut deflated = ZlibEncoder::new(Vec::new(), Compression::default());
    deflated
        .write_all(&inner.to_bytes().expect("encode inner"))
        .expect("deflate");
    let body = deflated.finish().expect("finish deflate");
    let packet_len = u32::try_from(HEADER_LEN + body.len()).expect("fits u32");
    let mut frame = raw_header(packet_len, HEADER_LEN_FIELD, VERSION_ZLIB, op::SEND_MSG_REPLY);
    frame.extend_from_slice(&body);

    assert!(matches!(
        unpack(frame.freeze()),
        Err(ProtoError::NestedCompression)
    ));
}

#[test]
fn corrupt_compressed_body_fails_to_inflate() {
    let mut frame = raw_header(20, HEADER_LEN_FIELD, VERSION_ZLIB, op::SEND_MSG_REPLY);
    frame.extend_from_slice(b"junk");
    assert!(matches!(
        unpack(frame.freeze()),
        Err(ProtoError::Inflate(_))
    ));
}

#[test]
fn brotli_bodies_are_unsupported() {
    let frame = raw_header(16, HEADER_LEN_FIELD, VERSION_BROTLI, op::SEND_MSG_REPLY);
    assert!(matches!(
        unpack(frame.freeze()),
        Err(ProtoError::UnsupportedVersion(VERSION_BROTLI))
    ));
}

#[rstest]
#[case::short_header(Bytes::from_static(&[0, 0, 0, 16, 0, 16]))]
#[case::short_body(raw_header(32, HEADER_LEN_FIELD, VERSION_NORMAL, op::AUTH).freeze())]
fn truncated_frames_are_rejected(#[case] frame: Bytes) {
    assert!(matches!(unpack(frame), Err(ProtoError::Truncated { .. })));
}

#[rstest]
#[case::header_len_too_small(raw_header(16, 8, VERSION_NORMAL, op::AUTH))]
#[case::packet_shorter_than_header(raw_header(12, HEADER_LEN_FIELD, VERSION_NORMAL, op::AUTH))]
fn inconsistent_lengths_are_rejected(#[case] frame: BytesMut) {
    assert!(matches!(
        unpack(frame.freeze()),
        Err(ProtoError::InvalidHeader { .. })
    ));
}

#[test]
fn longer_headers_are_skipped() {
    let mut frame = raw_header(23, 20, VERSION_NORMAL, op::SEND_MSG_REPLY);
    frame.extend_from_slice(&[9, 9, 9, 9]);
    frame.extend_from_slice(b"abc");

    let decoded = unpack(frame.freeze()).expect("decode");

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].payload().as_ref(), b"abc");
}

proptest! {
    #[test]
    fn encoding_then_decoding_preserves_operation_and_payload(
        operation in any::<u32>(),
        sequence in any::<u32>(),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let message = Message::new(sequence, operation, payload);
        let decoded = unpack(message.to_bytes().expect("encode")).expect("decode");
        prop_assert_eq!(decoded, vec![message]);
    }
}
