//! Codec Tests
//!
//! Tests for request/reply framing, command validation and the
//! incremental frame decoder.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use zestkv::protocol::{
    decode_reply, decode_request, encode_reply, encode_reply_limited, encode_request,
    read_frame, read_reply, read_request, write_reply, write_request, Command, FrameDecoder,
    Reply, Request, MAX_ARGS, MAX_FRAME_SIZE,
};
use zestkv::ZestError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Strip the length prefix from an encoded frame
fn payload_of(frame: &[u8]) -> Bytes {
    Bytes::copy_from_slice(&frame[4..])
}

fn parse(parts: &[&str]) -> Result<Command, ZestError> {
    Command::from_request(Request::from_parts(parts))
}

// =============================================================================
// Request Framing Tests
// =============================================================================

#[test]
fn test_encode_request_layout() {
    let frame = encode_request(&["get", "k"]);

    let mut expected = Vec::new();
    expected.extend_from_slice(&16u32.to_le_bytes()); // argc + 2 × len + 4 bytes of args
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.extend_from_slice(b"get");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(b"k");

    assert_eq!(frame, expected);
}

#[test]
fn test_decode_request_preserves_binary_and_empty_args() {
    let frame = encode_request(&[&b"set"[..], &b""[..], &[0u8, 255, 10][..]]);
    let request = decode_request(payload_of(&frame), MAX_ARGS).unwrap();

    assert_eq!(request.args.len(), 3);
    assert_eq!(&request.args[0][..], b"set");
    assert!(request.args[1].is_empty());
    assert_eq!(&request.args[2][..], &[0u8, 255, 10]);
}

#[test]
fn test_decode_request_rejects_truncated_argument() {
    let frame = encode_request(&["get", "key"]);
    // drop the last byte of the payload
    let payload = Bytes::copy_from_slice(&frame[4..frame.len() - 1]);
    assert!(matches!(
        decode_request(payload, MAX_ARGS),
        Err(ZestError::Protocol(_))
    ));
}

#[test]
fn test_decode_request_rejects_trailing_bytes() {
    let mut frame = encode_request(&["ping"]);
    frame.push(0xAA);
    assert!(decode_request(payload_of(&frame), MAX_ARGS).is_err());
}

#[test]
fn test_decode_request_rejects_too_many_args() {
    let frame = encode_request(&["a", "b", "c"]);
    assert!(decode_request(payload_of(&frame), 2).is_err());
    assert!(decode_request(payload_of(&frame), 3).is_ok());
}

#[test]
fn test_decode_request_rejects_huge_argc_without_allocating() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&u32::MAX.to_le_bytes());
    assert!(decode_request(Bytes::from(payload), usize::MAX).is_err());
}

// =============================================================================
// Reply Framing Tests
// =============================================================================

#[test]
fn test_encode_reply_nil() {
    assert_eq!(encode_reply(&Reply::Nil), vec![1, 0, 0, 0, 0]);
}

#[test]
fn test_encode_reply_int() {
    let frame = encode_reply(&Reply::Int(-2));
    let mut expected = vec![9, 0, 0, 0, 3];
    expected.extend_from_slice(&(-2i64).to_le_bytes());
    assert_eq!(frame, expected);
}

#[test]
fn test_encode_reply_err() {
    let frame = encode_reply(&Reply::error("bad"));
    assert_eq!(frame, vec![8, 0, 0, 0, 1, 3, 0, 0, 0, b'b', b'a', b'd']);
}

#[test]
fn test_encode_reply_nested_array() {
    let reply = Reply::Arr(vec![Reply::str("n1"), Reply::Arr(vec![Reply::Nil])]);
    let frame = encode_reply(&reply);

    let mut expected = vec![6];
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.push(2);
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(b"n1");
    expected.push(6);
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.push(0);

    assert_eq!(&frame[4..], &expected[..]);
    assert_eq!(decode_reply(payload_of(&frame)).unwrap(), reply);
}

#[test]
fn test_decode_reply_rejects_unknown_tag() {
    assert!(decode_reply(Bytes::from_static(&[4])).is_err());
    assert!(decode_reply(Bytes::from_static(&[0x7f])).is_err());
}

#[test]
fn test_decode_reply_rejects_truncation() {
    // STR claiming 10 bytes but carrying 2
    assert!(decode_reply(Bytes::from_static(&[2, 10, 0, 0, 0, b'h', b'i'])).is_err());
    // INT with 3 of 8 bytes
    assert!(decode_reply(Bytes::from_static(&[3, 1, 2, 3])).is_err());
    // ARR claiming a million elements
    assert!(decode_reply(Bytes::from_static(&[6, 0x40, 0x42, 0x0f, 0x00])).is_err());
    // empty payload
    assert!(decode_reply(Bytes::new()).is_err());
}

#[test]
fn test_oversized_reply_replaced_by_error() {
    let big = Reply::str(vec![b'x'; 1024]);

    let frame = encode_reply_limited(&big, 64);
    assert_eq!(
        decode_reply(payload_of(&frame)).unwrap(),
        Reply::error("response is too big")
    );

    let frame = encode_reply_limited(&big, MAX_FRAME_SIZE);
    assert_eq!(decode_reply(payload_of(&frame)).unwrap(), big);
}

// =============================================================================
// Frame Decoder Tests
// =============================================================================

#[test]
fn test_frame_decoder_pipelined_frames() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&encode_request(&["ping"]));
    buf.extend_from_slice(&encode_request(&["get", "k"]));

    let mut decoder = FrameDecoder::new(MAX_FRAME_SIZE);
    let first = decoder.decode_frame(&mut buf).unwrap().unwrap();
    let second = decoder.decode_frame(&mut buf).unwrap().unwrap();
    assert!(decoder.decode_frame(&mut buf).unwrap().is_none());

    assert_eq!(decode_request(first, MAX_ARGS).unwrap().args.len(), 1);
    assert_eq!(decode_request(second, MAX_ARGS).unwrap().args.len(), 2);
}

#[test]
fn test_frame_decoder_byte_at_a_time() {
    let frame = encode_request(&["zadd", "z", "1.5", "m"]);
    let mut decoder = FrameDecoder::new(MAX_FRAME_SIZE);
    let mut buf = BytesMut::new();

    let mut decoded = None;
    for (i, byte) in frame.iter().enumerate() {
        buf.extend_from_slice(&[*byte]);
        match decoder.decode_frame(&mut buf).unwrap() {
            Some(payload) => {
                assert_eq!(i, frame.len() - 1, "frame completed early");
                decoded = Some(payload);
            }
            None => assert!(i < frame.len() - 1),
        }
    }

    let request = decode_request(decoded.unwrap(), MAX_ARGS).unwrap();
    assert_eq!(
        Command::from_request(request).unwrap(),
        Command::ZAdd {
            key: Bytes::from("z"),
            score: 1.5,
            member: Bytes::from("m"),
        }
    );
}

#[test]
fn test_frame_decoder_rejects_oversized_prefix() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&1025u32.to_le_bytes());

    let mut decoder = FrameDecoder::new(1024);
    assert!(matches!(
        decoder.decode_frame(&mut buf),
        Err(ZestError::FrameTooLarge { len: 1025, max: 1024 })
    ));
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_stream_request_round_trip() {
    let mut wire = Vec::new();
    write_request(&mut wire, &["pttl", "session"]).unwrap();

    let request = read_request(&mut Cursor::new(wire)).unwrap();
    assert_eq!(
        Command::from_request(request).unwrap(),
        Command::PTtl { key: Bytes::from("session") }
    );
}

#[test]
fn test_stream_reply_round_trip() {
    let mut wire = Vec::new();
    write_reply(&mut wire, &Reply::Int(42)).unwrap();
    write_reply(&mut wire, &Reply::Nil).unwrap();

    let mut cursor = Cursor::new(wire);
    assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Int(42));
    assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Nil);
    assert!(read_reply(&mut cursor).is_err());
}

#[test]
fn test_read_frame_enforces_limit() {
    let frame = encode_request(&["set", "k", "0123456789"]);
    assert!(matches!(
        read_frame(&mut Cursor::new(frame.clone()), 8),
        Err(ZestError::FrameTooLarge { .. })
    ));
    assert!(read_frame(&mut Cursor::new(frame), MAX_FRAME_SIZE).is_ok());
}

// =============================================================================
// Command Validation Tests
// =============================================================================

#[test]
fn test_command_names_case_insensitive() {
    assert_eq!(parse(&["PING"]).unwrap(), Command::Ping);
    assert_eq!(parse(&["ZScore", "z", "m"]).unwrap().command_type().name(), "zscore");
}

#[test]
fn test_unknown_command() {
    let err = parse(&["hgetall", "h"]).unwrap_err();
    assert_eq!(err.to_string(), "unknown command 'hgetall'");
}

#[test]
fn test_wrong_arity() {
    let err = parse(&["set", "k"]).unwrap_err();
    assert_eq!(err.to_string(), "wrong number of arguments for 'set'");
    assert!(parse(&["ping", "extra"]).is_err());
}

#[test]
fn test_empty_request_rejected() {
    assert!(Command::from_request(Request::new(vec![])).is_err());
}

#[test]
fn test_score_parsing() {
    assert!(matches!(
        parse(&["zadd", "z", "-inf", "m"]).unwrap(),
        Command::ZAdd { score, .. } if score == f64::NEG_INFINITY
    ));
    assert_eq!(
        parse(&["zadd", "z", "abc", "m"]).unwrap_err().to_string(),
        "expect float"
    );
    assert_eq!(
        parse(&["zadd", "z", "nan", "m"]).unwrap_err().to_string(),
        "expect float"
    );
}

#[test]
fn test_integer_parsing() {
    assert_eq!(
        parse(&["pexpire", "k", "1.5"]).unwrap_err().to_string(),
        "expect int"
    );
    assert_eq!(
        parse(&["zquery", "z", "0", "", "x", "10"]).unwrap_err().to_string(),
        "expect int"
    );
    assert!(matches!(
        parse(&["zquery", "z", "0", "", "-3", "10"]).unwrap(),
        Command::ZQuery { offset: -3, limit: 10, .. }
    ));
}
