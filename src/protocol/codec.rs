//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Request
//! ```text
//! *3\r\n$3\r\nSET\r\n$<n>\r\n<key>\r\n$<n>\r\n<value>\r\n
//! *2\r\n$3\r\nGET\r\n$<n>\r\n<key>\r\n
//! ```
//!
//! ## Reply
//! A GET hit is answered with the raw value bytes and nothing else. SET and
//! GET misses are not answered at all.

use std::io::Cursor;

use bytes::Bytes;

use super::{Command, Frame, FrameError};
use crate::error::{KvError, Result};

// =============================================================================
// Command Decoding
// =============================================================================

/// Decode one request frame into a command
///
/// Pure: the same bytes always give the same command or the same error kind.
pub fn decode(raw: &[u8]) -> Result<Command> {
    let mut cursor = Cursor::new(raw);
    let frame = match Frame::parse(&mut cursor) {
        Ok(frame) => frame,
        Err(FrameError::Incomplete) => {
            return Err(KvError::TruncatedFrame(format!(
                "premature end of input after {} bytes",
                raw.len()
            )))
        }
        Err(_) => return Err(unknown(raw)),
    };

    let parts = match frame {
        Frame::Array(parts) => parts,
        _ => return Err(unknown(raw)),
    };

    let keyword = match parts.first() {
        Some(Frame::Bulk(keyword)) => keyword,
        _ => return Err(unknown(raw)),
    };

    match &keyword[..] {
        b"SET" => {
            check_arity(Command::SET, &parts, 3)?;
            Ok(Command::Set {
                key: key_of(Command::SET, &parts[1])?,
                value: value_of(Command::SET, &parts[2])?,
            })
        }
        b"GET" => {
            check_arity(Command::GET, &parts, 2)?;
            Ok(Command::Get {
                key: key_of(Command::GET, &parts[1])?,
            })
        }
        _ => Err(unknown(raw)),
    }
}

fn check_arity(name: &str, parts: &[Frame], expected: usize) -> Result<()> {
    if parts.len() != expected {
        return Err(KvError::MalformedCommand(format!(
            "invalid number of variables for {} command: expected {}, got {}",
            name,
            expected,
            parts.len()
        )));
    }
    Ok(())
}

fn key_of(name: &str, frame: &Frame) -> Result<String> {
    match frame {
        Frame::Bulk(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
            KvError::MalformedCommand(format!("{} command: key is not valid UTF-8", name))
        }),
        _ => Err(KvError::MalformedCommand(format!(
            "{} command: key must be a bulk string",
            name
        ))),
    }
}

fn value_of(name: &str, frame: &Frame) -> Result<Bytes> {
    match frame {
        Frame::Bulk(bytes) => Ok(bytes.clone()),
        _ => Err(KvError::MalformedCommand(format!(
            "{} command: value must be a bulk string",
            name
        ))),
    }
}

fn unknown(raw: &[u8]) -> KvError {
    KvError::UnknownCommand(String::from_utf8_lossy(raw).into_owned())
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a command as a request frame
pub fn encode_command(command: &Command) -> Bytes {
    Bytes::from(command.to_frame().serialize())
}

/// Encode a GET reply: the stored bytes, unframed
pub fn encode_reply(value: &[u8]) -> Bytes {
    Bytes::copy_from_slice(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parts: &[&str]) -> Vec<u8> {
        Frame::bulk_array(parts.iter().map(|p| p.to_string())).serialize()
    }

    #[test]
    fn decode_set() {
        let cmd = decode(&request(&["SET", "foo_0", "bar_0"])).unwrap();
        assert_eq!(cmd, Command::set("foo_0", "bar_0"));
    }

    #[test]
    fn decode_get() {
        let cmd = decode(&request(&["GET", "foo_0"])).unwrap();
        assert_eq!(cmd, Command::get("foo_0"));
    }

    #[test]
    fn set_with_one_argument_is_malformed() {
        let err = decode(&request(&["SET", "onlykey"])).unwrap_err();
        assert!(matches!(err, KvError::MalformedCommand(_)));
        assert!(err
            .to_string()
            .contains("invalid number of variables for SET command"));
    }

    #[test]
    fn set_with_extra_argument_is_malformed() {
        let err = decode(&request(&["SET", "k", "v", "extra"])).unwrap_err();
        assert!(matches!(err, KvError::MalformedCommand(_)));
    }

    #[test]
    fn bare_get_is_malformed() {
        let err = decode(&request(&["GET"])).unwrap_err();
        assert!(matches!(err, KvError::MalformedCommand(ref m) if m.contains("GET")));
    }

    #[test]
    fn unknown_keyword_carries_raw_text() {
        let raw = request(&["DEL", "k"]);
        match decode(&raw).unwrap_err() {
            KvError::UnknownCommand(text) => assert!(text.contains("DEL")),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let err = decode(&request(&["set", "k", "v"])).unwrap_err();
        assert!(matches!(err, KvError::UnknownCommand(_)));
    }

    #[test]
    fn non_array_frame_is_unknown() {
        assert!(matches!(
            decode(b"$3\r\nGET\r\n"),
            Err(KvError::UnknownCommand(_))
        ));
        assert!(matches!(decode(b"*0\r\n"), Err(KvError::UnknownCommand(_))));
        assert!(matches!(
            decode(b"hello world\r\n"),
            Err(KvError::UnknownCommand(_))
        ));
    }

    #[test]
    fn truncated_frame() {
        let raw = request(&["SET", "k", "v"]);
        let err = decode(&raw[..raw.len() - 3]).unwrap_err();
        assert!(matches!(err, KvError::TruncatedFrame(_)));
    }

    #[test]
    fn null_key_is_malformed() {
        assert!(matches!(
            decode(b"*2\r\n$3\r\nGET\r\n$-1\r\n"),
            Err(KvError::MalformedCommand(_))
        ));
    }

    #[test]
    fn non_utf8_key_is_malformed() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from_static(b"GET")),
            Frame::Bulk(Bytes::from_static(&[0xff, 0xfe])),
        ]);
        assert!(matches!(
            decode(&frame.serialize()),
            Err(KvError::MalformedCommand(_))
        ));
    }

    #[test]
    fn binary_values_survive_decode() {
        let value: Vec<u8> = (0..=255).collect();
        let raw = encode_command(&Command::set("bin", value.clone()));

        match decode(&raw).unwrap() {
            Command::Set { key, value: decoded } => {
                assert_eq!(key, "bin");
                assert_eq!(decoded.as_ref(), value.as_slice());
            }
            other => panic!("expected SET, got {:?}", other),
        }
    }

    #[test]
    fn decode_is_repeatable() {
        let raw = request(&["SET", "onlykey"]);
        for _ in 0..3 {
            assert!(matches!(decode(&raw), Err(KvError::MalformedCommand(_))));
        }
    }

    #[test]
    fn wire_format_get() {
        let encoded = encode_command(&Command::get("foo"));
        assert_eq!(&encoded[..], b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn reply_is_unframed() {
        assert_eq!(&encode_reply(b"bar_0")[..], b"bar_0");
    }
}
