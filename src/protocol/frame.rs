//! RESP frames
//!
//! Only the pieces a request needs: arrays, bulk strings and the null bulk
//! string.

use std::io::Cursor;

use bytes::{Buf, Bytes};
use thiserror::Error;

const CRLF: &[u8; 2] = b"\r\n";

/// Initial capacity cap for array frames, so a hostile header can't force a
/// large allocation before any element arrives.
const MAX_PREALLOC: usize = 64;

/// Longest length header accepted, CRLF excluded. `i64::MIN` is 20 chars.
const MAX_LINE: usize = 32;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,

    #[error("invalid frame type byte 0x{0:02x}")]
    InvalidDataType(u8),

    #[error("protocol error; {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

/// How far [`Frame::check_resume`] got through a partial frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckProgress {
    /// Offset just past the array header and every whole element seen so far
    checked: usize,

    /// Elements still to come; `None` until the array header has been read
    pending: Option<usize>,
}

impl CheckProgress {
    fn record(&mut self, src: &Cursor<&[u8]>, pending: usize) {
        self.checked = src.position() as usize;
        self.pending = Some(pending);
    }
}

impl Frame {
    /// Build an array of bulk strings
    pub fn bulk_array<I, B>(parts: I) -> Frame
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Frame::Array(parts.into_iter().map(|p| Frame::Bulk(p.into())).collect())
    }

    /// Skip over one complete frame without allocating
    ///
    /// On success the cursor sits on the first byte after the frame.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), FrameError> {
        Frame::check_resume(src, &mut CheckProgress::default())
    }

    /// [`Frame::check`] that picks up where an earlier `Incomplete` left off
    ///
    /// `progress` must describe the same buffer, grown only at the end. On
    /// `Incomplete` it records the array elements already known to be whole,
    /// so the next call does not scan them again.
    pub fn check_resume(
        src: &mut Cursor<&[u8]>,
        progress: &mut CheckProgress,
    ) -> Result<(), FrameError> {
        src.set_position(progress.checked as u64);

        let mut pending = match progress.pending {
            Some(pending) => pending,
            None => match get_u8(src)? {
                b'$' => return check_bulk(src),
                b'*' => {
                    let len = get_length(src)?.unwrap_or(0);
                    progress.record(src, len);
                    len
                }
                actual => return Err(FrameError::InvalidDataType(actual)),
            },
        };

        while pending > 0 {
            match get_u8(src)? {
                b'$' => check_bulk(src)?,
                b'*' => return Err(nested_array()),
                actual => return Err(FrameError::InvalidDataType(actual)),
            }
            pending -= 1;
            progress.record(src, pending);
        }
        Ok(())
    }

    /// Parse one complete frame
    ///
    /// Arrays hold bulk strings only; a nested array is rejected.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, FrameError> {
        match get_u8(src)? {
            b'$' => parse_bulk(src),
            // *<number-of-elements>\r\n<element-1>...<element-n>
            b'*' => match get_length(src)? {
                None => Ok(Frame::Null),
                Some(len) => {
                    let mut frames = Vec::with_capacity(len.min(MAX_PREALLOC));
                    for _ in 0..len {
                        match get_u8(src)? {
                            b'$' => frames.push(parse_bulk(src)?),
                            b'*' => return Err(nested_array()),
                            actual => return Err(FrameError::InvalidDataType(actual)),
                        }
                    }
                    Ok(Frame::Array(frames))
                }
            },
            actual => Err(FrameError::InvalidDataType(actual)),
        }
    }

    /// Encode this frame into its wire representation
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Frame::Bulk(data) => {
                out.push(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(CRLF);
                out.extend_from_slice(data);
                out.extend_from_slice(CRLF);
            }
            Frame::Null => out.extend_from_slice(b"$-1\r\n"),
            Frame::Array(parts) => {
                out.push(b'*');
                out.extend_from_slice(parts.len().to_string().as_bytes());
                out.extend_from_slice(CRLF);
                for part in parts {
                    part.write_to(out);
                }
            }
        }
    }
}

// $<length>\r\n<data>\r\n, type byte already consumed
fn check_bulk(src: &mut Cursor<&[u8]>) -> Result<(), FrameError> {
    match get_length(src)? {
        None => Ok(()),
        Some(len) => {
            skip(src, len)?;
            expect_crlf(src)
        }
    }
}

fn parse_bulk(src: &mut Cursor<&[u8]>) -> Result<Frame, FrameError> {
    match get_length(src)? {
        None => Ok(Frame::Null),
        Some(len) => {
            if src.remaining() < len {
                return Err(FrameError::Incomplete);
            }
            let data = Bytes::copy_from_slice(&src.chunk()[..len]);
            src.advance(len);
            expect_crlf(src)?;
            Ok(Frame::Bulk(data))
        }
    }
}

fn nested_array() -> FrameError {
    FrameError::Invalid("nested array".to_string())
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, FrameError> {
    if !src.has_remaining() {
        return Err(FrameError::Incomplete);
    }
    Ok(src.get_u8())
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), FrameError> {
    if src.remaining() < n {
        return Err(FrameError::Incomplete);
    }
    src.advance(n);
    Ok(())
}

fn expect_crlf(src: &mut Cursor<&[u8]>) -> Result<(), FrameError> {
    if src.remaining() < CRLF.len() {
        return Err(FrameError::Incomplete);
    }
    if &src.chunk()[..CRLF.len()] != CRLF {
        return Err(FrameError::Invalid(
            "bulk string not terminated by CRLF".to_string(),
        ));
    }
    src.advance(CRLF.len());
    Ok(())
}

/// Read a length header. `-1` is the null marker and yields `None`.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, FrameError> {
    let line = get_line(src)?;
    let text = std::str::from_utf8(line)
        .map_err(|_| FrameError::Invalid("length is not valid UTF-8".to_string()))?;
    let len: i64 = text
        .parse()
        .map_err(|_| FrameError::Invalid(format!("invalid length {:?}", text)))?;

    match len {
        -1 => Ok(None),
        n if n < 0 => Err(FrameError::Invalid(format!("negative length {}", n))),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| FrameError::Invalid(format!("length {} out of range", n))),
    }
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], FrameError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let limit = buf.len().min(start + MAX_LINE + CRLF.len());

    let end = match buf[start..limit].windows(2).position(|window| window == CRLF) {
        Some(i) => start + i,
        None if buf.len() - start > MAX_LINE + 1 => {
            return Err(FrameError::Invalid("length header too long".to_string()))
        }
        None => return Err(FrameError::Incomplete),
    };

    src.set_position((end + CRLF.len()) as u64);
    Ok(&buf[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Frame, FrameError> {
        Frame::parse(&mut Cursor::new(data))
    }

    #[test]
    fn parse_bulk_string() {
        assert_eq!(parse(b"$6\r\nfoobar\r\n").unwrap(), Frame::Bulk(Bytes::from("foobar")));
    }

    #[test]
    fn parse_empty_bulk_string() {
        assert_eq!(parse(b"$0\r\n\r\n").unwrap(), Frame::Bulk(Bytes::new()));
    }

    #[test]
    fn bulk_string_may_contain_crlf() {
        assert_eq!(
            parse(b"$4\r\na\r\nb\r\n").unwrap(),
            Frame::Bulk(Bytes::from_static(b"a\r\nb"))
        );
    }

    #[test]
    fn parse_null_bulk_string() {
        assert_eq!(parse(b"$-1\r\n").unwrap(), Frame::Null);
    }

    #[test]
    fn parse_array_of_bulk_strings() {
        let frame = parse(b"*2\r\n$5\r\nhello\r\n$5\r\nworld\r\n").unwrap();
        assert_eq!(frame, Frame::bulk_array(["hello", "world"]));
    }

    #[test]
    fn parse_empty_array() {
        assert_eq!(parse(b"*0\r\n").unwrap(), Frame::Array(vec![]));
    }

    #[test]
    fn incomplete_inputs() {
        let cases: [&[u8]; 6] = [
            b"",
            b"*",
            b"*2\r\n",
            b"*2\r\n$5\r\nhello\r\n",
            b"*1\r\n$5\r\nhel",
            b"*1\r\n$5\r\nhello\r",
        ];
        for data in cases {
            assert!(
                matches!(parse(data), Err(FrameError::Incomplete)),
                "expected Incomplete for {:?}",
                data
            );
        }
    }

    #[test]
    fn invalid_type_byte() {
        assert!(matches!(parse(b"+OK\r\n"), Err(FrameError::InvalidDataType(b'+'))));
    }

    #[test]
    fn invalid_length_header() {
        assert!(matches!(parse(b"*x\r\n"), Err(FrameError::Invalid(_))));
        assert!(matches!(parse(b"$-5\r\n"), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn bulk_string_with_wrong_terminator() {
        assert!(matches!(parse(b"$3\r\nfooXY"), Err(FrameError::Invalid(_))));
    }

    #[test]
    fn check_stops_after_one_frame() {
        let data = b"*1\r\n$3\r\nGET\r\n*1\r\n$3\r\nGET\r\n";
        let mut cursor = Cursor::new(&data[..]);
        Frame::check(&mut cursor).unwrap();
        assert_eq!(cursor.position() as usize, data.len() / 2);
    }

    #[test]
    fn serialize_array() {
        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("GET")), Frame::Null]);
        assert_eq!(frame.serialize(), b"*2\r\n$3\r\nGET\r\n$-1\r\n".to_vec());
    }

    #[test]
    fn nested_array_is_rejected() {
        let data = b"*1\r\n*1\r\n$3\r\nGET\r\n";
        assert!(matches!(parse(data), Err(FrameError::Invalid(_))));
        assert!(matches!(
            Frame::check(&mut Cursor::new(&data[..])),
            Err(FrameError::Invalid(_))
        ));
    }

    #[test]
    fn overlong_length_header() {
        let mut data = b"*".to_vec();
        data.extend_from_slice(&[b'1'; 40]);
        assert!(matches!(parse(&data), Err(FrameError::Invalid(_))));

        // short enough that the CRLF may still be on its way
        assert!(matches!(parse(b"*123"), Err(FrameError::Incomplete)));
    }

    #[test]
    fn check_resume_skips_whole_elements() {
        let data = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n";
        let mut progress = CheckProgress::default();

        let partial = &data[..17];
        let result = Frame::check_resume(&mut Cursor::new(partial), &mut progress);
        assert!(matches!(result, Err(FrameError::Incomplete)));
        assert_eq!(progress.checked, 13);
        assert_eq!(progress.pending, Some(2));

        let mut cursor = Cursor::new(&data[..]);
        Frame::check_resume(&mut cursor, &mut progress).unwrap();
        assert_eq!(cursor.position() as usize, data.len());
    }
}
