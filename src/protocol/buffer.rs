//! Frame re-assembly
//!
//! Turns a stream of socket reads into a stream of whole frames. A frame
//! may arrive split across several reads, and one read may carry several
//! frames.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};

use super::{CheckProgress, Frame, FrameError};

/// Per-connection buffer of bytes not yet handed out as frames
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_frame_size: usize,

    /// Where checking the partial frame at the front of `buf` stopped
    progress: CheckProgress,
}

impl FrameBuffer {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4 * 1024),
            max_frame_size,
            progress: CheckProgress::default(),
        }
    }

    /// Append the bytes of one read
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next chunk ready for decoding
    ///
    /// Normally this is one complete frame. Bytes that cannot start a frame,
    /// or an incomplete frame that outgrew `max_frame_size`, come back as a
    /// single chunk so the decoder reports them; the buffer is then empty and
    /// later reads start fresh.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            return None;
        }

        let checked = {
            let mut cursor = Cursor::new(&self.buf[..]);
            Frame::check_resume(&mut cursor, &mut self.progress)
                .map(|()| cursor.position() as usize)
        };

        let chunk = match checked {
            Ok(len) => self.buf.split_to(len),
            Err(FrameError::Incomplete) if self.buf.len() > self.max_frame_size => {
                self.buf.split()
            }
            Err(FrameError::Incomplete) => return None,
            Err(_) => self.buf.split(),
        };

        self.progress = CheckProgress::default();
        Some(chunk.freeze())
    }

    /// Drain whatever is left, used once the peer hits EOF
    pub fn take_remaining(&mut self) -> Option<Bytes> {
        self.progress = CheckProgress::default();
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
