//! Newline-delimited frame codec.
//!
//! Each frame is one line of the byte stream. Lines longer than the configured
//! maximum are never buffered in full: once a partial line passes the limit the
//! decoder drops what it has, skips input up to the next newline and then
//! yields [`Frame::Oversized`] so the caller can report the rejection.

use crate::error::{Result, TransportError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// One decoded unit of the inbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, without its terminator
    Line(Bytes),
    /// A line that exceeded the limit and was discarded; carries its length
    Oversized(usize),
}

#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Where to resume the newline search in the buffer
    next_index: usize,
    /// Bytes of an oversized line skipped so far
    discarding: Option<usize>,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: None,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn without_carriage_return(mut line: BytesMut) -> BytesMut {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = TransportError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (Some(skipped), Some(end)) => {
                    buf.advance(end + 1);
                    self.discarding = None;
                    self.next_index = 0;
                    trace!(size = skipped + end, "Finished discarding oversized line");
                    return Ok(Some(Frame::Oversized(skipped + end)));
                }
                (Some(skipped), None) => {
                    let n = buf.len();
                    buf.advance(n);
                    self.discarding = Some(skipped + n);
                    self.next_index = 0;
                    return Ok(None);
                }
                (None, Some(end)) => {
                    let line = without_carriage_return(buf.split_to(end + 1).split_to(end));
                    self.next_index = 0;
                    if line.len() > self.max_length {
                        return Ok(Some(Frame::Oversized(line.len())));
                    }
                    if is_blank(&line) {
                        continue;
                    }
                    return Ok(Some(Frame::Line(line.freeze())));
                }
                (None, None) => {
                    // A trailing \r may be the first half of a split \r\n.
                    let limit = match buf.last() {
                        Some(b'\r') => self.max_length.saturating_add(1),
                        _ => self.max_length,
                    };
                    if buf.len() > limit {
                        trace!(buffered = buf.len(), "Line exceeds limit, discarding");
                        self.discarding = Some(buf.len());
                        buf.clear();
                        self.next_index = 0;
                    } else {
                        self.next_index = buf.len();
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if let Some(skipped) = self.discarding.take() {
            self.next_index = 0;
            return Ok(Some(Frame::Oversized(skipped)));
        }
        self.next_index = 0;
        if buf.is_empty() || is_blank(buf) {
            buf.clear();
            return Ok(None);
        }
        let line = without_carriage_return(buf.split());
        Ok(Some(Frame::Line(line.freeze())))
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = TransportError;

    fn encode(&mut self, line: Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(line.len() + 1);
        dst.put(line);
        dst.put_u8(b'\n');
        Ok(())
    }
}
