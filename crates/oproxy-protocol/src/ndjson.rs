use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Longest line accepted before the stream is treated as corrupt.
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line exceeds 64 KiB")]
pub struct LineTooLong;

/// Splits a chunked byte stream into `\n`-terminated lines.
///
/// Chunk boundaries are arbitrary; partial lines are buffered until their
/// terminator arrives or the stream ends.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: BytesMut,
    // Bytes of `buf` already known to hold no `\n`.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, LineTooLong> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            if pos > MAX_LINE_LEN {
                return Err(LineTooLong);
            }
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            lines.push(strip_cr(line.freeze()));
            self.scanned = 0;
        }
        self.scanned = self.buf.len();
        if self.scanned > MAX_LINE_LEN {
            return Err(LineTooLong);
        }
        Ok(lines)
    }

    pub fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        Some(strip_cr(self.buf.split().freeze()))
    }
}

fn strip_cr(line: Bytes) -> Bytes {
    match line.last() {
        Some(b'\r') => line.slice(..line.len() - 1),
        _ => line,
    }
}
