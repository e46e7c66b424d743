//! The streaming encoder: same write surface over a generic byte sink.

use std::io::Write;

use crate::write::LtvWrite;

/// An encoder that forwards elements to an [std::io::Write] sink.
///
/// The first sink error is latched and every subsequent write becomes a
/// silent no-op until [reset](Self::reset); callers emit a logical unit of
/// writes and then check [error](Self::error) once.
#[derive(Debug)]
pub struct StreamEncoder<W: Write> {
    w: W,
    offset: usize,
    err: Option<std::io::Error>,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            offset: 0,
            err: None,
        }
    }

    /// Clear the latched error and the running offset.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.err = None;
    }

    /// Pretend `offset` bytes have already been written, so alignment
    /// padding stays correct when splicing after pre-framed output.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// The first sink error observed since the last reset, if any.
    pub fn error(&self) -> Option<&std::io::Error> {
        self.err.as_ref()
    }

    /// Take the latched error, leaving the encoder writable again.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.err.take()
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.w
    }
}

impl<W: Write> LtvWrite for StreamEncoder<W> {
    fn raw_write(&mut self, bytes: &[u8]) {
        // Abort all writes once the stream has an error.
        if self.err.is_some() {
            return;
        }

        match self.w.write_all(bytes) {
            Ok(()) => self.offset += bytes.len(),
            Err(e) => self.err = Some(e),
        }
    }

    fn offset(&self) -> usize {
        self.offset
    }
}
