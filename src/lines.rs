//! Reassembly of complete lines from arbitrarily chunked input.

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;


/// A buffer reassembling complete lines out of a stream of
/// arbitrarily sized chunks.
///
/// Chunk boundaries carry no meaning: a line is emitted once its
/// terminating newline has been seen, with any partial trailer kept
/// around and prefixed to the next chunk. The concatenation of all
/// emitted lines (including the final [`flush`][LineBuffer::flush])
/// is byte-identical to the concatenation of all fed chunks.
pub struct LineBuffer {
    /// Bytes of the currently incomplete line.
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create a new, empty `LineBuffer`.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed a chunk of input, retrieving an iterator over all lines
    /// completed by it.
    ///
    /// Emitted lines include their terminating newline. A trailing
    /// partial line stays buffered until a later chunk (or
    /// [`flush`][Self::flush]) completes it.
    pub fn feed(&mut self, chunk: &[u8]) -> CompleteLines<'_> {
        let () = self.buf.extend_from_slice(chunk);
        // Everything up to (and including) the last newline is ready
        // for emission.
        let ready = self
            .buf
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);

        CompleteLines {
            buf: &mut self.buf,
            ready,
        }
    }

    /// Retrieve the buffered partial line, if any, at end of stream.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for LineBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "LineBuffer({} bytes pending)", self.buf.len())
    }
}


/// An iterator over the lines completed by a
/// [`feed`][LineBuffer::feed] call.
#[derive(Debug)]
pub struct CompleteLines<'buf> {
    /// The line buffer's backing storage.
    buf: &'buf mut Vec<u8>,
    /// The number of leading bytes known to form complete lines.
    ready: usize,
}

impl Iterator for CompleteLines<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ready == 0 {
            return None
        }

        // A newline is guaranteed to exist within the ready region.
        let pos = self.buf[..self.ready].iter().position(|b| *b == b'\n')?;
        let line = self.buf.drain(..=pos).collect::<Vec<_>>();
        self.ready -= line.len();
        Some(line)
    }
}
