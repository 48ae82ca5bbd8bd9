//! Rewriting of stack frame lines and the stream filter built on
//! top of it.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::io::Write;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;

use crate::cache::LibCache;
use crate::frame::find_frame;
use crate::lines::LineBuffer;
use crate::source::NmTool;
use crate::source::SymbolSource;


/// A symbolizer rewriting stack frame lines in place.
///
/// The symbolizer recognizes frame references of the form
/// `#<digits> 0x<8 hex> <libpath>+0x<8 hex>` and, where the offset
/// resolves against the library's symbol table, replaces the
/// `<libpath>+0x<8 hex>` span with the symbol name. Everything else,
/// including frames whose offset does not resolve, passes through
/// byte for byte.
///
/// Symbol tables are built lazily, at most once per library and
/// symbolizer. Each `Symbolizer` owns its cache, so independent
/// instances do not interfere.
#[derive(Debug)]
pub struct Symbolizer<S = NmTool> {
    /// The source consulted for per-library symbol listings.
    source: S,
    /// Symbol tables built so far.
    cache: LibCache,
}

impl Symbolizer<NmTool> {
    /// Create a new `Symbolizer` enumerating symbols with [`NmTool`].
    pub fn new() -> Self {
        Self::with_source(NmTool::new())
    }
}

impl Default for Symbolizer<NmTool> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Symbolizer<S>
where
    S: SymbolSource,
{
    /// Create a new `Symbolizer` using the provided [`SymbolSource`].
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            cache: LibCache::new(),
        }
    }

    /// Rewrite all resolvable frame references within a single line.
    ///
    /// Matching proceeds left to right and non-overlapping; scanning
    /// resumes after each recognized span. The line is returned
    /// borrowed if nothing was substituted.
    pub fn rewrite<'line>(&self, line: &'line [u8]) -> Cow<'line, [u8]> {
        let mut rewritten: Option<Vec<u8>> = None;
        let mut emitted = 0;
        let mut pos = 0;

        while let Some(frame) = find_frame(line, pos) {
            pos = frame.span.end;

            let path = Path::new(OsStr::from_bytes(&line[frame.lib.clone()]));
            let table = self.cache.table(path, &self.source);
            let name = match table.find(frame.offset) {
                Some(name) => name,
                // Pass the span through untouched; unresolvable frames
                // are a normal occurrence.
                None => continue,
            };

            let buf = rewritten.get_or_insert_with(Vec::new);
            let () = buf.extend_from_slice(&line[emitted..frame.lib.start]);
            let () = buf.extend_from_slice(name.as_bytes());
            emitted = frame.span.end;
        }

        match rewritten {
            Some(mut buf) => {
                let () = buf.extend_from_slice(&line[emitted..]);
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(line),
        }
    }
}


/// A symbolizing filter wrapping an output sink.
///
/// Bytes written to the filter are reassembled into lines, rewritten
/// through a [`Symbolizer`], and forwarded to the sink in input
/// order. Call [`finish`][SymFilter::finish] at end of stream to emit
/// a trailing line lacking a newline.
#[derive(Debug)]
pub struct SymFilter<W, S = NmTool> {
    /// The output sink.
    sink: W,
    /// Reassembly buffer for partial lines.
    lines: LineBuffer,
    /// The symbolizer applied to each completed line.
    symbolizer: Symbolizer<S>,
}

impl<W> SymFilter<W, NmTool>
where
    W: Write,
{
    /// Create a new `SymFilter` forwarding to `sink`, with symbols
    /// enumerated by [`NmTool`].
    pub fn new(sink: W) -> Self {
        Self::with_symbolizer(sink, Symbolizer::new())
    }
}

impl<W, S> SymFilter<W, S>
where
    W: Write,
    S: SymbolSource,
{
    /// Create a new `SymFilter` forwarding to `sink` and rewriting
    /// with the provided [`Symbolizer`].
    pub fn with_symbolizer(sink: W, symbolizer: Symbolizer<S>) -> Self {
        Self {
            sink,
            lines: LineBuffer::new(),
            symbolizer,
        }
    }

    /// Signal end of stream, rewriting and emitting a buffered
    /// partial line, and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(rest) = self.lines.flush() {
            let () = self.sink.write_all(&self.symbolizer.rewrite(&rest))?;
        }
        let () = self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<W, S> Write for SymFilter<W, S>
where
    W: Write,
    S: SymbolSource,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in self.lines.feed(buf) {
            let () = self.sink.write_all(&self.symbolizer.rewrite(&line))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
