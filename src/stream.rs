//! Character stream abstraction (spec C1).
//!
//! Both stream kinds normalise `"\r\n"` and lone `'\r'` to `'\n'` so
//! the tokenizer above never has to think about line endings, and
//! both track a 1-based line counter for error reporting. Ported from
//! `examples/original_source/src/stream_file.c` (the buffered-refill
//! variant) and `src/stream.h` (the line-callback variant).

use std::io::{self, Read, Seek, SeekFrom};

use crate::config::DEFAULT_FILE_BUFFER_SIZE;
use crate::error::{ReadError, ReadErrorKind};

/// Result of fetching the next codepoint from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Char(char),
    Eof,
}

/// Minimal character-stream contract the tokenizer depends on.
pub trait CharStream {
    /// Consume and return the next codepoint, or `Eof`.
    fn fetch(&mut self) -> Result<Fetch, ReadError>;

    /// Look at the next codepoint without consuming it.
    fn peek(&mut self) -> Result<Fetch, ReadError>;

    /// Discard codepoints up to and including the next `'\n'`, or to
    /// EOF if none remains.
    fn skip_line(&mut self) -> Result<(), ReadError> {
        loop {
            match self.fetch()? {
                Fetch::Eof => return Ok(()),
                Fetch::Char('\n') => return Ok(()),
                Fetch::Char(_) => {}
            }
        }
    }

    /// Discard `n` whole lines (used to implement a `skiprows` count).
    fn skip_lines(&mut self, n: u64) -> Result<(), ReadError> {
        for _ in 0..n {
            self.skip_line()?;
        }
        Ok(())
    }

    /// The 1-based number of the line the next `fetch` will read from.
    fn line_number(&self) -> u64;

    /// An opaque position usable with [`Self::seek`]. For a file-backed
    /// stream this is an absolute byte offset; for a line-callback
    /// stream it delegates to the provider's own notion of position.
    fn tell(&self) -> u64;

    /// Restore a position previously returned by [`Self::tell`] and
    /// reset the line counter to 1, matching `fb_seek` in
    /// `examples/original_source/src/stream_file.c`.
    fn seek(&mut self, pos: u64) -> Result<(), ReadError>;
}

/// A stream backed by an in-memory buffer refilled from a `Read +
/// Seek` source. Decodes UTF-8 incrementally; a byte sequence that is
/// not valid UTF-8 at the point it is consumed raises
/// [`ReadErrorKind::FileError`].
pub struct FileStream<R: Read + Seek> {
    reader: R,
    /// Bytes read so far and not yet compacted away; `buf[pos..]` is
    /// the unconsumed tail.
    buf: Vec<u8>,
    pos: usize,
    read_chunk: usize,
    /// Absolute byte offset of `buf[0]` in the underlying stream.
    base_offset: u64,
    line_number: u64,
    peeked: Option<char>,
    eof: bool,
}

impl<R: Read + Seek> FileStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, DEFAULT_FILE_BUFFER_SIZE)
    }

    pub fn with_buffer_size(reader: R, buffer_size: usize) -> Self {
        FileStream {
            reader,
            buf: Vec::new(),
            pos: 0,
            read_chunk: buffer_size.max(64),
            base_offset: 0,
            line_number: 1,
            peeked: None,
            eof: false,
        }
    }

    /// Pull one more chunk from the reader, appending to `buf`.
    /// Returns `false` once the underlying reader is exhausted.
    fn pull_chunk(&mut self) -> Result<bool, ReadError> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > self.read_chunk {
            self.buf.drain(..self.pos);
            self.base_offset += self.pos as u64;
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + self.read_chunk, 0);
        let n = self.reader.read(&mut self.buf[start..]).map_err(|e| file_error(&e))?;
        self.buf.truncate(start + n);
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Decode the UTF-8 codepoint starting at `self.buf[self.pos]`,
    /// pulling more bytes as needed when it straddles the current
    /// buffer end. Leaves `self.pos` unchanged; the caller advances it.
    fn decode_next(&mut self) -> Result<Option<(char, usize)>, ReadError> {
        while self.pos >= self.buf.len() {
            if !self.pull_chunk()? {
                return Ok(None);
            }
        }
        let first = self.buf[self.pos];
        let width = utf8_width(first)
            .ok_or_else(|| ReadError::new(ReadErrorKind::FileError).at_line(self.line_number))?;

        while self.buf.len() - self.pos < width {
            if !self.pull_chunk()? {
                return Err(ReadError::new(ReadErrorKind::FileError).at_line(self.line_number));
            }
        }
        let bytes = &self.buf[self.pos..self.pos + width];
        let s = std::str::from_utf8(bytes)
            .map_err(|_| ReadError::new(ReadErrorKind::FileError).at_line(self.line_number))?;
        let c = s.chars().next().unwrap();
        Ok(Some((c, width)))
    }

    fn next_raw(&mut self) -> Result<Fetch, ReadError> {
        if let Some(c) = self.peeked.take() {
            self.pos += c.len_utf8();
            return Ok(Fetch::Char(c));
        }
        match self.decode_next()? {
            None => Ok(Fetch::Eof),
            Some((c, width)) => {
                self.pos += width;
                Ok(Fetch::Char(c))
            }
        }
    }
}

fn utf8_width(first_byte: u8) -> Option<usize> {
    if first_byte & 0x80 == 0 {
        Some(1)
    } else if first_byte & 0xE0 == 0xC0 {
        Some(2)
    } else if first_byte & 0xF0 == 0xE0 {
        Some(3)
    } else if first_byte & 0xF8 == 0xF0 {
        Some(4)
    } else {
        None
    }
}

fn file_error(e: &io::Error) -> ReadError {
    log::error!("file stream I/O error: {e}");
    ReadError::new(ReadErrorKind::FileError)
}

impl<R: Read + Seek> CharStream for FileStream<R> {
    fn fetch(&mut self) -> Result<Fetch, ReadError> {
        let raw = self.next_raw()?;
        match raw {
            Fetch::Eof => Ok(Fetch::Eof),
            Fetch::Char('\r') => {
                if let Fetch::Char('\n') = self.peek_raw()? {
                    let _ = self.next_raw()?;
                }
                self.line_number += 1;
                Ok(Fetch::Char('\n'))
            }
            Fetch::Char('\n') => {
                self.line_number += 1;
                Ok(Fetch::Char('\n'))
            }
            Fetch::Char(c) => Ok(Fetch::Char(c)),
        }
    }

    fn peek(&mut self) -> Result<Fetch, ReadError> {
        match self.peek_raw()? {
            Fetch::Char('\r') => Ok(Fetch::Char('\n')),
            other => Ok(other),
        }
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Current absolute byte offset, usable with [`Self::seek`].
    fn tell(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    /// Seek the underlying reader to an absolute byte offset
    /// previously returned by [`Self::tell`], reset internal buffering,
    /// and reset the line counter to 1, unconditionally — `fb_seek` in
    /// `examples/original_source/src/stream_file.c:204-211` does the
    /// same regardless of the target offset.
    fn seek(&mut self, offset: u64) -> Result<(), ReadError> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| file_error(&e))?;
        self.base_offset = offset;
        self.buf.clear();
        self.pos = 0;
        self.eof = false;
        self.peeked = None;
        self.line_number = 1;
        Ok(())
    }
}

impl<R: Read + Seek> FileStream<R> {
    fn peek_raw(&mut self) -> Result<Fetch, ReadError> {
        if let Some(c) = self.peeked {
            return Ok(Fetch::Char(c));
        }
        match self.decode_next()? {
            None => Ok(Fetch::Eof),
            Some((c, _)) => {
                self.peeked = Some(c);
                Ok(Fetch::Char(c))
            }
        }
    }
}

/// The character encoding a [`LineCallbackStream`] decodes lines with.
/// Named to mirror the `encoding=` argument of the upstream reader;
/// only UTF-8 is actually implemented, since no decoding crate appears
/// anywhere in the corpus this crate is grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Named(String),
}

impl Encoding {
    fn decode<'a>(&self, bytes: &'a [u8], line_number: u64) -> Result<std::borrow::Cow<'a, str>, ReadError> {
        let is_utf8 = match self {
            Encoding::Utf8 => true,
            Encoding::Named(label) => label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8"),
        };
        if !is_utf8 {
            return Err(ReadError::new(ReadErrorKind::FileError).at_line(line_number));
        }
        std::str::from_utf8(bytes)
            .map(std::borrow::Cow::Borrowed)
            .map_err(|_| ReadError::new(ReadErrorKind::FileError).at_line(line_number))
    }
}

/// One physical line handed back by a [`LineCallbackProvider`]. `None`
/// signals end of input.
pub type Line = Option<Vec<u8>>;

/// Pull-based line source. Implemented by callers that want to feed
/// rows from something other than a plain file — an in-memory
/// iterator, a decompressing reader, a generator function — without
/// this crate depending on their storage. Mirrors the
/// `next_line`/callback split in `src/stream.h`, generalised to a
/// trait instead of a C function pointer plus opaque context struct.
pub trait LineCallbackProvider {
    /// Return the next physical line, *without* a trailing newline, or
    /// `None` at end of input.
    fn next_line(&mut self) -> Result<Line, ReadError>;

    /// An opaque position usable with [`Self::seek`] — a line index, a
    /// byte offset into a backing buffer, whatever the provider can
    /// restore from later.
    fn tell(&self) -> u64;

    /// Restore a position previously returned by [`Self::tell`].
    fn seek(&mut self, pos: u64) -> Result<(), ReadError>;
}

/// A stream backed by a [`LineCallbackProvider`]: each call pulls one
/// line, decodes it under `encoding`, and serves its codepoints
/// followed by a synthetic `'\n'`.
pub struct LineCallbackStream<P: LineCallbackProvider> {
    provider: P,
    encoding: Encoding,
    current: Vec<char>,
    idx: usize,
    line_number: u64,
    done: bool,
}

impl<P: LineCallbackProvider> LineCallbackStream<P> {
    pub fn new(provider: P, encoding: Encoding) -> Self {
        LineCallbackStream {
            provider,
            encoding,
            current: Vec::new(),
            idx: 0,
            line_number: 1,
            done: false,
        }
    }

    fn ensure_line(&mut self) -> Result<bool, ReadError> {
        if self.idx < self.current.len() {
            return Ok(true);
        }
        if self.done {
            return Ok(false);
        }
        match self.provider.next_line()? {
            None => {
                self.done = true;
                Ok(false)
            }
            Some(bytes) => {
                let text = self.encoding.decode(&bytes, self.line_number)?;
                self.current = text.chars().chain(std::iter::once('\n')).collect();
                self.idx = 0;
                Ok(true)
            }
        }
    }
}

impl<P: LineCallbackProvider> CharStream for LineCallbackStream<P> {
    fn fetch(&mut self) -> Result<Fetch, ReadError> {
        if !self.ensure_line()? {
            return Ok(Fetch::Eof);
        }
        let c = self.current[self.idx];
        self.idx += 1;
        if c == '\n' {
            self.line_number += 1;
        }
        Ok(Fetch::Char(c))
    }

    fn peek(&mut self) -> Result<Fetch, ReadError> {
        if !self.ensure_line()? {
            return Ok(Fetch::Eof);
        }
        Ok(Fetch::Char(self.current[self.idx]))
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn tell(&self) -> u64 {
        self.provider.tell()
    }

    /// Delegates to the provider and resets the line buffer/counter,
    /// matching [`FileStream::seek`]'s unconditional reset to line 1.
    fn seek(&mut self, pos: u64) -> Result<(), ReadError> {
        self.provider.seek(pos)?;
        self.current.clear();
        self.idx = 0;
        self.line_number = 1;
        self.done = false;
        Ok(())
    }
}
