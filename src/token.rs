//! Row tokenizer (spec C3).
//!
//! The reference implementation has two near-duplicate tokenizer
//! functions, `tokenize_sep` and `tokenize_ws`, selected by whether
//! the delimiter is an explicit character or whitespace. Per the
//! REDESIGN FLAGS note in the spec, this crate keeps one
//! [`Tokenizer::next_row`] method parametrized over [`DelimiterMode`]
//! instead, sharing the quote- and comment-handling logic between the
//! two field-separation rules. Ported from
//! `examples/original_source/src/tokenize.c`.

use crate::config::ParserConfig;
use crate::error::{ReadError, ReadErrorKind};
use crate::stream::{CharStream, Fetch};

/// How fields within a row are separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterMode {
    /// A single explicit delimiter character (e.g. `,` or `\t`).
    Explicit(char),
    /// One or more consecutive space characters; leading/trailing runs
    /// of spaces do not produce empty fields, and fully blank lines
    /// are skipped rather than emitted as a one-empty-field row.
    Whitespace,
}

impl DelimiterMode {
    pub fn from_config(cfg: &ParserConfig) -> Self {
        if cfg.is_whitespace_delimited() {
            DelimiterMode::Whitespace
        } else {
            DelimiterMode::Explicit(cfg.delimiter)
        }
    }
}

/// The decoded fields of one row, reused across calls to
/// [`Tokenizer::next_row`] to avoid reallocating per row.
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    fields: Vec<Vec<char>>,
}

impl RowBuffer {
    pub fn new() -> Self {
        RowBuffer { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[Vec<char>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn clear(&mut self) {
        self.fields.clear();
    }

    fn push_field(&mut self, field: Vec<char>) {
        self.fields.push(field);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Unquoted,
    Quoted,
    Whitespace,
}

/// Pulls successive rows of fields from a [`CharStream`] according to
/// a [`ParserConfig`]'s grammar.
pub struct Tokenizer<'a, S: CharStream> {
    stream: &'a mut S,
    cfg: ParserConfig,
    mode: DelimiterMode,
}

impl<'a, S: CharStream> Tokenizer<'a, S> {
    pub fn new(stream: &'a mut S, cfg: ParserConfig) -> Self {
        let mode = DelimiterMode::from_config(&cfg);
        Tokenizer { stream, cfg, mode }
    }

    /// The underlying stream's current 1-based line counter.
    pub fn line_number(&self) -> u64 {
        self.stream.line_number()
    }

    fn is_comment_start(&mut self, c: char) -> Result<bool, ReadError> {
        if !self.cfg.is_comment_start(c, None) {
            return Ok(false);
        }
        let (c0, c1) = self.cfg.comment;
        if c1 == '\0' {
            return Ok(c == c0);
        }
        let next = match self.stream.peek()? {
            Fetch::Char(c) => Some(c),
            Fetch::Eof => None,
        };
        Ok(c == c0 && next == Some(c1))
    }

    fn skip_comment_lines(&mut self) -> Result<Fetch, ReadError> {
        loop {
            let fetch = self.stream.fetch()?;
            let c = match fetch {
                Fetch::Eof => return Ok(Fetch::Eof),
                Fetch::Char(c) => c,
            };
            if self.is_comment_start(c)? {
                self.stream.skip_line()?;
                continue;
            }
            return Ok(Fetch::Char(c));
        }
    }

    /// Read the next row into `row`, replacing its previous contents.
    /// Returns `Ok(false)` at clean end of input (no more rows, not an
    /// error); `Ok(true)` when `row` was filled. Genuine malformed-input
    /// conditions (a row too long, or with too many fields) are
    /// reported as `Err`.
    pub fn next_row(&mut self, row: &mut RowBuffer) -> Result<bool, ReadError> {
        match self.mode {
            DelimiterMode::Explicit(sep) => self.next_row_sep(row, sep),
            DelimiterMode::Whitespace => self.next_row_ws(row),
        }
    }

    fn check_limits(&self, row: &RowBuffer, chars_in_row: usize) -> Result<(), ReadError> {
        if chars_in_row > self.cfg.max_row_chars {
            return Err(ReadError::new(ReadErrorKind::TooManyChars).at_line(self.stream.line_number()));
        }
        if row.len() >= self.cfg.max_fields {
            return Err(ReadError::new(ReadErrorKind::TooManyFields).at_line(self.stream.line_number()));
        }
        Ok(())
    }

    fn next_row_sep(&mut self, row: &mut RowBuffer, sep: char) -> Result<bool, ReadError> {
        row.clear();

        let first = self.skip_comment_lines()?;
        let mut c = match first {
            Fetch::Eof => return Ok(false),
            Fetch::Char(c) => c,
        };
        let mut have_c = true;
        let mut eof_hit = false;

        let mut state = State::Init;
        let mut word: Vec<char> = Vec::new();
        let mut trailing_spaces = 0usize;
        let mut chars_in_row = 0usize;

        loop {
            self.check_limits(row, chars_in_row)?;
            if !have_c {
                match self.stream.fetch()? {
                    Fetch::Eof => eof_hit = true,
                    Fetch::Char(next) => {
                        c = next;
                        chars_in_row += 1;
                    }
                }
            } else {
                have_c = false;
            }

            match state {
                State::Init | State::Unquoted => {
                    if !eof_hit && state == State::Init && c == self.cfg.quote {
                        state = State::Quoted;
                    } else if !eof_hit && state == State::Init && self.cfg.ignore_leading_spaces && c == ' ' {
                        // skip
                    } else if eof_hit || c == sep || c == '\n' || self.is_comment_start(c)? {
                        let is_comment = !eof_hit && c != sep && c != '\n' && self.is_comment_start(c)?;
                        if self.cfg.ignore_trailing_spaces && trailing_spaces > 0 {
                            word.truncate(word.len() - trailing_spaces);
                        }
                        row.push_field(std::mem::take(&mut word));
                        if eof_hit || c == '\n' {
                            return Ok(true);
                        } else if is_comment {
                            self.stream.skip_line()?;
                            return Ok(true);
                        }
                        trailing_spaces = 0;
                        state = State::Init;
                    } else {
                        word.push(c);
                        trailing_spaces = if c == ' ' { trailing_spaces + 1 } else { 0 };
                        state = State::Unquoted;
                    }
                }
                State::Quoted => {
                    if eof_hit {
                        row.push_field(std::mem::take(&mut word));
                        return Ok(true);
                    }
                    let peek_next = self.stream.peek()?;
                    if (c != self.cfg.quote && c != '\n') || (c == '\n' && self.cfg.allow_embedded_newline) {
                        word.push(c);
                    } else if c == self.cfg.quote && peek_next == Fetch::Char(self.cfg.quote) {
                        word.push(c);
                        self.stream.fetch()?;
                    } else if c == self.cfg.quote {
                        state = State::Unquoted;
                        trailing_spaces = 0;
                    } else {
                        row.push_field(std::mem::take(&mut word));
                        return Ok(true);
                    }
                }
                State::Whitespace => unreachable!("whitespace state only used by next_row_ws"),
            }
        }
    }

    fn next_row_ws(&mut self, row: &mut RowBuffer) -> Result<bool, ReadError> {
        loop {
            row.clear();
            let first = self.skip_comment_lines()?;
            let mut c = match first {
                Fetch::Eof => return Ok(false),
                Fetch::Char(c) => c,
            };
            let mut have_c = true;

            let mut state = State::Whitespace;
            let mut word: Vec<char> = Vec::new();
            let mut chars_in_row = 0usize;
            let mut eof_hit = false;

            loop {
                self.check_limits(row, chars_in_row)?;
                if !have_c {
                    match self.stream.fetch()? {
                        Fetch::Eof => {
                            eof_hit = true;
                        }
                        Fetch::Char(next) => {
                            c = next;
                            chars_in_row += 1;
                        }
                    }
                } else {
                    have_c = false;
                }

                match state {
                    State::Whitespace => {
                        if eof_hit {
                            break;
                        } else if c == self.cfg.quote {
                            state = State::Quoted;
                        } else if c == '\n' {
                            break;
                        } else if c != ' ' {
                            word.push(c);
                            state = State::Unquoted;
                        }
                    }
                    State::Unquoted => {
                        if eof_hit || c == ' ' || c == '\n' {
                            row.push_field(std::mem::take(&mut word));
                            if eof_hit || c == '\n' {
                                break;
                            }
                            state = State::Whitespace;
                        } else {
                            word.push(c);
                        }
                    }
                    State::Quoted => {
                        if eof_hit {
                            row.push_field(std::mem::take(&mut word));
                            break;
                        }
                        let peek_next = self.stream.peek()?;
                        if (c != self.cfg.quote && c != '\n') || (c == '\n' && self.cfg.allow_embedded_newline) {
                            word.push(c);
                        } else if c == self.cfg.quote && peek_next == Fetch::Char(self.cfg.quote) {
                            word.push(c);
                            self.stream.fetch()?;
                        } else if c == self.cfg.quote {
                            state = State::Unquoted;
                        } else {
                            row.push_field(std::mem::take(&mut word));
                            eof_hit = true;
                            break;
                        }
                    }
                    State::Init => unreachable!("init state only used by next_row_sep"),
                }
                if eof_hit {
                    break;
                }
            }

            if !row.is_empty() {
                return Ok(true);
            }
            // Blank line: the whitespace tokenizer always skips it,
            // regardless of `ignore_blank_lines` (spec's documented
            // asymmetry — only the explicit-delimiter tokenizer honors
            // that flag at the reader level).
            if eof_hit {
                return Ok(false);
            }
        }
    }
}
