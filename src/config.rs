//! Parser configuration (spec C8 / grammar defaults in spec §6).

/// Controls for the delimited-text grammar: delimiter, quoting,
/// comments, numeric punctuation, and whitespace handling.
///
/// `Default` reproduces the grammar defaults: `delimiter=','`,
/// `quote='"'`, `comment="#"`, `decimal='.'`, `sci='E'`,
/// `imaginary_unit='j'`, `allow_embedded_newline=true`,
/// `ignore_leading_spaces=true`, `ignore_trailing_spaces=true`,
/// `ignore_blank_lines=true`, `strict_num_fields=true`,
/// `allow_float_for_int=true`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    /// Field separator. `'\0'` or `' '` selects the whitespace-run
    /// tokenizer (see [`ParserConfig::is_whitespace_delimited`]).
    pub delimiter: char,
    /// Field-quoting character. Set to a codepoint that cannot occur
    /// in the input to disable quoting.
    pub quote: char,
    /// Comment prefix. `comment.1 == '\0'` means a single-character
    /// prefix; otherwise both characters must match in sequence.
    pub comment: (char, char),
    /// Decimal-point character used by the float/complex decoders.
    pub decimal: char,
    /// Scientific-notation exponent letter (case-insensitive).
    pub sci: char,
    /// Trailing letter marking the imaginary part of a complex value.
    pub imaginary_unit: char,
    /// If true, a newline inside a quoted field is data, not a row
    /// terminator.
    pub allow_embedded_newline: bool,
    /// Strip spaces at the start of an unquoted field.
    pub ignore_leading_spaces: bool,
    /// Strip spaces at the end of an unquoted field.
    pub ignore_trailing_spaces: bool,
    /// Whitespace tokenizer only: skip lines that contain only
    /// whitespace instead of emitting them as single-empty-field rows.
    pub ignore_blank_lines: bool,
    /// If true, every row must have the same field count as the
    /// first row (enforced by the row reader, not the tokenizer).
    pub strict_num_fields: bool,
    /// If a cell fails integer parsing, retry it as a float and
    /// truncate to the target integer width.
    pub allow_float_for_int: bool,
    /// Row text longer than this many codepoints raises
    /// [`crate::error::ReadErrorKind::TooManyChars`].
    pub max_row_chars: usize,
    /// A row with more fields than this raises
    /// [`crate::error::ReadErrorKind::TooManyFields`].
    pub max_fields: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            delimiter: ',',
            quote: '"',
            comment: ('#', '\0'),
            decimal: '.',
            sci: 'E',
            imaginary_unit: 'j',
            allow_embedded_newline: true,
            ignore_leading_spaces: true,
            ignore_trailing_spaces: true,
            ignore_blank_lines: true,
            strict_num_fields: true,
            allow_float_for_int: true,
            max_row_chars: 4000,
            max_fields: 2000,
        }
    }
}

impl ParserConfig {
    /// True when the whitespace-run tokenizer should be used instead
    /// of the explicit single-character-delimiter tokenizer.
    pub fn is_whitespace_delimited(&self) -> bool {
        self.delimiter == '\0' || self.delimiter == ' '
    }

    /// True if `c` starts a comment, given that `next` is the
    /// following codepoint in the stream (needed for two-character
    /// comment prefixes).
    pub fn is_comment_start(&self, c: char, next: Option<char>) -> bool {
        let (c0, c1) = self.comment;
        if c0 == '\0' {
            return false;
        }
        c == c0 && (c1 == '\0' || next == Some(c1))
    }
}

/// Default buffer size for a file-backed [`crate::stream::CharStream`]:
/// 16 MiB, matching the reference implementation's default refill
/// buffer.
pub const DEFAULT_FILE_BUFFER_SIZE: usize = 16 * 1024 * 1024;
