//! Error taxonomy for the table reader (spec C8).
//!
//! Every failure path returns a [`ReadError`] carrying the diagnostic
//! fields described by the parser's error record: the error kind, the
//! 1-based line number at the point of failure, the file-column index
//! of the offending field, the output-column index, and the typecode
//! that was being decoded. No panics, no exceptions: every fallible
//! operation in this crate returns a `Result`.

use thiserror::Error;

/// The kind of failure. Mirrors the taxonomy table in the spec's
/// error-handling section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadErrorKind {
    #[error("out of memory")]
    OutOfMemory,
    #[error("reached end of input without finding any field")]
    NoData,
    #[error("row exceeds the per-row character buffer")]
    TooManyChars,
    #[error("row exceeds the maximum number of fields")]
    TooManyFields,
    #[error("row has a different number of fields than the first row")]
    ChangedNumberOfFields,
    #[error("usecols entry is out of range for this row")]
    InvalidColumnIndex,
    #[error("field failed to decode as the column's type")]
    BadField,
    #[error("caller-supplied converter failed")]
    ConverterFailed,
    #[error("the input stream could not be opened or read")]
    FileError,
}

/// A diagnostic describing exactly where and why a read failed.
///
/// `line_number` is 1-based and reflects the stream's line counter at
/// the moment of failure. `field_index` is the file-column index (`k`
/// in the spec); `column_index` is the output-column index (`j`);
/// both are `-1` when not applicable. `typecode` is `'\0'` when not
/// applicable (e.g. `NoData`, `TooManyChars`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} (line {line_number}, field {field_index}, column {column_index}, typecode {typecode:?})")]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub line_number: u64,
    pub field_index: i64,
    pub column_index: i64,
    pub typecode: char,
}

impl ReadError {
    pub fn new(kind: ReadErrorKind) -> Self {
        ReadError {
            kind,
            line_number: 0,
            field_index: -1,
            column_index: -1,
            typecode: '\0',
        }
    }

    pub fn at_line(mut self, line_number: u64) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn with_field(mut self, field_index: i64) -> Self {
        self.field_index = field_index;
        self
    }

    pub fn with_column(mut self, column_index: i64) -> Self {
        self.column_index = column_index;
        self
    }

    pub fn with_typecode(mut self, typecode: char) -> Self {
        self.typecode = typecode;
        self
    }
}
