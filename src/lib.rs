//! # tabread
//!
//! A two-pass, type-inferring reader for delimited text tables: CSV,
//! TSV, and whitespace-separated data. The first pass (`analyze`)
//! scans the input to classify each column's scalar type from the
//! values actually present — signed/unsigned integer width, floating
//! point, complex, or fixed-width string — without materialising any
//! data. The second pass (`read_rows`) re-tokenises the input against
//! either the inferred schema or a caller-supplied one and writes a
//! dense, row-major typed buffer.

pub mod block;
pub mod config;
pub mod decode;
pub mod error;
pub mod infer;
pub mod reader;
pub mod schema;
pub mod stream;
pub mod token;

pub use config::ParserConfig;
pub use error::{ReadError, ReadErrorKind};
pub use reader::{analyze, read_rows, ReadResult, Request, Transform, TransformMap, TransformOutput};
pub use schema::{FieldType, FieldTypeTable, TypeCode};
pub use stream::{CharStream, Encoding, FileStream, Line, LineCallbackProvider, LineCallbackStream};

/// Returns the current version of the library.
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
