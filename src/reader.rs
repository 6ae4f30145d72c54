//! Row reader (spec C7): orchestrates the stream, tokenizer, type
//! inferencer, decoders, and block store into the two public
//! operations, `analyze` and `read_rows`. Ported from
//! `examples/original_source/src/analyze.c` and
//! `examples/original_source/src/rows.c`.

use num_complex::Complex64;

use crate::block::Sink;
use crate::config::ParserConfig;
use crate::decode::{self, IntError};
use crate::error::{ReadError, ReadErrorKind};
use crate::infer::{self, Classification, IntegerRange};
use crate::schema::{FieldType, FieldTypeTable, TypeCode};
use crate::stream::CharStream;
use crate::token::{RowBuffer, Tokenizer};

/// How many rows to read. Replaces the source's `*nrows < 0` sentinel
/// convention (REDESIGN FLAGS) with an explicit `Option`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Request {
    /// `None` reads every remaining row, growing storage as needed.
    /// `Some(n)` reads at most `n` rows into a buffer sized exactly
    /// for `n`.
    pub limit: Option<u64>,
    pub skiprows: u64,
}

/// A decoded, typed value handed back by a [`Transform`] in place of
/// the raw field text. The reader copies it into the row buffer
/// according to the column's typecode, the same way it would a
/// directly-decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutput {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
    Bytes(Vec<u8>),
    Unicode(Vec<char>),
}

/// Caller-supplied per-column value transform. Must be pure with
/// respect to the reader's internal state — the reader does not guard
/// against a transform re-entering the stream it is reading from.
pub trait Transform {
    fn apply(&self, field: &[char]) -> Result<TransformOutput, ReadError>;
}

/// Per-file-column transform lookup. Spec §4.7: looked up first by the
/// file-column index `k`, then (if absent) by `k - actual_num_fields`,
/// so a caller can register a transform by a negative index the same
/// way `usecols` accepts one.
#[derive(Default)]
pub struct TransformMap {
    entries: std::collections::HashMap<i64, Box<dyn Transform>>,
}

impl TransformMap {
    pub fn new() -> Self {
        TransformMap::default()
    }

    pub fn insert(&mut self, column: i64, transform: Box<dyn Transform>) {
        self.entries.insert(column, transform);
    }

    fn lookup(&self, k: i64, actual_num_fields: i64) -> Option<&dyn Transform> {
        self.entries
            .get(&k)
            .or_else(|| self.entries.get(&(k - actual_num_fields)))
            .map(|b| b.as_ref())
    }
}

/// Result of a completed `read_rows` call.
#[derive(Debug)]
pub struct ReadResult {
    pub data: Vec<u8>,
    pub num_rows: usize,
    pub num_cols: usize,
    pub row_size: usize,
}

/// Scan the entire input (after skipping `skiprows` lines, and capped
/// at `request.limit` rows if given) to infer a [`FieldTypeTable`].
/// Does not materialize any row data.
pub fn analyze<S: CharStream>(stream: &mut S, cfg: &ParserConfig, request: Request) -> Result<FieldTypeTable, ReadError> {
    stream.skip_lines(request.skiprows)?;

    let mut tok = Tokenizer::new(stream, *cfg);
    let mut row = RowBuffer::new();
    let mut types: Vec<FieldType> = Vec::new();
    let mut ranges: Vec<IntegerRange> = Vec::new();
    let mut row_count: u64 = 0;

    while request.limit.map_or(true, |limit| row_count < limit) {
        if !tok.next_row(&mut row)? {
            break;
        }
        if row.len() > types.len() {
            types.resize(row.len(), FieldType::undetermined());
            ranges.resize(row.len(), IntegerRange::new());
        }
        for (k, field) in row.fields().iter().enumerate() {
            let prev = types[k].typecode;
            let classification = infer::classify_field(field, cfg.decimal, cfg.sci, cfg.imaginary_unit, prev);
            let new_type = match classification {
                Classification::Unsigned(u) => {
                    ranges[k].observe_unsigned(u);
                    TypeCode::U64
                }
                Classification::Signed(i) => {
                    ranges[k].observe_signed(i);
                    TypeCode::I64
                }
                Classification::Float => TypeCode::F64,
                Classification::Complex => TypeCode::Complex128,
                Classification::Blank => prev,
                Classification::String => TypeCode::Str,
            };
            types[k].typecode = new_type;
            let field_len = field.len() as i32;
            if field_len > types[k].itemsize {
                types[k].itemsize = field_len;
            }
        }
        row_count += 1;
    }

    for (k, ft) in types.iter_mut().enumerate() {
        match ft.typecode {
            TypeCode::U64 | TypeCode::I64 => {
                ft.typecode = infer::type_for_integer_range(ranges[k].imin, ranges[k].umax);
            }
            _ => {}
        }
        if let Some(size) = ft.typecode.fixed_itemsize() {
            ft.itemsize = size;
        }
        // TypeCode::Str keeps the observed max field length as itemsize.
        // TypeCode::Undetermined (a column never populated by any row,
        // possible only when ragged rows widen the table) stays at 0.
    }

    let table = FieldTypeTable::from_entries(types);
    log::debug!(
        "analyze: {row_count} rows scanned, schema {:?}",
        table.build_schema_string(None)
    );
    Ok(table)
}

fn compute_row_size(actual_num_fields: usize, field_types: &FieldTypeTable) -> usize {
    if field_types.len() == 1 {
        actual_num_fields * field_types.get(0).map_or(0, |ft| ft.itemsize as usize)
    } else {
        field_types.as_slice().iter().map(|ft| ft.itemsize as usize).sum()
    }
}

/// Materialize rows into a dense typed buffer using `field_types` as
/// the per-column schema. `usecols`, when given, selects and reorders
/// file columns by index (negative indices count from the end of the
/// *first* row) and disables the ragged-row check (spec §4.7 step 5).
pub fn read_rows<S: CharStream>(
    stream: &mut S,
    cfg: &ParserConfig,
    field_types: &FieldTypeTable,
    request: Request,
    usecols: Option<&[i64]>,
    transforms: Option<&TransformMap>,
) -> Result<ReadResult, ReadError> {
    stream.skip_lines(request.skiprows)?;

    let mut tok = Tokenizer::new(stream, *cfg);
    let mut row = RowBuffer::new();

    if !tok.next_row(&mut row)? {
        return Ok(ReadResult {
            data: Vec::new(),
            num_rows: 0,
            num_cols: 0,
            row_size: 0,
        });
    }

    let first_row_fields = row.len();
    let actual_num_fields = if field_types.len() > 1 {
        field_types.len()
    } else if let Some(cols) = usecols {
        cols.len()
    } else {
        first_row_fields
    };

    let normalized_usecols: Option<Vec<i64>> = usecols.map(|cols| {
        cols.iter()
            .map(|&k| if k < 0 { k + first_row_fields as i64 } else { k })
            .collect()
    });

    let row_size = compute_row_size(actual_num_fields, field_types);

    // Per REDESIGN FLAGS: the column -> transform mapping is resolved
    // once here, into an array indexed by output column, rather than
    // re-running the negative-key fallback lookup on every row. The
    // file-column `k` a given output column `j` reads from is fixed by
    // `normalized_usecols` (or `j` itself with no `usecols`), so the
    // resolution is row-independent.
    let resolved_transforms: Vec<Option<&dyn Transform>> = (0..actual_num_fields)
        .map(|j| {
            let k = match &normalized_usecols {
                None => j as i64,
                Some(cols) => cols[j],
            };
            transforms.and_then(|m| m.lookup(k, actual_num_fields as i64))
        })
        .collect();

    let mut sink = match request.limit {
        None => Sink::growing(row_size),
        Some(n) => Sink::preallocated(row_size, n as usize),
    };

    let mut row_count: usize = 0;
    let mut first_iteration = true;

    loop {
        if let Some(limit) = request.limit {
            if row_count as u64 >= limit {
                break;
            }
        }
        if !first_iteration && !tok.next_row(&mut row)? {
            break;
        }
        first_iteration = false;

        if usecols.is_none() && cfg.strict_num_fields && row.len() != actual_num_fields {
            return Err(ReadError::new(ReadErrorKind::ChangedNumberOfFields)
                .at_line(tok.line_number())
                .with_field(row.len() as i64));
        }

        let current_num_fields = row.len();
        log::trace!("read_rows: line {} has {current_num_fields} fields", tok.line_number());

        let dest = sink.row_mut(row_count);
        let mut offset = 0usize;

        for j in 0..actual_num_fields {
            let f = if field_types.len() == 1 { 0 } else { j };
            let ft = field_types.get(f).unwrap_or_else(FieldType::undetermined);

            let k: i64 = match &normalized_usecols {
                None => j as i64,
                Some(cols) => {
                    let k = cols[j];
                    if k < 0 || k >= current_num_fields as i64 {
                        return Err(ReadError::new(ReadErrorKind::InvalidColumnIndex)
                            .at_line(tok.line_number())
                            .with_column(usecols.unwrap()[j]));
                    }
                    k
                }
            };

            let present = k >= 0 && (k as usize) < current_num_fields;
            if !present {
                log::warn!(
                    "read_rows: line {} is short a field at column {j}; using the missing-value default",
                    tok.line_number()
                );
            }
            let transform = resolved_transforms[j];

            let cell = dest_slice(dest, offset, ft.itemsize as usize);
            offset += ft.itemsize as usize;

            let value = if present {
                let raw_field = &row.fields()[k as usize];
                if let Some(t) = transform {
                    Some(
                        t.apply(raw_field)
                            .map_err(|e| e.at_line(tok.line_number()).with_column(k).with_typecode(ft.typecode.as_char()))?,
                    )
                } else {
                    None
                }
            } else {
                None
            };

            write_field(cell, ft.typecode, present, value, row.fields().get(k as usize).map(|f| f.as_slice()), cfg)
                .map_err(|kind| {
                    ReadError::new(kind)
                        .at_line(tok.line_number())
                        .with_field(k)
                        .with_column(j as i64)
                        .with_typecode(ft.typecode.as_char())
                })?;
        }

        row_count += 1;
    }

    let data = sink.finish(row_count);
    Ok(ReadResult {
        data,
        num_rows: row_count,
        num_cols: actual_num_fields,
        row_size,
    })
}

fn dest_slice(dest: &mut [u8], offset: usize, len: usize) -> &mut [u8] {
    &mut dest[offset..offset + len]
}

fn write_field(
    dest: &mut [u8],
    typecode: TypeCode,
    present: bool,
    transformed: Option<TransformOutput>,
    raw: Option<&[char]>,
    cfg: &ParserConfig,
) -> Result<(), ReadErrorKind> {
    if let Some(value) = transformed {
        return write_transformed(dest, typecode, value);
    }
    if !present {
        write_missing(dest, typecode);
        return Ok(());
    }
    let field = raw.unwrap_or(&[]);
    write_raw_field(dest, typecode, field, cfg)
}

fn write_missing(dest: &mut [u8], typecode: TypeCode) {
    use TypeCode::*;
    match typecode {
        F32 => dest.copy_from_slice(&f32::NAN.to_le_bytes()),
        F64 => dest.copy_from_slice(&f64::NAN.to_le_bytes()),
        Complex64 => {
            dest[0..4].copy_from_slice(&f32::NAN.to_le_bytes());
            dest[4..8].copy_from_slice(&f32::NAN.to_le_bytes());
        }
        Complex128 => {
            dest[0..8].copy_from_slice(&f64::NAN.to_le_bytes());
            dest[8..16].copy_from_slice(&f64::NAN.to_le_bytes());
        }
        Str | Unicode | Undetermined => dest.fill(0),
        _ => dest.fill(0), // integer types: missing cell is 0.
    }
}

fn write_transformed(dest: &mut [u8], typecode: TypeCode, value: TransformOutput) -> Result<(), ReadErrorKind> {
    use TypeCode::*;
    match (typecode, value) {
        (I8, TransformOutput::Int(x)) => dest[0] = x as i8 as u8,
        (U8, TransformOutput::UInt(x)) => dest[0] = x as u8,
        (I16, TransformOutput::Int(x)) => dest.copy_from_slice(&(x as i16).to_le_bytes()),
        (U16, TransformOutput::UInt(x)) => dest.copy_from_slice(&(x as u16).to_le_bytes()),
        (I32, TransformOutput::Int(x)) => dest.copy_from_slice(&(x as i32).to_le_bytes()),
        (U32, TransformOutput::UInt(x)) => dest.copy_from_slice(&(x as u32).to_le_bytes()),
        (I64, TransformOutput::Int(x)) => dest.copy_from_slice(&x.to_le_bytes()),
        (U64, TransformOutput::UInt(x)) => dest.copy_from_slice(&x.to_le_bytes()),
        (F32, TransformOutput::Float(x)) => dest.copy_from_slice(&(x as f32).to_le_bytes()),
        (F64, TransformOutput::Float(x)) => dest.copy_from_slice(&x.to_le_bytes()),
        (Complex64, TransformOutput::Complex(z)) => {
            dest[0..4].copy_from_slice(&(z.re as f32).to_le_bytes());
            dest[4..8].copy_from_slice(&(z.im as f32).to_le_bytes());
        }
        (Complex128, TransformOutput::Complex(z)) => {
            dest[0..8].copy_from_slice(&z.re.to_le_bytes());
            dest[8..16].copy_from_slice(&z.im.to_le_bytes());
        }
        (Str, TransformOutput::Bytes(bytes)) => decode::copy_bytes(dest, &bytes),
        (Unicode, TransformOutput::Unicode(chars)) => decode::copy_codepoints(dest, &chars),
        _ => return Err(ReadErrorKind::ConverterFailed),
    }
    Ok(())
}

fn write_raw_field(dest: &mut [u8], typecode: TypeCode, field: &[char], cfg: &ParserConfig) -> Result<(), ReadErrorKind> {
    use TypeCode::*;
    if field.is_empty() {
        write_missing(dest, typecode);
        return Ok(());
    }
    match typecode {
        I8 => {
            let x = narrow_int_value(field, cfg, i8::MIN as i64, i8::MAX as i64)?;
            dest[0] = x as i8 as u8;
        }
        U8 => {
            let x = narrow_uint_value(field, cfg, u8::MAX as u64)?;
            dest[0] = x as u8;
        }
        I16 => {
            let x = narrow_int_value(field, cfg, i16::MIN as i64, i16::MAX as i64)?;
            dest.copy_from_slice(&(x as i16).to_le_bytes());
        }
        U16 => {
            let x = narrow_uint_value(field, cfg, u16::MAX as u64)?;
            dest.copy_from_slice(&(x as u16).to_le_bytes());
        }
        I32 => {
            let x = narrow_int_value(field, cfg, i32::MIN as i64, i32::MAX as i64)?;
            dest.copy_from_slice(&(x as i32).to_le_bytes());
        }
        U32 => {
            let x = narrow_uint_value(field, cfg, u32::MAX as u64)?;
            dest.copy_from_slice(&(x as u32).to_le_bytes());
        }
        I64 => {
            let x = narrow_int_value(field, cfg, i64::MIN, i64::MAX)?;
            dest.copy_from_slice(&x.to_le_bytes());
        }
        U64 => {
            let x = narrow_uint_value(field, cfg, u64::MAX)?;
            dest.copy_from_slice(&x.to_le_bytes());
        }
        F32 => match decode::parse_float(field, cfg) {
            Some(x) => dest.copy_from_slice(&(x as f32).to_le_bytes()),
            None => return Err(ReadErrorKind::BadField),
        },
        F64 => match decode::parse_float(field, cfg) {
            Some(x) => dest.copy_from_slice(&x.to_le_bytes()),
            None => return Err(ReadErrorKind::BadField),
        },
        Complex64 => match decode::parse_complex(field, cfg) {
            Some(z) => {
                dest[0..4].copy_from_slice(&(z.re as f32).to_le_bytes());
                dest[4..8].copy_from_slice(&(z.im as f32).to_le_bytes());
            }
            None => return Err(ReadErrorKind::BadField),
        },
        Complex128 => match decode::parse_complex(field, cfg) {
            Some(z) => {
                dest[0..8].copy_from_slice(&z.re.to_le_bytes());
                dest[8..16].copy_from_slice(&z.im.to_le_bytes());
            }
            None => return Err(ReadErrorKind::BadField),
        },
        Str => {
            let bytes: Vec<u8> = field.iter().collect::<String>().into_bytes();
            decode::copy_bytes(dest, &bytes);
        }
        Unicode => {
            decode::copy_codepoints(dest, field);
        }
        Undetermined => {
            dest.fill(0);
        }
    }
    Ok(())
}

fn narrow_int_value(field: &[char], cfg: &ParserConfig, min: i64, max: i64) -> Result<i64, ReadErrorKind> {
    match decode::parse_i64(field, min, max) {
        Ok(x) => Ok(x),
        Err(_) if cfg.allow_float_for_int => match decode::parse_float(field, cfg) {
            Some(f) => {
                log::warn!("narrow_int_value: falling back to float-then-truncate for field that failed integer parsing");
                Ok(f as i64)
            }
            None => Err(ReadErrorKind::BadField),
        },
        Err(_) => Err(ReadErrorKind::BadField),
    }
}

fn narrow_uint_value(field: &[char], cfg: &ParserConfig, max: u64) -> Result<u64, ReadErrorKind> {
    match decode::parse_u64(field, max) {
        Ok(x) => Ok(x),
        Err(IntError::MinusSign) | Err(IntError::Invalid) | Err(IntError::Overflow) if cfg.allow_float_for_int => {
            match decode::parse_float(field, cfg) {
                Some(f) if f >= 0.0 => {
                    log::warn!("narrow_uint_value: falling back to float-then-truncate for field that failed integer parsing");
                    Ok(f as u64)
                }
                _ => Err(ReadErrorKind::BadField),
            }
        }
        Err(_) => Err(ReadErrorKind::BadField),
    }
}
