//! Type inference (spec C4): classify one field given the type
//! classification so far for its column, and narrow an observed
//! integer range down to the smallest typecode that can hold it.
//! Ported from `examples/original_source/src/type_inference.c`.

use crate::decode::{self, IntError};
use crate::schema::TypeCode;

/// Running `[imin, umax]` bounds for a column provisionally classified
/// as an integer type. `imin` is the most negative value seen (0 if
/// none was negative); `umax` is the largest value seen, interpreted
/// as unsigned when no value was negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegerRange {
    pub imin: i64,
    pub umax: u64,
}

impl IntegerRange {
    pub fn new() -> Self {
        IntegerRange::default()
    }

    pub fn observe_unsigned(&mut self, u: u64) {
        if u > self.umax {
            self.umax = u;
        }
    }

    pub fn observe_signed(&mut self, i: i64) {
        if i < self.imin {
            self.imin = i;
        }
        if i > 0 {
            let u = i as u64;
            if u > self.umax {
                self.umax = u;
            }
        }
    }
}

/// Outcome of classifying one field: which typecode it matched, plus
/// the decoded integer value when the match was `U64`/`I64`, so the
/// caller can fold it into the column's [`IntegerRange`] without
/// re-parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Unsigned(u64),
    Signed(i64),
    Float,
    Complex,
    /// A run of only whitespace; the column's classification doesn't
    /// change (it stays `prev_type`, or `Undetermined` if this is the
    /// first field ever seen).
    Blank,
    /// Does not parse as any numeric type; the column is a string.
    String,
}

/// Classify one field's text, given `prev_type` — the typecode the
/// column has been classified as from previous rows (`Undetermined`
/// if this is the first non-blank field in the column). Mirrors the
/// cascading `switch (prev_type)` fallthrough in `classify_type`: once
/// a column has fallen back to a wider type, narrower types are never
/// retried, since they could only fail a field that already passed a
/// narrower check on an earlier row.
pub fn classify_field(field: &[char], decimal: char, sci: char, imaginary_unit: char, prev_type: TypeCode) -> Classification {
    use TypeCode::*;

    let try_uint = matches!(prev_type, Undetermined | U64 | I64);
    if try_uint {
        match decode::parse_u64(field, u64::MAX) {
            Ok(u) => return Classification::Unsigned(u),
            Err(IntError::MinusSign) => {
                if let Ok(i) = decode::parse_i64(field, i64::MIN, i64::MAX) {
                    return Classification::Signed(i);
                }
            }
            Err(_) => {}
        }
    }

    let try_float = matches!(prev_type, Undetermined | U64 | I64 | F64);
    if try_float {
        let cfg_like = FloatGrammar { decimal, sci };
        if cfg_like.parse(field).is_some() {
            return Classification::Float;
        }
    }

    let try_complex = matches!(prev_type, Undetermined | U64 | I64 | F64 | Complex128);
    if try_complex {
        let cfg_like = ComplexGrammar { decimal, sci, imaginary_unit };
        if cfg_like.parse(field).is_some() {
            return Classification::Complex;
        }
    }

    if is_blank(field) {
        return Classification::Blank;
    }

    Classification::String
}

fn is_blank(field: &[char]) -> bool {
    field.iter().all(|&c| c == ' ')
}

/// Thin wrappers so `classify_field` can reuse the decoders in
/// `decode.rs` without constructing a full `ParserConfig` (only
/// `decimal`/`sci`/`imaginary_unit` matter for classification).
struct FloatGrammar {
    decimal: char,
    sci: char,
}

impl FloatGrammar {
    fn parse(&self, field: &[char]) -> Option<f64> {
        let mut cfg = crate::config::ParserConfig::default();
        cfg.decimal = self.decimal;
        cfg.sci = self.sci;
        decode::parse_float(field, &cfg)
    }
}

struct ComplexGrammar {
    decimal: char,
    sci: char,
    imaginary_unit: char,
}

impl ComplexGrammar {
    fn parse(&self, field: &[char]) -> Option<num_complex::Complex64> {
        let mut cfg = crate::config::ParserConfig::default();
        cfg.decimal = self.decimal;
        cfg.sci = self.sci;
        cfg.imaginary_unit = self.imaginary_unit;
        decode::parse_complex(field, &cfg)
    }
}

/// Narrow an integer range to the smallest typecode that holds it.
/// Assumes `imin <= 0`; `imin == 0` means every observed value was
/// non-negative.
pub fn type_for_integer_range(imin: i64, umax: u64) -> TypeCode {
    use TypeCode::*;
    if imin == 0 {
        if umax <= u8::MAX as u64 {
            U8
        } else if umax <= u16::MAX as u64 {
            U16
        } else if umax <= u32::MAX as u64 {
            U32
        } else {
            U64
        }
    } else if imin >= i8::MIN as i64 && umax <= i8::MAX as u64 {
        I8
    } else if imin >= i16::MIN as i64 && umax <= i16::MAX as u64 {
        I16
    } else if imin >= i32::MIN as i64 && umax <= i32::MAX as u64 {
        I32
    } else if umax <= i64::MAX as u64 {
        I64
    } else {
        F64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_progression() {
        let field = |s: &str| -> Vec<char> { s.chars().collect() };
        assert_eq!(
            classify_field(&field("100"), '.', 'E', 'j', TypeCode::Undetermined),
            Classification::Unsigned(100)
        );
        assert_eq!(
            classify_field(&field("-1"), '.', 'E', 'j', TypeCode::Undetermined),
            Classification::Signed(-1)
        );
        assert_eq!(
            classify_field(&field("1.5"), '.', 'E', 'j', TypeCode::I64),
            Classification::Float
        );
        assert_eq!(
            classify_field(&field("1+2j"), '.', 'E', 'j', TypeCode::F64),
            Classification::Complex
        );
        assert_eq!(
            classify_field(&field("abc"), '.', 'E', 'j', TypeCode::Complex128),
            Classification::String
        );
    }

    #[test]
    fn blank_preserves_prev_type() {
        let field: Vec<char> = "   ".chars().collect();
        assert_eq!(
            classify_field(&field, '.', 'E', 'j', TypeCode::I64),
            Classification::Blank
        );
    }

    #[test]
    fn integer_range_narrowing() {
        assert_eq!(type_for_integer_range(0, 200), TypeCode::U8);
        assert_eq!(type_for_integer_range(0, 70000), TypeCode::U32);
        assert_eq!(type_for_integer_range(-100, 100), TypeCode::I8);
        assert_eq!(type_for_integer_range(-40000, 100), TypeCode::I32);
        assert_eq!(type_for_integer_range(i64::MIN, u64::MAX), TypeCode::F64);
    }
}
