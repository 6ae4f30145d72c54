//! Value decoders (spec C2): float, signed/unsigned integer, complex,
//! and fixed-width string copies.
//!
//! The float/complex algorithm is ported from
//! `examples/original_source/src/str_to_double.c` (accumulate up to
//! 19 significant digits, scale by a `10^k` table, `k` in `0..=308`).
//! Where the configured grammar matches the ASCII default
//! (`decimal == '.'`, `sci` one of `e`/`E`), [`fast_float`] is used as
//! a SIMD-friendly fast path — the same crate and the same
//! fast-path-over-manual-parse shape the teacher uses in
//! `io/fast_numeric.rs` and `io/text.rs`.

use std::sync::OnceLock;

use num_complex::Complex64;

use crate::config::ParserConfig;

/// `POW10[k] == 10f64.powi(k)` for `k` in `0..=308`.
fn pow10_table() -> &'static [f64; 309] {
    static TABLE: OnceLock<[f64; 309]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0_f64; 309];
        let mut value = 1.0_f64;
        for (k, slot) in table.iter_mut().enumerate() {
            *slot = value;
            value *= 10.0;
            let _ = k;
        }
        table
    })
}

/// Parse as much of a leading float as possible, returning the value
/// and the number of codepoints consumed (not counting skipped
/// trailing whitespace unless `skip_trailing` is set). Returns `None`
/// if no digit is found anywhere (no leading zero, no digit run).
fn parse_float_prefix(word: &[char], decimal: char, sci: char, skip_trailing: bool) -> Option<(f64, usize)> {
    let sci_upper = sci.to_ascii_uppercase();
    let mut i = 0usize;
    let n = word.len();

    while i < n && word[i].is_whitespace() {
        i += 1;
    }

    let negative = i < n && word[i] == '-';
    if negative || (i < n && word[i] == '+') {
        i += 1;
    }

    let mut has_leading_zero = false;
    if i < n && word[i] == '0' {
        i += 1;
        has_leading_zero = true;
        while i < n && word[i] == '0' {
            i += 1;
        }
    }

    let mut value = 0.0_f64;
    let mut num_digits = 0i32;
    let mut num_decimals = 0i32;

    while i < n && word[i].is_ascii_digit() {
        if num_digits < 19 {
            value = value * 10.0 + (word[i] as u8 - b'0') as f64;
            num_digits += 1;
        }
        i += 1;
    }

    if i < n && word[i] == decimal {
        i += 1;
        while i < n && word[i].is_ascii_digit() {
            if num_digits < 19 {
                value = value * 10.0 + (word[i] as u8 - b'0') as f64;
                num_digits += 1;
                num_decimals += 1;
            }
            i += 1;
        }
    }

    if num_digits == 0 && !has_leading_zero {
        return None;
    }

    if negative {
        value = -value;
    }

    let mut exp = 0i64;
    if i < n && word[i].to_ascii_uppercase() == sci_upper {
        let mut j = i + 1;
        let exp_negative = j < n && word[j] == '-';
        if exp_negative || (j < n && word[j] == '+') {
            j += 1;
        }
        while j < n && word[j] == '0' {
            j += 1;
        }
        let mut e = 0i64;
        while j < n && word[j].is_ascii_digit() {
            e = e * 10 + (word[j] as u8 - b'0') as i64;
            j += 1;
        }
        exp = if exp_negative { -e } else { e };
        i = j;
    }

    exp -= num_decimals as i64;

    let table = pow10_table();
    if exp < -308 {
        exp += (num_digits - 1) as i64;
        let mut m = (num_digits - 1) as i64;
        if exp < -308 {
            exp += 16;
            m += 16;
        }
        let idx = m.clamp(0, 308) as usize;
        value /= table[idx];
    }

    if exp < 0 {
        if -exp >= table.len() as i64 {
            value = if negative { -0.0 } else { 0.0 };
        } else {
            value /= table[(-exp) as usize];
        }
    } else if exp >= table.len() as i64 {
        value = if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    } else {
        value *= table[exp as usize];
    }

    if skip_trailing {
        while i < n && word[i].is_whitespace() {
            i += 1;
        }
    }

    Some((value, i))
}

/// Parse a field as `f64`. Must consume the entire (trimmed) field to
/// succeed; `None` on failure. Uses `fast_float` when the grammar is
/// the ASCII default, otherwise the manual scanner above.
pub fn parse_float(word: &[char], cfg: &ParserConfig) -> Option<f64> {
    if cfg.decimal == '.' && (cfg.sci == 'e' || cfg.sci == 'E') {
        if let Ok(s) = char_slice_to_ascii_string(word) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                if let Ok(v) = fast_float::parse::<f64, _>(trimmed) {
                    return Some(v);
                }
            }
        }
    }
    let (value, consumed) = parse_float_prefix(word, cfg.decimal, cfg.sci, true)?;
    if consumed == word.len() {
        Some(value)
    } else {
        None
    }
}

/// Cheap ASCII-only conversion used to feed `fast_float`, which wants
/// a `&str`. Falls back to the manual path (via `Err`) whenever the
/// field contains anything outside ASCII, since `fast_float` has no
/// use for non-ASCII numerals anyway.
fn char_slice_to_ascii_string(word: &[char]) -> Result<String, ()> {
    let mut s = String::with_capacity(word.len());
    for &c in word {
        if !c.is_ascii() {
            return Err(());
        }
        s.push(c);
    }
    Ok(s)
}

/// Parse a field as a complex number: `a`, `aj`, `a+bj`, `a-bj`, or
/// `bj` (pure imaginary), with optional surrounding parentheses.
/// Ported from `examples/original_source/src/conversions.c::to_complex`,
/// generalised to a configurable imaginary-unit letter and the
/// parenthesised form used in spec scenario S6.
pub fn parse_complex(word: &[char], cfg: &ParserConfig) -> Option<Complex64> {
    let mut trimmed = trim_ws(word);
    if let Some(inner) = strip_parens(trimmed) {
        trimmed = inner;
    }
    let unit = cfg.imaginary_unit;

    let (real, mut i) = parse_float_prefix(trimmed, cfg.decimal, cfg.sci, false)?;
    if i == trimmed.len() {
        return Some(Complex64::new(real, 0.0));
    }
    if trimmed[i] == unit {
        i += 1;
        while i < trimmed.len() && trimmed[i] == ' ' {
            i += 1;
        }
        return if i == trimmed.len() {
            Some(Complex64::new(0.0, real))
        } else {
            None
        };
    }
    if trimmed[i] == '+' {
        i += 1;
    }
    let (imag, mut j) = parse_float_prefix(&trimmed[i..], cfg.decimal, cfg.sci, false)?;
    if j >= trimmed[i..].len() || trimmed[i + j] != unit {
        return None;
    }
    j += i + 1;
    while j < trimmed.len() && trimmed[j] == ' ' {
        j += 1;
    }
    if j == trimmed.len() {
        Some(Complex64::new(real, imag))
    } else {
        None
    }
}

fn trim_ws(word: &[char]) -> &[char] {
    let mut start = 0;
    let mut end = word.len();
    while start < end && word[start].is_whitespace() {
        start += 1;
    }
    while end > start && word[end - 1].is_whitespace() {
        end -= 1;
    }
    &word[start..end]
}

fn strip_parens(word: &[char]) -> Option<&[char]> {
    if word.len() >= 2 && word[0] == '(' && word[word.len() - 1] == ')' {
        Some(&word[1..word.len() - 1])
    } else {
        None
    }
}

/// Failure modes for the integer decoders (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntError {
    Invalid,
    Overflow,
    /// A negative sign was found while parsing as unsigned; callers
    /// use this to decide whether to retry as signed.
    MinusSign,
}

/// `str_to_uint64`: base-10 only, leading `+`, no sign other than
/// that, rejects as soon as a digit would push the value past `max`.
pub fn parse_u64(word: &[char], max: u64) -> Result<u64, IntError> {
    let mut i = 0;
    let n = word.len();
    while i < n && word[i].is_whitespace() {
        i += 1;
    }
    if i < n && word[i] == '-' {
        return Err(IntError::MinusSign);
    }
    if i < n && word[i] == '+' {
        i += 1;
    }
    let start_digits = i;
    let mut value: u64 = 0;
    while i < n && word[i].is_ascii_digit() {
        let d = (word[i] as u8 - b'0') as u64;
        value = value.checked_mul(10).and_then(|v| v.checked_add(d)).ok_or(IntError::Overflow)?;
        if value > max {
            return Err(IntError::Overflow);
        }
        i += 1;
    }
    if i == start_digits {
        return Err(IntError::Invalid);
    }
    while i < n && word[i].is_whitespace() {
        i += 1;
    }
    if i != n {
        return Err(IntError::Invalid);
    }
    Ok(value)
}

/// `str_to_int64`: base-10 only, leading `+`/`-`, rejects as soon as a
/// digit would push the magnitude past the bound implied by `min`/`max`.
pub fn parse_i64(word: &[char], min: i64, max: i64) -> Result<i64, IntError> {
    let mut i = 0;
    let n = word.len();
    while i < n && word[i].is_whitespace() {
        i += 1;
    }
    let negative = i < n && word[i] == '-';
    if negative || (i < n && word[i] == '+') {
        i += 1;
    }
    let start_digits = i;
    let bound: u64 = if negative {
        min.unsigned_abs()
    } else {
        max as u64
    };
    let mut magnitude: u64 = 0;
    while i < n && word[i].is_ascii_digit() {
        let d = (word[i] as u8 - b'0') as u64;
        magnitude = magnitude
            .checked_mul(10)
            .and_then(|v| v.checked_add(d))
            .ok_or(IntError::Overflow)?;
        if magnitude > bound {
            return Err(IntError::Overflow);
        }
        i += 1;
    }
    if i == start_digits {
        return Err(IntError::Invalid);
    }
    while i < n && word[i].is_whitespace() {
        i += 1;
    }
    if i != n {
        return Err(IntError::Invalid);
    }
    let value = if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    Ok(value)
}

/// Copy a decoded string into a NUL-padded fixed-width byte field.
/// Overlong input is truncated to `itemsize` bytes.
pub fn copy_bytes(dest: &mut [u8], src: &[u8]) {
    dest.fill(0);
    let len = src.len().min(dest.len());
    dest[..len].copy_from_slice(&src[..len]);
}

/// Copy a decoded string into a NUL-padded fixed-width codepoint
/// field (4 bytes per codepoint, little-endian `u32`). Overlong input
/// is truncated to `dest.len() / 4` codepoints.
pub fn copy_codepoints(dest: &mut [u8], src: &[char]) {
    dest.fill(0);
    let capacity = dest.len() / 4;
    for (i, &c) in src.iter().take(capacity).enumerate() {
        let bytes = (c as u32).to_le_bytes();
        dest[i * 4..i * 4 + 4].copy_from_slice(&bytes);
    }
}
