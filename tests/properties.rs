//! Property-based tests covering the core invariants: integer range
//! narrowing monotonicity, type-lattice widening direction, quote
//! round-tripping, CRLF normalisation, block-store contiguity, seek
//! idempotency, and `usecols` permutation correctness.

use std::io::Cursor;

use proptest::prelude::*;
use tabread::block::{BlockStore, Sink};
use tabread::infer::{classify_field, type_for_integer_range, Classification, IntegerRange};
use tabread::schema::{FieldType, FieldTypeTable, TypeCode};
use tabread::stream::{CharStream, Fetch, FileStream};
use tabread::token::{RowBuffer, Tokenizer};
use tabread::{read_rows, ParserConfig, Request};

proptest! {
    // A type-for-range result must actually hold imin and umax: the
    // corresponding signed/unsigned bound covers the observed extremes.
    #[test]
    fn range_narrowing_holds_observed_bounds(umax in 0u64..=u64::MAX, imin in i64::MIN..=0) {
        let tc = type_for_integer_range(imin, umax);
        match tc {
            TypeCode::U8 => { prop_assert_eq!(imin, 0); prop_assert!(umax <= u8::MAX as u64); }
            TypeCode::U16 => { prop_assert_eq!(imin, 0); prop_assert!(umax <= u16::MAX as u64); }
            TypeCode::U32 => { prop_assert_eq!(imin, 0); prop_assert!(umax <= u32::MAX as u64); }
            TypeCode::U64 => { prop_assert_eq!(imin, 0); }
            TypeCode::I8 => { prop_assert!(imin >= i8::MIN as i64 && umax <= i8::MAX as u64); }
            TypeCode::I16 => { prop_assert!(imin >= i16::MIN as i64 && umax <= i16::MAX as u64); }
            TypeCode::I32 => { prop_assert!(imin >= i32::MIN as i64 && umax <= i32::MAX as u64); }
            TypeCode::I64 => { prop_assert!(umax <= i64::MAX as u64); }
            TypeCode::F64 => { prop_assert!(umax > i64::MAX as u64); }
            other => prop_assert!(false, "unexpected typecode {other:?}"),
        }
    }

    // Observing a wider range than before never narrows the resulting
    // typecode to something smaller.
    #[test]
    fn widening_range_never_narrows_typecode(a in 0i64..1000, b in 0i64..1000, u1 in 0u64..1000, u2 in 0u64..1000) {
        let mut r = IntegerRange::new();
        r.observe_signed(-a);
        r.observe_unsigned(u1);
        let t1 = type_for_integer_range(r.imin, r.umax);
        r.observe_signed(-(a + b));
        r.observe_unsigned(u1 + u2);
        let t2 = type_for_integer_range(r.imin, r.umax);
        prop_assert!(itemsize_rank(t2) >= itemsize_rank(t1));
    }

    // \r\n and lone \r both normalise to a single \n, and the stream
    // never produces a bare \r.
    #[test]
    fn crlf_normalizes_to_lf(segments in prop::collection::vec("[a-zA-Z0-9]{0,5}", 1..5)) {
        let mut input = String::new();
        for seg in &segments {
            input.push_str(seg);
            input.push_str("\r\n");
        }
        let mut s = FileStream::new(Cursor::new(input.into_bytes()));
        let mut out = String::new();
        loop {
            match s.fetch().unwrap() {
                Fetch::Eof => break,
                Fetch::Char(c) => out.push(c),
            }
        }
        prop_assert!(!out.contains('\r'));
        prop_assert_eq!(out.matches('\n').count(), segments.len());
    }

    // Every row written into a growing block store round-trips through
    // to_contiguous byte-for-byte, regardless of how many blocks it
    // spans.
    #[test]
    fn block_store_round_trips_contiguous(rows in prop::collection::vec(any::<u8>(), 1..2000)) {
        let mut store = BlockStore::new(1, 7, 2);
        for (k, &b) in rows.iter().enumerate() {
            store.get_row_mut(k)[0] = b;
        }
        let out = store.to_contiguous(rows.len());
        prop_assert_eq!(out, rows);
    }

    // A preallocated sink round-trips the same way as a growing one.
    #[test]
    fn preallocated_sink_round_trips(rows in prop::collection::vec(any::<u8>(), 1..500)) {
        let mut sink = Sink::preallocated(1, rows.len());
        for (k, &b) in rows.iter().enumerate() {
            sink.row_mut(k)[0] = b;
        }
        let out = sink.finish(rows.len());
        prop_assert_eq!(out, rows);
    }

    // seek(tell()) restores both the byte position and the line
    // counter to 1, regardless of how far into the stream it was taken.
    #[test]
    fn idempotent_seek_restores_line_number(lines in prop::collection::vec("[a-z]{0,5}", 1..10)) {
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let mut s = FileStream::new(Cursor::new(text.into_bytes()));
        let start = s.tell();
        for _ in 0..lines.len().min(3) {
            s.skip_line().unwrap();
        }
        s.seek(start).unwrap();
        prop_assert_eq!(s.line_number(), 1);
        prop_assert_eq!(s.tell(), start);
    }

    // Wrapping arbitrary text in quotes and doubling internal quote
    // characters, the tokenizer decodes it back to the original text.
    #[test]
    fn quote_round_trip_preserves_arbitrary_text(text in "[ -~]{0,30}") {
        let quoted = format!("\"{}\"", text.replace('"', "\"\""));
        let input = format!("{quoted},tail\n");
        let mut s = FileStream::new(Cursor::new(input.into_bytes()));
        let cfg = ParserConfig::default();
        let mut tok = Tokenizer::new(&mut s, cfg);
        let mut row = RowBuffer::new();
        prop_assert!(tok.next_row(&mut row).unwrap());
        let decoded: String = row.fields()[0].iter().collect();
        prop_assert_eq!(decoded, text);
    }

    // classify_field's type only ever widens along the * -> Q -> q ->
    // d -> z -> S chain as more fields of a column are observed; it
    // never falls back to a narrower type once widened.
    #[test]
    fn type_lattice_only_widens(fields in prop::collection::vec(field_value(), 1..12)) {
        let mut prev = TypeCode::Undetermined;
        for field in &fields {
            let chars: Vec<char> = field.chars().collect();
            let classification = classify_field(&chars, '.', 'E', 'j', prev);
            let new_type = match classification {
                Classification::Unsigned(_) => TypeCode::U64,
                Classification::Signed(_) => TypeCode::I64,
                Classification::Float => TypeCode::F64,
                Classification::Complex => TypeCode::Complex128,
                Classification::Blank => prev,
                Classification::String => TypeCode::Str,
            };
            prop_assert!(lattice_rank(new_type) >= lattice_rank(prev));
            prev = new_type;
        }
    }

    // A usecols permutation (including negative, end-relative indices)
    // selects and reorders exactly the requested source columns.
    #[test]
    fn usecols_permutation_selects_correct_columns(
        rows in prop::collection::vec(prop::collection::vec(0u8..250, 3), 1..8),
        perm in permutation_of_3(),
    ) {
        let mut csv = String::new();
        for row in &rows {
            csv.push_str(&row.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(","));
            csv.push('\n');
        }
        let mut s = FileStream::new(Cursor::new(csv.into_bytes()));
        let cfg = ParserConfig::default();
        let types = FieldTypeTable::from_entries(vec![FieldType::new(TypeCode::U8, 1); 3]);
        let result = read_rows(&mut s, &cfg, &types, Request::default(), Some(&perm), None).unwrap();
        for (i, row) in rows.iter().enumerate() {
            for (j, &k) in perm.iter().enumerate() {
                let src = if k < 0 { (k + 3) as usize } else { k as usize };
                prop_assert_eq!(result.data[i * 3 + j], row[src]);
            }
        }
    }
}

fn lattice_rank(tc: TypeCode) -> u32 {
    match tc {
        TypeCode::Undetermined => 0,
        TypeCode::U64 => 1,
        TypeCode::I64 => 2,
        TypeCode::F64 => 3,
        TypeCode::Complex128 => 4,
        TypeCode::Str => 5,
        other => panic!("unexpected typecode {other:?} from classify_field"),
    }
}

fn field_value() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<u16>().prop_map(|x| x.to_string()),
        any::<i16>().prop_map(|x| x.to_string()),
        (1i32..1000, 1i32..1000).prop_map(|(a, b)| format!("{a}.{b}")),
        (1i32..1000, 1i32..1000).prop_map(|(a, b)| format!("{a}+{b}j")),
        "[a-zA-Z]{1,8}",
        Just("   ".to_string()),
    ]
}

fn permutation_of_3() -> impl Strategy<Value = Vec<i64>> {
    prop_oneof![
        Just(vec![0, 1, 2]),
        Just(vec![0, 2, 1]),
        Just(vec![1, 0, 2]),
        Just(vec![1, 2, 0]),
        Just(vec![2, 0, 1]),
        Just(vec![2, 1, 0]),
        Just(vec![-3, -2, -1]),
        Just(vec![-1, -2, -3]),
    ]
}

fn itemsize_rank(tc: TypeCode) -> u32 {
    match tc {
        TypeCode::U8 | TypeCode::I8 => 1,
        TypeCode::U16 | TypeCode::I16 => 2,
        TypeCode::U32 | TypeCode::I32 => 3,
        TypeCode::U64 | TypeCode::I64 => 4,
        TypeCode::F64 => 5,
        _ => 0,
    }
}
