//! End-to-end scenarios run through the public `analyze`/`read_rows`
//! pair, mirroring the documented example datasets for the grammar's
//! notable corners: integer narrowing, mixed columns, quoting,
//! whitespace delimiting, comments/skiprows, and complex numbers.

use std::io::Cursor;

use tabread::{analyze, read_rows, FileStream, ParserConfig, Request, TypeCode};

fn streams(input: &str) -> (FileStream<Cursor<Vec<u8>>>, FileStream<Cursor<Vec<u8>>>) {
    (
        FileStream::new(Cursor::new(input.as_bytes().to_vec())),
        FileStream::new(Cursor::new(input.as_bytes().to_vec())),
    )
}

#[test]
fn s1_integer_narrowing() {
    let (mut a, mut b) = streams("1,2\n3,4\n");
    let cfg = ParserConfig::default();
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    assert_eq!(types.get(0).unwrap().typecode, TypeCode::U8);
    assert_eq!(types.get(1).unwrap().typecode, TypeCode::U8);

    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 2);
    assert_eq!(result.num_cols, 2);
    assert_eq!(result.data, vec![1u8, 2, 3, 4]);
}

#[test]
fn s2_mixed_types() {
    let (mut a, mut b) = streams("1,2.5\n-3,4.0\n");
    let cfg = ParserConfig::default();
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    assert_eq!(types.get(0).unwrap().typecode, TypeCode::I8);
    assert_eq!(types.get(1).unwrap().typecode, TypeCode::F64);

    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 2);
    assert_eq!(result.data[0] as i8, 1);
    assert_eq!(result.data[1] as i8, -3);
    let col1 = |row: usize| {
        let off = row * result.row_size + 1;
        f64::from_le_bytes(result.data[off..off + 8].try_into().unwrap())
    };
    assert_eq!(col1(0), 2.5);
    assert_eq!(col1(1), 4.0);
}

#[test]
fn s3_quoted_fields_with_commas_and_embedded_newline() {
    let input = "12.3,\"New York, NY\",\"3'2\"\"\"\n";
    let (mut a, mut b) = streams(input);
    let cfg = ParserConfig::default();
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    assert_eq!(types.get(0).unwrap().typecode, TypeCode::F64);
    assert_eq!(types.get(1).unwrap().typecode, TypeCode::Str);
    assert_eq!(types.get(1).unwrap().itemsize, 12);
    assert_eq!(types.get(2).unwrap().typecode, TypeCode::Str);
    assert_eq!(types.get(2).unwrap().itemsize, 4);

    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 1);
    let field1 = &result.data[8..8 + 12];
    assert_eq!(field1, b"New York, NY");
    let field2_off = 8 + 12;
    let field2 = &result.data[field2_off..field2_off + 4];
    assert_eq!(&field2[..3], b"3'2");
    assert_eq!(field2[3], b'"');
}

#[test]
fn s4_whitespace_delimiter_blank_line_skip() {
    let input = "  1  2  3\n\n 4 5 6\n";
    let (mut a, mut b) = streams(input);
    let mut cfg = ParserConfig::default();
    cfg.delimiter = ' ';
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    assert_eq!(types.len(), 3);

    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 2);
    assert_eq!(result.data, vec![1u8, 2, 3, 4, 5, 6]);
}

#[test]
fn s5_comment_and_skiprows() {
    let input = "# header\n1,2\n# mid\n3,4\n";
    let (mut a, mut b) = streams(input);
    let cfg = ParserConfig::default();
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 2);
    assert_eq!(result.data, vec![1u8, 2, 3, 4]);
}

#[test]
fn s6_complex_parsing() {
    let input = "1+2j\n-3.0-4.5j\n(5j)\n";
    let (mut a, mut b) = streams(input);
    let cfg = ParserConfig::default();
    let types = analyze(&mut a, &cfg, Request::default()).unwrap();
    assert_eq!(types.get(0).unwrap().typecode, TypeCode::Complex128);

    let result = read_rows(&mut b, &cfg, &types, Request::default(), None, None).unwrap();
    assert_eq!(result.num_rows, 3);
    let at = |row: usize| {
        let off = row * result.row_size;
        let re = f64::from_le_bytes(result.data[off..off + 8].try_into().unwrap());
        let im = f64::from_le_bytes(result.data[off + 8..off + 16].try_into().unwrap());
        (re, im)
    };
    assert_eq!(at(0), (1.0, 2.0));
    assert_eq!(at(1), (-3.0, -4.5));
    assert_eq!(at(2), (0.0, 5.0));
}

#[test]
fn skiprows_and_row_limit_combine() {
    let input = "skip-me\n1,2\n3,4\n5,6\n";
    let (mut a, mut b) = streams(input);
    let cfg = ParserConfig::default();
    let request = Request { limit: None, skiprows: 1 };
    let types = analyze(&mut a, &cfg, request).unwrap();
    let capped = Request { limit: Some(2), skiprows: 1 };
    let result = read_rows(&mut b, &cfg, &types, capped, None, None).unwrap();
    assert_eq!(result.num_rows, 2);
    assert_eq!(result.data, vec![1u8, 2, 3, 4]);
}
