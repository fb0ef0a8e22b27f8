//! Frame codec round trips through the public API

use layoutstream_rs::codec::{
    decode_frame, decode_message, encode_frame, peek_header, CodecError, Frame, FrameKind,
    Message, CLOSE_SENTINEL,
};
use layoutstream_rs::types::{Column, Table};

fn node_table(rows: usize) -> Table {
    Table::new()
        .with_column("id", Column::Int((0..rows as i64).collect()))
        .unwrap()
        .with_column("color", Column::Int((0..rows as i64).map(|i| i % 7).collect()))
        .unwrap()
        .with_column("size", Column::Int(vec![12; rows]))
        .unwrap()
        .with_column("x", Column::Float32((0..rows).map(|i| i as f32 * 0.5).collect()))
        .unwrap()
        .with_column("y", Column::Float32((0..rows).map(|i| -(i as f32) / 3.0).collect()))
        .unwrap()
}

#[test]
fn test_empty_frame_round_trip() {
    let frame = Frame::nodes(0, node_table(0));
    let decoded = decode_frame(&encode_frame(&frame).unwrap()).unwrap();
    assert_eq!(decoded, frame);
    assert_eq!(decoded.table.num_columns(), 5);
    assert!(decoded.table.is_empty());
}

#[test]
fn test_column_free_frame_round_trip() {
    let table = node_table(3).select::<&str>(&[]).unwrap();
    let frame = Frame::edges(7, table);
    let wire = encode_frame(&frame).unwrap();
    assert_eq!(peek_header(&wire).unwrap().num_rows, 3);

    let decoded = decode_frame(&wire).unwrap();
    assert_eq!(decoded.table.num_rows(), 3);
    assert_eq!(decoded, frame);
}

#[test]
fn test_single_row_round_trip() {
    let frame = Frame::nodes(41, node_table(1));
    let wire = encode_frame(&frame).unwrap();

    let header = peek_header(&wire).unwrap();
    assert_eq!(header.num_rows, 1);
    assert_eq!(header.iteration, 41);
    assert_eq!(decode_frame(&wire).unwrap(), frame);
}

#[test]
fn test_ten_thousand_rows_round_trip() {
    let frame = Frame::nodes(9, node_table(10_000));
    let wire = encode_frame(&frame).unwrap();
    let decoded = decode_frame(&wire).unwrap();
    assert_eq!(decoded.table.num_rows(), 10_000);
    assert_eq!(decoded, frame);
}

#[test]
fn test_float_bit_patterns_survive() {
    let specials = vec![
        0.0f32,
        -0.0,
        f32::MIN_POSITIVE / 2.0,
        f32::MAX,
        f32::NEG_INFINITY,
        f32::from_bits(0x7fc0_0001),
        f32::from_bits(0xffa0_0000),
    ];
    let table = Table::new()
        .with_column("x", Column::Float32(specials.clone()))
        .unwrap();
    let decoded = decode_frame(&encode_frame(&Frame::nodes(0, table)).unwrap()).unwrap();

    let values = decoded.table.column("x").unwrap().as_f32().unwrap();
    let bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
    let expected: Vec<u32> = specials.iter().map(|v| v.to_bits()).collect();
    assert_eq!(bits, expected);
}

#[test]
fn test_string_columns_round_trip() {
    let table = Table::new()
        .with_column("edge", Column::Str(vec!["a->b".into(), String::new(), "ü→ß".into()]))
        .unwrap()
        .with_column("bundle", Column::Int(vec![1, 1, 2]))
        .unwrap()
        .with_column("color", Column::Str(vec!["red".into(), "red".into(), "blue".into()]))
        .unwrap();
    let frame = Frame::edges(0, table);
    assert_eq!(decode_frame(&encode_frame(&frame).unwrap()).unwrap(), frame);
}

#[test]
fn test_encoding_is_deterministic() {
    let frame = Frame::edges(3, node_table(50));
    assert_eq!(encode_frame(&frame).unwrap(), encode_frame(&frame.clone()).unwrap());
}

#[test]
fn test_sentinel_is_distinct_from_frames() {
    assert_eq!(decode_message(CLOSE_SENTINEL).unwrap(), Message::Close);
    assert!(decode_frame(CLOSE_SENTINEL).is_err());

    let wire = encode_frame(&Frame::nodes(0, node_table(0))).unwrap();
    assert_ne!(wire.as_slice(), CLOSE_SENTINEL);
    assert!(matches!(decode_message(&wire), Ok(Message::Frame(_))));
}

#[test]
fn test_malformed_input_is_rejected() {
    let wire = encode_frame(&Frame::nodes(5, node_table(20))).unwrap();

    assert_eq!(decode_frame(&wire[..wire.len() - 1]), Err(CodecError::Truncated));
    assert!(matches!(decode_frame(&wire[..10]), Err(CodecError::Truncated)));

    let mut trailing = wire.clone();
    trailing.push(0);
    assert_eq!(decode_frame(&trailing), Err(CodecError::TrailingBytes(1)));

    let mut bad_magic = wire.clone();
    bad_magic[0] = b'X';
    assert!(matches!(decode_frame(&bad_magic), Err(CodecError::InvalidMagic(_))));

    assert!(decode_message(b"").is_err());
    assert!(decode_message(b"closed").is_err());
}

#[test]
fn test_frame_kind_is_preserved() {
    for kind in [FrameKind::Nodes, FrameKind::Edges] {
        let frame = Frame {
            kind,
            iteration: 1,
            table: node_table(2),
        };
        assert_eq!(decode_frame(&encode_frame(&frame).unwrap()).unwrap().kind, kind);
    }
}
