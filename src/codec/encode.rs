use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{CodecError, Frame, FrameKind, FRAME_MAGIC, FRAME_VERSION, HEADER_LEN};
use crate::types::{Column, Table};

/// Encode a frame into its canonical wire form.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, CodecError> {
    encode_table(frame.kind, frame.iteration, &frame.table)
}

/// Encode a table without building a [`Frame`] first.
pub fn encode_table(kind: FrameKind, iteration: u64, table: &Table) -> Result<Vec<u8>, CodecError> {
    let columns: Vec<(&str, &Column)> = table.columns().collect();
    encode_columns(kind, iteration, table.num_rows(), &columns)
}

/// Encode borrowed columns in the given order.
///
/// This is the hot path for node frames: static columns and fresh positions
/// are framed together without first being copied into one table.
pub fn encode_columns(
    kind: FrameKind,
    iteration: u64,
    num_rows: usize,
    columns: &[(&str, &Column)],
) -> Result<Vec<u8>, CodecError> {
    let rows = u32::try_from(num_rows)
        .map_err(|_| CodecError::TooLarge(format!("{} rows", num_rows)))?;
    let ncols = u16::try_from(columns.len())
        .map_err(|_| CodecError::TooLarge(format!("{} columns", columns.len())))?;

    let mut out = Vec::with_capacity(encoded_len(columns));

    // --- Header ---
    out.extend_from_slice(&FRAME_MAGIC);
    out.push(FRAME_VERSION);
    out.push(kind.to_u8());
    put_u64(&mut out, iteration);
    put_u32(&mut out, rows);
    put_u16(&mut out, ncols);

    // --- Columns ---
    for (name, column) in columns {
        if column.len() != num_rows {
            return Err(CodecError::Malformed(format!(
                "column '{}' has {} rows, frame has {}",
                name,
                column.len(),
                num_rows
            )));
        }
        let name_len = u16::try_from(name.len())
            .map_err(|_| CodecError::TooLarge(format!("column name of {} bytes", name.len())))?;
        put_u16(&mut out, name_len);
        out.extend_from_slice(name.as_bytes());
        out.push(column.column_type().tag());

        match column {
            Column::Int(values) => {
                let start = out.len();
                out.resize(start + values.len() * 8, 0);
                LittleEndian::write_i64_into(values, &mut out[start..]);
            }
            Column::Float32(values) => {
                let start = out.len();
                out.resize(start + values.len() * 4, 0);
                LittleEndian::write_f32_into(values, &mut out[start..]);
            }
            Column::Str(values) => {
                for value in values {
                    let len = u32::try_from(value.len()).map_err(|_| {
                        CodecError::TooLarge(format!("string of {} bytes", value.len()))
                    })?;
                    put_u32(&mut out, len);
                    out.extend_from_slice(value.as_bytes());
                }
            }
        }
    }

    Ok(out)
}

/// Exact encoded size, used to allocate the output once.
fn encoded_len(columns: &[(&str, &Column)]) -> usize {
    HEADER_LEN
        + columns
            .iter()
            .map(|(name, column)| {
                2 + name.len()
                    + 1
                    + match column {
                        Column::Int(v) => v.len() * 8,
                        Column::Float32(v) => v.len() * 4,
                        Column::Str(v) => v.iter().map(|s| 4 + s.len()).sum(),
                    }
            })
            .sum::<usize>()
}

#[inline]
fn put_u16(out: &mut Vec<u8>, v: u16) {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, v);
    out.extend_from_slice(&buf);
}

#[inline]
fn put_u32(out: &mut Vec<u8>, v: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, v);
    out.extend_from_slice(&buf);
}

#[inline]
fn put_u64(out: &mut Vec<u8>, v: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, v);
    out.extend_from_slice(&buf);
}
