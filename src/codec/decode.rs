use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{
    CodecError, Frame, FrameHeader, FrameKind, Message, CLOSE_SENTINEL, FRAME_MAGIC,
    FRAME_VERSION, HEADER_LEN,
};
use crate::types::{Column, ColumnType, Table};

/// Bounds-checked cursor over a wire buffer
struct WireReader<'a> {
    wire: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(wire: &'a [u8]) -> Self {
        Self { wire, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.wire.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated);
        }
        let out = &self.wire[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Take `rows * width` bytes, rejecting counts the buffer cannot hold
    /// before anything is allocated for them.
    fn block(&mut self, rows: usize, width: usize) -> Result<&'a [u8], CodecError> {
        let len = rows.checked_mul(width).ok_or(CodecError::Truncated)?;
        self.take(len)
    }
}

fn parse_header(reader: &mut WireReader<'_>) -> Result<FrameHeader, CodecError> {
    if reader.remaining() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }

    let magic = reader.take(4)?;
    if magic != FRAME_MAGIC {
        let mut m = [0u8; 4];
        m.copy_from_slice(magic);
        return Err(CodecError::InvalidMagic(m));
    }

    let version = reader.u8()?;
    if version != FRAME_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let kind = FrameKind::try_from_u8(reader.u8()?)?;
    let iteration = reader.u64()?;
    let num_rows = reader.u32()?;
    let num_columns = reader.u16()?;

    Ok(FrameHeader {
        kind,
        iteration,
        num_rows,
        num_columns,
    })
}

/// Read only the fixed header of a frame.
///
/// Lets a consumer discard stale frames by iteration without decoding the
/// column blocks.
pub fn peek_header(wire: &[u8]) -> Result<FrameHeader, CodecError> {
    parse_header(&mut WireReader::new(wire))
}

/// Decode a single framed table.
///
/// The buffer must hold exactly one frame; trailing bytes are rejected.
pub fn decode_frame(wire: &[u8]) -> Result<Frame, CodecError> {
    let mut reader = WireReader::new(wire);
    let header = parse_header(&mut reader)?;
    let rows = header.num_rows as usize;

    let mut table = Table::new();
    for _ in 0..header.num_columns {
        let name_len = reader.u16()? as usize;
        let name = std::str::from_utf8(reader.take(name_len)?)
            .map_err(|e| CodecError::Malformed(format!("column name is not utf-8: {}", e)))?
            .to_string();

        let tag = reader.u8()?;
        let column_type = ColumnType::from_tag(tag).ok_or_else(|| CodecError::UnknownColumnType {
            column: name.clone(),
            tag,
        })?;

        let column = match column_type {
            ColumnType::Int => {
                let block = reader.block(rows, 8)?;
                let mut values = vec![0i64; rows];
                LittleEndian::read_i64_into(block, &mut values);
                Column::Int(values)
            }
            ColumnType::Float32 => {
                let block = reader.block(rows, 4)?;
                let mut values = vec![0f32; rows];
                LittleEndian::read_f32_into(block, &mut values);
                Column::Float32(values)
            }
            ColumnType::Str => {
                // Every string costs at least its 4-byte length prefix
                if rows.saturating_mul(4) > reader.remaining() {
                    return Err(CodecError::Truncated);
                }
                let mut values = Vec::with_capacity(rows);
                for _ in 0..rows {
                    let len = reader.u32()? as usize;
                    let value = std::str::from_utf8(reader.take(len)?).map_err(|e| {
                        CodecError::Malformed(format!("column '{}' holds invalid utf-8: {}", name, e))
                    })?;
                    values.push(value.to_string());
                }
                Column::Str(values)
            }
        };

        table
            .push_column(name, column)
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
    }

    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    if header.num_columns == 0 {
        table
            .set_row_count(rows)
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
    }

    Ok(Frame {
        kind: header.kind,
        iteration: header.iteration,
        table,
    })
}

/// Decode any stream message: a frame or the close sentinel.
pub fn decode_message(wire: &[u8]) -> Result<Message, CodecError> {
    if wire == CLOSE_SENTINEL {
        return Ok(Message::Close);
    }
    decode_frame(wire).map(Message::Frame)
}
