//! Conversion boundary between a layout backend's position buffer and the
//! typed float32 position table the stream frames.
//!
//! The streaming core never assumes where positions were computed. A layout
//! hands over a [`PositionBuffer`] borrowing its native dense matrix, and a
//! caller-supplied [`PositionMapper`] turns it into a [`PositionTable`].

use crate::error::{Result, StreamError};
use crate::types::PositionTable;

/// Borrowed two-column position matrix, one row per node
#[derive(Debug, Clone, Copy)]
pub enum PositionBuffer<'a> {
    /// Interleaved `[x0, y0, x1, y1, ...]`
    RowMajorF32(&'a [f32]),
    /// Interleaved double precision, narrowed to float32 when mapped
    RowMajorF64(&'a [f64]),
    /// Separate coordinate columns
    Columnar { x: &'a [f32], y: &'a [f32] },
}

impl PositionBuffer<'_> {
    /// Number of node rows in the buffer
    pub fn rows(&self) -> Result<usize> {
        match self {
            PositionBuffer::RowMajorF32(data) => interleaved_rows(data.len()),
            PositionBuffer::RowMajorF64(data) => interleaved_rows(data.len()),
            PositionBuffer::Columnar { x, y } => {
                if x.len() != y.len() {
                    return Err(StreamError::schema(format!(
                        "position columns differ in length: x has {}, y has {}",
                        x.len(),
                        y.len()
                    )));
                }
                Ok(x.len())
            }
        }
    }
}

fn interleaved_rows(len: usize) -> Result<usize> {
    if len % 2 != 0 {
        return Err(StreamError::schema(format!(
            "position matrix must have 2 columns, got {} values",
            len
        )));
    }
    Ok(len / 2)
}

/// Turns a backend position buffer into a float32 position table
pub trait PositionMapper {
    fn map_positions(&self, raw: &PositionBuffer<'_>) -> Result<PositionTable>;
}

/// Maps every [`PositionBuffer`] layout, narrowing f64 to f32
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMapper;

impl PositionMapper for DefaultMapper {
    fn map_positions(&self, raw: &PositionBuffer<'_>) -> Result<PositionTable> {
        let rows = raw.rows()?;
        let table = match *raw {
            PositionBuffer::RowMajorF32(data) => PositionTable {
                x: data.iter().step_by(2).copied().collect(),
                y: data.iter().skip(1).step_by(2).copied().collect(),
            },
            PositionBuffer::RowMajorF64(data) => PositionTable {
                x: data.iter().step_by(2).map(|&v| v as f32).collect(),
                y: data.iter().skip(1).step_by(2).map(|&v| v as f32).collect(),
            },
            PositionBuffer::Columnar { x, y } => PositionTable {
                x: x.to_vec(),
                y: y.to_vec(),
            },
        };
        debug_assert_eq!(table.len(), rows);
        Ok(table)
    }
}

/// Adapter turning a closure into a [`PositionMapper`]
pub struct FnMapper<F>(F);

/// Wrap a closure as a [`PositionMapper`]
pub fn mapper_fn<F>(f: F) -> FnMapper<F>
where
    F: for<'a, 'b> Fn(&'a PositionBuffer<'b>) -> Result<PositionTable>,
{
    FnMapper(f)
}

impl<F> PositionMapper for FnMapper<F>
where
    F: for<'a, 'b> Fn(&'a PositionBuffer<'b>) -> Result<PositionTable>,
{
    fn map_positions(&self, raw: &PositionBuffer<'_>) -> Result<PositionTable> {
        (self.0)(raw)
    }
}
