//! Wire framing for layout snapshots.
//!
//! Every message on a stream is one self-describing binary blob: either a
//! framed table (node positions or static edges) or the reserved close
//! sentinel. A frame carries its own column names, column types and row
//! count, so a consumer needs no schema registry to decode it.
//!
//! # Frame Layout
//!
//! All integers are little-endian.
//!
//! ```text
//! [ magic "GLSF" (4) ]
//! [ version (1) ]
//! [ kind (1) ]            1 = nodes, 2 = edges
//! [ iteration (8) ]
//! [ num_rows (4) ]
//! [ num_columns (2) ]
//! per column:
//!   [ name_len (2) ][ name (utf-8) ]
//!   [ type tag (1) ]      1 = int64, 2 = float32, 3 = string
//!   [ values ]            int64: 8 * rows, float32: 4 * rows (raw bits),
//!                         string: per row [ len (4) ][ bytes ]
//! ```
//!
//! Numeric columns are written and read as whole blocks; no per-row
//! dispatch happens for them.

pub mod decode;
pub mod encode;

pub use decode::{decode_frame, decode_message, peek_header};
pub use encode::{encode_columns, encode_frame, encode_table};

use crate::types::Table;
use std::fmt;
use thiserror::Error;

/// Leading bytes of every framed table
pub const FRAME_MAGIC: [u8; 4] = *b"GLSF";

/// Current wire format version
pub const FRAME_VERSION: u8 = 1;

/// Reserved end-of-stream message. It is shorter than a frame header and
/// does not start with [`FRAME_MAGIC`], so no valid frame can equal it.
pub const CLOSE_SENTINEL: &[u8] = b"close";

/// Fixed-size frame header length in bytes
pub const HEADER_LEN: usize = 4 // magic
    + 1 // version
    + 1 // kind
    + 8 // iteration
    + 4 // num_rows
    + 2; // num_columns

/// What a frame's table describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Per-iteration node rows (static node columns joined with positions)
    Nodes,
    /// Static edge rows, normally sent once per session
    Edges,
}

impl FrameKind {
    pub fn to_u8(self) -> u8 {
        match self {
            FrameKind::Nodes => 1,
            FrameKind::Edges => 2,
        }
    }

    pub fn try_from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            1 => Ok(FrameKind::Nodes),
            2 => Ok(FrameKind::Edges),
            other => Err(CodecError::InvalidFrameKind(other)),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Nodes => f.write_str("nodes"),
            FrameKind::Edges => f.write_str("edges"),
        }
    }
}

/// Decoded fixed header of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub iteration: u64,
    pub num_rows: u32,
    pub num_columns: u16,
}

/// A framed table
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Layout iteration the frame belongs to
    pub iteration: u64,
    pub table: Table,
}

impl Frame {
    pub fn nodes(iteration: u64, table: Table) -> Self {
        Self {
            kind: FrameKind::Nodes,
            iteration,
            table,
        }
    }

    pub fn edges(iteration: u64, table: Table) -> Self {
        Self {
            kind: FrameKind::Edges,
            iteration,
            table,
        }
    }
}

/// One decoded stream message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Frame(Frame),
    /// The producer closed the session
    Close,
}

impl Message {
    pub fn is_close(&self) -> bool {
        matches!(self, Message::Close)
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Message::Frame(f) => Some(f),
            Message::Close => None,
        }
    }
}

/// Errors raised while encoding or decoding a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid frame magic: {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    #[error("invalid frame kind: {0}")]
    InvalidFrameKind(u8),

    #[error("column '{column}' has unknown type tag {tag}")]
    UnknownColumnType { column: String, tag: u8 },

    #[error("truncated frame")]
    Truncated,

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame too large: {0}")]
    TooLarge(String),
}
