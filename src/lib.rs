//! # layoutstream-rs: live graph layout streaming
//!
//! Streams the evolving node positions of an iterative graph layout to a
//! remote renderer while the layout runs. Each iteration's positions are
//! joined with static node attributes, framed as a compact self-describing
//! columnar message and pushed over a bounded, non-blocking channel. A slow or
//! absent consumer causes frames to be dropped; the layout loop never waits.
//!
//! ## Architecture
//!
//! - **Codec**: columnar binary frames with names, types and row counts
//! - **Channel**: best-effort transports (in-process queue or TCP publisher)
//! - **Callback**: per-iteration framing of positions plus static columns
//! - **Session**: `Unopened -> Open -> Closed`, close sentinel on teardown
//!
//! ## Wire protocol
//!
//! `[edge frame]? [node frame]* [close sentinel]`, one blob per message.
//! Over TCP every blob carries a little-endian `u32` length prefix.
//!
//! ## Example
//!
//! ```ignore
//! use layoutstream_rs::{
//!     channel::StreamChannel, datasets::DatasetConfig, layout::{stream_layout, JitterLayout},
//!     mapper::DefaultMapper, session::{Session, SessionOptions},
//! };
//!
//! let graph = DatasetConfig::default().build()?;
//! let (channel, frames) = StreamChannel::in_process(64);
//!
//! let mut session = Session::new(SessionOptions::default());
//! session.open(&graph, DefaultMapper, channel)?;
//! let summary = stream_layout(&mut session, &mut JitterLayout::default(), &graph, 100)?;
//! ```

pub mod callback;
pub mod channel;
pub mod codec;
pub mod config;
pub mod datasets;
pub mod error;
pub mod layout;
pub mod mapper;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use callback::LayoutCallback;
pub use channel::{ChannelStats, SendResult, StreamChannel, Transport};
pub use codec::{decode_message, encode_frame, Frame, FrameKind, Message, CLOSE_SENTINEL};
pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use layout::{stream_layout, IterationCallback, JitterLayout, LayoutAlgorithm};
pub use mapper::{DefaultMapper, PositionBuffer, PositionMapper};
pub use session::{Session, SessionOptions, SessionState, SessionSummary};
pub use types::{Category, Column, EdgeTable, NodeTable, ShapedGraph, Table};
