//! Streaming session lifecycle
//!
//! A [`Session`] owns the channel and the per-iteration framing state for one
//! layout run. It moves through `Unopened -> Open -> Closed`; teardown sends
//! the close sentinel exactly once and releases the channel.

pub mod lifecycle;
pub mod types;

pub use lifecycle::Session;
pub use types::{
    default_edge_col_names, default_node_col_names, SessionOptions, SessionState, SessionSummary,
};
