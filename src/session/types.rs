//! Session data types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::channel::ChannelStats;
use crate::types::{COL_BUNDLE, COL_COLOR, COL_EDGE, COL_ID, COL_SIZE, COL_X, COL_Y};

/// Lifecycle state of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, static tables not yet captured, no channel
    #[default]
    Unopened,
    /// Channel acquired and static columns cached; iterations may stream
    Open,
    /// Close sentinel sent and channel released (terminal)
    Closed,
}

impl SessionState {
    /// Check if iterations may be streamed
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Check if the session has been torn down
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Unopened => "Unopened",
            SessionState::Open => "Open",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Framing options fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Node frame columns, in wire order
    pub node_col_names: Vec<String>,
    /// Edge frame columns, in wire order
    pub edge_col_names: Vec<String>,
    /// Send the edge frame with every node frame instead of once
    pub resend_edges: bool,
    /// How long teardown may wait to enqueue the close sentinel
    pub close_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            node_col_names: default_node_col_names(),
            edge_col_names: default_edge_col_names(),
            resend_edges: false,
            close_timeout: Duration::from_millis(500),
        }
    }
}

/// `id, color, size, x, y`
pub fn default_node_col_names() -> Vec<String> {
    [COL_ID, COL_COLOR, COL_SIZE, COL_X, COL_Y]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `edge, color, bundle`
pub fn default_edge_col_names() -> Vec<String> {
    [COL_EDGE, COL_COLOR, COL_BUNDLE]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// What a session did, reported at teardown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Layout iterations streamed (including those whose frame was dropped)
    pub iterations: u64,
    /// Edge frames handed to the channel
    pub edge_frames: u64,
    /// Frames skipped because they failed to encode
    pub frames_skipped: u64,
    /// Channel delivery counters
    pub channel: ChannelStats,
    /// Whether the close sentinel reached the transport
    pub sentinel_delivered: bool,
    /// When the session was opened, if it ever was
    pub opened_at: Option<chrono::DateTime<chrono::Utc>>,
    /// When the session was closed
    pub closed_at: chrono::DateTime<chrono::Utc>,
}

impl SessionSummary {
    /// Wall-clock time between open and close
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.opened_at.map(|opened| self.closed_at - opened)
    }
}
