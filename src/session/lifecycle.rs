//! Session state machine
//!
//! `Unopened -> Open -> Closed`. Opening captures the static tables and takes
//! ownership of a channel; teardown sends the close sentinel once and releases
//! the channel. `Closed` is terminal.

use crate::callback::LayoutCallback;
use crate::channel::{ChannelStats, SendResult, StreamChannel};
use crate::codec::CLOSE_SENTINEL;
use crate::error::{Result, StreamError};
use crate::layout::IterationCallback;
use crate::mapper::{DefaultMapper, PositionBuffer, PositionMapper};
use crate::session::types::{SessionOptions, SessionState, SessionSummary};
use crate::types::{EdgeTable, ShapedGraph};
use chrono::{DateTime, Utc};

/// One streaming run of a layout
pub struct Session<M = DefaultMapper> {
    state: SessionState,
    options: SessionOptions,
    callback: Option<LayoutCallback<M>>,
    channel: StreamChannel,
    opened_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
}

impl<M: PositionMapper> Session<M> {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            state: SessionState::Unopened,
            options,
            callback: None,
            channel: StreamChannel::unopened(),
            opened_at: None,
            summary: None,
        }
    }

    /// Capture the static tables and take ownership of `channel`
    pub fn open(&mut self, graph: &ShapedGraph, mapper: M, channel: StreamChannel) -> Result<()> {
        if self.state != SessionState::Unopened {
            return Err(StreamError::InvalidState {
                operation: "open a session",
                state: self.state,
            });
        }

        let callback = LayoutCallback::new(mapper, graph, &self.options)?;
        self.callback = Some(callback);
        self.channel = channel;
        self.opened_at = Some(Utc::now());
        self.state = SessionState::Open;

        tracing::info!(
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "Layout stream session opened"
        );
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Iterations streamed so far
    pub fn iteration(&self) -> u64 {
        self.callback.as_ref().map_or(0, |cb| cb.iteration())
    }

    pub fn channel_stats(&self) -> ChannelStats {
        self.channel.stats()
    }

    /// Summary recorded at teardown
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Send an out-of-band payload on the session's channel
    pub fn update(&mut self, msg: Vec<u8>) -> Result<SendResult> {
        match (self.state, self.callback.as_ref()) {
            (SessionState::Open, Some(callback)) => Ok(callback.update(msg, &mut self.channel)),
            (state, _) => Err(StreamError::InvalidState {
                operation: "send an update",
                state,
            }),
        }
    }

    /// Queue a new edge table, sent before the next node frame
    pub fn refresh_edges(&mut self, edges: EdgeTable) -> Result<()> {
        self.open_callback("refresh edges")?.refresh_edges(edges)
    }

    /// Send the close sentinel (if open) and release the channel.
    ///
    /// Idempotent: later calls return the summary of the first.
    pub fn teardown(&mut self) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let sentinel_delivered = match self.state {
            SessionState::Open => self
                .channel
                .send_final(CLOSE_SENTINEL.to_vec(), self.options.close_timeout)
                .is_delivered(),
            _ => false,
        };
        self.channel.close();
        self.state = SessionState::Closed;

        let summary = SessionSummary {
            iterations: self.iteration(),
            edge_frames: self.callback.as_ref().map_or(0, |cb| cb.edge_frames()),
            frames_skipped: self.callback.as_ref().map_or(0, |cb| cb.frames_skipped()),
            channel: self.channel.stats(),
            sentinel_delivered,
            opened_at: self.opened_at,
            closed_at: Utc::now(),
        };

        tracing::info!(
            iterations = summary.iterations,
            sent = summary.channel.sent,
            dropped = summary.channel.dropped,
            skipped = summary.frames_skipped,
            "Layout stream session closed"
        );

        self.summary = Some(summary.clone());
        summary
    }

    fn open_callback(&mut self, operation: &'static str) -> Result<&mut LayoutCallback<M>> {
        match (self.state, self.callback.as_mut()) {
            (SessionState::Open, Some(callback)) => Ok(callback),
            (state, _) => Err(StreamError::InvalidState { operation, state }),
        }
    }
}

impl<M: PositionMapper> IterationCallback for Session<M> {
    fn on_iteration(&mut self, positions: PositionBuffer<'_>) -> Result<()> {
        let callback = match (self.state, self.callback.as_mut()) {
            (SessionState::Open, Some(callback)) => callback,
            (state, _) => {
                return Err(StreamError::InvalidState {
                    operation: "stream an iteration",
                    state,
                })
            }
        };
        callback.invoke(&positions, &mut self.channel)
    }

    fn on_close(&mut self) -> Result<()> {
        self.teardown();
        Ok(())
    }
}

impl<M> Drop for Session<M> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            tracing::warn!("Session dropped while open; channel closed without a close sentinel");
        }
    }
}
