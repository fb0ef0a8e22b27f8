//! Best-effort outbound stream channel
//!
//! A [`StreamChannel`] pushes encoded messages to a single downstream
//! consumer without ever blocking the producer on the consumer's pace.
//! Each transport owns a bounded outbound queue; when the queue is full the
//! message is dropped and counted instead of queued or waited on.
//!
//! # Transports
//!
//! - [`InProcessTransport`] - bounded crossbeam channel to a consumer thread
//! - [`TcpTransport`] - single-subscriber TCP publisher drained by a writer thread
//!
//! # Ordering
//!
//! Every transport is a single FIFO feeding a single ordered stream, so a
//! consumer never sees messages out of order. Drops only remove messages;
//! the ones that arrive are a subsequence of what was sent.

pub mod in_process;
pub mod receiver;
pub mod tcp;

pub use in_process::InProcessTransport;
pub use receiver::StreamReceiver;
pub use tcp::TcpTransport;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a message did not reach the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The outbound queue was full (slow or absent consumer)
    WouldBlock,
    /// The consumer side has gone away
    Disconnected,
    /// The channel was already closed
    Closed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::WouldBlock => f.write_str("would block"),
            DropReason::Disconnected => f.write_str("disconnected"),
            DropReason::Closed => f.write_str("closed"),
        }
    }
}

/// Outcome of a non-blocking send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Handed to the transport for delivery
    Delivered,
    /// Dropped without delivery
    Dropped(DropReason),
}

impl SendResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendResult::Delivered)
    }
}

/// A transport accepting whole messages into an ordered outbound stream.
///
/// `try_send` must return immediately. `close` releases the underlying
/// resource and may be called more than once.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Enqueue a message without blocking
    fn try_send(&mut self, payload: Vec<u8>) -> SendResult;

    /// Enqueue a message, waiting up to `timeout` for queue space.
    ///
    /// Only used for the final message of a session, after the layout loop
    /// has finished.
    fn send_timeout(&mut self, payload: Vec<u8>, timeout: Duration) -> SendResult;

    /// Release the transport
    fn close(&mut self);
}

/// Delivery counters for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Messages handed to the transport
    pub sent: u64,
    /// Messages dropped because the queue was full
    pub dropped: u64,
    /// Messages dropped because the consumer or channel was gone
    pub rejected: u64,
    /// Payload bytes handed to the transport
    pub bytes_sent: u64,
}

impl ChannelStats {
    /// Total send attempts
    pub fn attempts(&self) -> u64 {
        self.sent + self.dropped + self.rejected
    }

    /// Fraction of attempts that did not reach the transport
    pub fn drop_rate(&self) -> f64 {
        let total = self.attempts();
        if total == 0 {
            0.0
        } else {
            (self.dropped + self.rejected) as f64 / total as f64
        }
    }

    fn record(&mut self, result: SendResult, len: usize) {
        match result {
            SendResult::Delivered => {
                self.sent += 1;
                self.bytes_sent += len as u64;
            }
            SendResult::Dropped(DropReason::WouldBlock) => self.dropped += 1,
            SendResult::Dropped(_) => self.rejected += 1,
        }
    }
}

/// Owning handle over a transport, with drop accounting and idempotent close
pub struct StreamChannel {
    transport: Option<Box<dyn Transport>>,
    stats: ChannelStats,
}

impl StreamChannel {
    /// Wrap a transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_boxed(Box::new(transport))
    }

    pub fn from_boxed(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            stats: ChannelStats::default(),
        }
    }

    /// A channel with no transport. Sends are rejected; `close` is a no-op.
    pub fn unopened() -> Self {
        Self {
            transport: None,
            stats: ChannelStats::default(),
        }
    }

    /// In-process channel with a bounded queue; returns the consumer end
    pub fn in_process(capacity: usize) -> (Self, crossbeam_channel::Receiver<Vec<u8>>) {
        let (transport, rx) = InProcessTransport::bounded(capacity);
        (Self::new(transport), rx)
    }

    /// Non-blocking, best-effort send
    pub fn send(&mut self, payload: Vec<u8>) -> SendResult {
        let len = payload.len();
        let result = match self.transport.as_mut() {
            Some(t) => t.try_send(payload),
            None => SendResult::Dropped(DropReason::Closed),
        };
        self.stats.record(result, len);
        if let SendResult::Dropped(reason) = result {
            tracing::debug!(reason = %reason, bytes = len, "message dropped");
        }
        result
    }

    /// Send that may wait up to `timeout` for queue space
    pub fn send_final(&mut self, payload: Vec<u8>, timeout: Duration) -> SendResult {
        let len = payload.len();
        let result = match self.transport.as_mut() {
            Some(t) => t.send_timeout(payload, timeout),
            None => SendResult::Dropped(DropReason::Closed),
        };
        self.stats.record(result, len);
        if let SendResult::Dropped(reason) = result {
            tracing::warn!(reason = %reason, "final message could not be delivered");
        }
        result
    }

    /// Release the transport. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            if self.stats.dropped > 0 {
                tracing::warn!(
                    "{} channel dropped {} of {} messages due to backpressure",
                    transport.name(),
                    self.stats.dropped,
                    self.stats.attempts()
                );
            }
            tracing::debug!(transport = transport.name(), sent = self.stats.sent, "channel closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}

impl Drop for StreamChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamChannel")
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .field("stats", &self.stats)
            .finish()
    }
}
