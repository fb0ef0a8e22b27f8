//! In-process transport over a bounded crossbeam channel.
//!
//! The consumer end is a plain [`Receiver`] of encoded messages, suitable
//! for a renderer thread in the same process or for tests.

use crate::channel::{DropReason, SendResult, Transport};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Bounded in-process message queue
pub struct InProcessTransport {
    tx: Option<Sender<Vec<u8>>>,
}

impl InProcessTransport {
    /// Create a transport and its consumer end.
    ///
    /// A `capacity` of zero makes every send a rendezvous, so messages are
    /// only delivered while the consumer is blocked in `recv`.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx: Some(tx) }, rx)
    }
}

impl Transport for InProcessTransport {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn try_send(&mut self, payload: Vec<u8>) -> SendResult {
        let Some(tx) = self.tx.as_ref() else {
            return SendResult::Dropped(DropReason::Closed);
        };
        match tx.try_send(payload) {
            Ok(()) => SendResult::Delivered,
            Err(TrySendError::Full(_)) => SendResult::Dropped(DropReason::WouldBlock),
            Err(TrySendError::Disconnected(_)) => SendResult::Dropped(DropReason::Disconnected),
        }
    }

    fn send_timeout(&mut self, payload: Vec<u8>, timeout: Duration) -> SendResult {
        let Some(tx) = self.tx.as_ref() else {
            return SendResult::Dropped(DropReason::Closed);
        };
        match tx.send_timeout(payload, timeout) {
            Ok(()) => SendResult::Delivered,
            Err(SendTimeoutError::Timeout(_)) => SendResult::Dropped(DropReason::WouldBlock),
            Err(SendTimeoutError::Disconnected(_)) => {
                SendResult::Dropped(DropReason::Disconnected)
            }
        }
    }

    fn close(&mut self) {
        // Dropping the sender lets the consumer observe disconnection once
        // it has drained what is already queued.
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_queue_drops() {
        let (mut transport, rx) = InProcessTransport::bounded(2);
        assert_eq!(transport.try_send(vec![1]), SendResult::Delivered);
        assert_eq!(transport.try_send(vec![2]), SendResult::Delivered);
        assert_eq!(
            transport.try_send(vec![3]),
            SendResult::Dropped(DropReason::WouldBlock)
        );

        assert_eq!(rx.try_recv().unwrap(), vec![1]);
        assert_eq!(transport.try_send(vec![4]), SendResult::Delivered);
        assert_eq!(rx.try_recv().unwrap(), vec![2]);
        assert_eq!(rx.try_recv().unwrap(), vec![4]);
    }

    #[test]
    fn test_disconnected_consumer() {
        let (mut transport, rx) = InProcessTransport::bounded(4);
        drop(rx);
        assert_eq!(
            transport.try_send(vec![1]),
            SendResult::Dropped(DropReason::Disconnected)
        );
    }

    #[test]
    fn test_close_disconnects_after_drain() {
        let (mut transport, rx) = InProcessTransport::bounded(4);
        transport.try_send(vec![9]);
        transport.close();
        transport.close();
        assert_eq!(rx.recv().unwrap(), vec![9]);
        assert!(rx.recv().is_err());
        assert_eq!(
            transport.try_send(vec![1]),
            SendResult::Dropped(DropReason::Closed)
        );
    }

    #[test]
    fn test_send_timeout_on_full_queue() {
        let (mut transport, _rx) = InProcessTransport::bounded(1);
        transport.try_send(vec![1]);
        assert_eq!(
            transport.send_timeout(vec![2], Duration::from_millis(5)),
            SendResult::Dropped(DropReason::WouldBlock)
        );
    }
}
