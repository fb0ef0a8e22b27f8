//! Transport helpers for exercising drop behaviour

use crossbeam_channel::{unbounded, Receiver, Sender};
use layoutstream_rs::channel::{DropReason, SendResult, Transport};
use std::time::Duration;

/// Transport that rejects every other `try_send` as if its queue were full
pub struct AlternatingTransport {
    tx: Option<Sender<Vec<u8>>>,
    attempts: u64,
}

impl AlternatingTransport {
    /// The first attempt is accepted, the second rejected, and so on
    pub fn new() -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx), attempts: 0 }, rx)
    }
}

impl Transport for AlternatingTransport {
    fn name(&self) -> &'static str {
        "alternating"
    }

    fn try_send(&mut self, payload: Vec<u8>) -> SendResult {
        self.attempts += 1;
        if self.attempts % 2 == 0 {
            return SendResult::Dropped(DropReason::WouldBlock);
        }
        self.send_timeout(payload, Duration::ZERO)
    }

    fn send_timeout(&mut self, payload: Vec<u8>, _timeout: Duration) -> SendResult {
        match self.tx.as_ref().map(|tx| tx.send(payload)) {
            Some(Ok(())) => SendResult::Delivered,
            Some(Err(_)) => SendResult::Dropped(DropReason::Disconnected),
            None => SendResult::Dropped(DropReason::Closed),
        }
    }

    fn close(&mut self) {
        self.tx = None;
    }
}
