//! Single-subscriber TCP publisher
//!
//! The producer side only ever touches a bounded crossbeam queue. A writer
//! thread owns the listener and the subscriber socket, drains the queue and
//! writes each message with a little-endian `u32` length prefix.
//!
//! Like a pub/sub socket with no subscriber, messages that reach the writer
//! while nobody is connected are discarded. A subscriber that disconnects
//! is forgotten and the writer goes back to accepting.

use crate::channel::{DropReason, SendResult, Transport};
use crate::error::{Result, StreamError};
use byteorder::{LittleEndian, WriteBytesExt};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use std::io::{BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long the writer waits on the queue before polling for subscribers
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on a single socket write to a stalled subscriber
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP publisher transport
pub struct TcpTransport {
    tx: Option<Sender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    subscribed: Arc<AtomicBool>,
}

impl TcpTransport {
    /// Bind a listener and start the writer thread.
    ///
    /// `capacity` bounds the number of messages waiting for the writer.
    pub fn bind(addr: impl ToSocketAddrs, capacity: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = bounded(capacity);
        let subscribed = Arc::new(AtomicBool::new(false));
        let writer_flag = subscribed.clone();

        let writer = std::thread::Builder::new()
            .name("layoutstream-writer".to_string())
            .spawn(move || run_writer(listener, rx, writer_flag))
            .map_err(|e| StreamError::Channel(format!("Failed to spawn writer thread: {}", e)))?;

        tracing::info!("Publishing layout stream on {}", local_addr);

        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
            local_addr,
            subscribed,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether a subscriber is currently connected
    pub fn has_subscriber(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }

    /// Block until a subscriber connects or `timeout` elapses
    pub fn wait_for_subscriber(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.has_subscriber() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }
}

impl Transport for TcpTransport {
    fn name(&self) -> &'static str {
        "tcp"
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
        // Disconnecting the queue tells the writer to flush and exit
        self.tx = None;
        if let Some(handle) = self.writer.take() {
            if handle.join().is_err() {
                tracing::error!("Layout stream writer thread panicked");
            }
        }
        self.subscribed.store(false, Ordering::Release);
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_writer(listener: TcpListener, rx: Receiver<Vec<u8>>, subscribed: Arc<AtomicBool>) {
    let mut subscriber: Option<BufWriter<TcpStream>> = None;
    let mut discarded: u64 = 0;

    loop {
        if subscriber.is_none() {
            subscriber = accept(&listener, &subscribed);
        }

        match rx.recv_timeout(ACCEPT_POLL_INTERVAL) {
            Ok(payload) => {
                // A subscriber may have connected while we were waiting
                if subscriber.is_none() {
                    subscriber = accept(&listener, &subscribed);
                }
                let Some(stream) = subscriber.as_mut() else {
                    discarded += 1;
                    continue;
                };
                if let Err(e) = write_message(stream, &payload) {
                    tracing::warn!("Subscriber write failed, dropping subscriber: {}", e);
                    subscriber = None;
                    subscribed.store(false, Ordering::Release);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if discarded > 0 {
        tracing::debug!("{} messages discarded with no subscriber connected", discarded);
    }

    if let Some(mut stream) = subscriber {
        let _ = stream.flush();
        if let Ok(inner) = stream.into_inner() {
            let _ = inner.shutdown(Shutdown::Write);
        }
    }
    subscribed.store(false, Ordering::Release);
}

fn accept(listener: &TcpListener, subscribed: &AtomicBool) -> Option<BufWriter<TcpStream>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            if let Err(e) = configure(&stream) {
                tracing::warn!("Failed to configure subscriber socket {}: {}", peer, e);
                return None;
            }
            tracing::info!("Subscriber connected from {}", peer);
            subscribed.store(true, Ordering::Release);
            Some(BufWriter::new(stream))
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => None,
        Err(e) => {
            tracing::warn!("Accept failed: {}", e);
            None
        }
    }
}

fn configure(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))
}

fn write_message(stream: &mut BufWriter<TcpStream>, payload: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "message exceeds u32 length")
    })?;
    stream.write_u32::<LittleEndian>(len)?;
    stream.write_all(payload)?;
    stream.flush()
}
