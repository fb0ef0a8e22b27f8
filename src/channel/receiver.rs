//! Consumer end of a [`TcpTransport`](crate::channel::TcpTransport) stream.

use crate::codec::{decode_message, Message};
use crate::codec::CodecError;
use crate::error::{Result, ResultExt, StreamError};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{BufReader, ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Largest message a receiver accepts by default (256 MiB)
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 256 * 1024 * 1024;

/// Reads length-prefixed messages from a layout stream publisher
pub struct StreamReceiver {
    reader: BufReader<TcpStream>,
    max_message_len: usize,
}

impl StreamReceiver {
    /// Connect to a publisher
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        })
    }

    /// Limit the size of a single message
    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    /// Bound how long `recv` may block
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Receive one raw message. Returns `None` when the publisher closed the
    /// connection between messages. A connection that ends inside the length
    /// prefix or the payload is an error.
    pub fn recv_raw(&mut self) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0u8; 4];
        match self.reader.read_exact(&mut prefix[..1]) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        match self.reader.read_exact(&mut prefix[1..]) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(StreamError::from(CodecError::Truncated)
                    .with_context("connection closed inside a length prefix"))
            }
            Err(e) => return Err(e.into()),
        }

        let len = LittleEndian::read_u32(&prefix) as usize;
        if len > self.max_message_len {
            return Err(StreamError::Channel(format!(
                "message of {} bytes exceeds limit of {}",
                len, self.max_message_len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;
        Ok(Some(payload))
    }

    /// Receive and decode one message
    pub fn recv(&mut self) -> Result<Option<Message>> {
        match self.recv_raw()? {
            Some(payload) => {
                let message = decode_message(&payload)
                    .with_context(|| format!("Failed to decode {}-byte message", payload.len()))?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    /// Collect every message up to and including the close sentinel, or
    /// until the publisher disconnects.
    pub fn collect_until_close(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv()? {
            let done = message.is_close();
            messages.push(message);
            if done {
                break;
            }
        }
        Ok(messages)
    }
}
