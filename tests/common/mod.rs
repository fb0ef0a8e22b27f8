//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use layoutstream_rs::codec::{decode_message, FrameKind, Message};

/// Decode every raw message, panicking on malformed input
pub fn decode_all(raw: impl IntoIterator<Item = Vec<u8>>) -> Vec<Message> {
    raw.into_iter()
        .map(|m| decode_message(&m).expect("stream produced an undecodable message"))
        .collect()
}

/// Tally `(edge frames, node frames, close sentinels)`
pub fn count_kinds(messages: &[Message]) -> (usize, usize, usize) {
    let mut counts = (0, 0, 0);
    for message in messages {
        match message {
            Message::Frame(f) if f.kind == FrameKind::Edges => counts.0 += 1,
            Message::Frame(_) => counts.1 += 1,
            Message::Close => counts.2 += 1,
        }
    }
    counts
}

/// Iteration numbers of the node frames, in arrival order
pub fn node_iterations(messages: &[Message]) -> Vec<u64> {
    messages
        .iter()
        .filter_map(|m| m.as_frame())
        .filter(|f| f.kind == FrameKind::Nodes)
        .map(|f| f.iteration)
        .collect()
}
