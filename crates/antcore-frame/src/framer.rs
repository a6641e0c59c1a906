use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::codec::SYNC;
use crate::error::FrameError;
use crate::message::{decode_message, Message};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Counters for what the framer did with the bytes it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Messages extracted.
    pub messages: u64,
    /// Frames dropped because their checksum did not match.
    pub checksum_failures: u64,
    /// Intact frames dropped because their payload did not fit their id.
    pub invalid_frames: u64,
    /// Bytes discarded while searching for a sync byte.
    pub resync_bytes: u64,
}

/// Accumulates transport bytes and splits off complete messages.
///
/// Partial frames stay buffered until the rest arrives.
#[derive(Debug)]
pub struct Framer {
    buf: BytesMut,
    stats: FramerStats,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            stats: FramerStats::default(),
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract every complete message currently buffered, in wire order.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        drain(&mut self.buf, &mut self.stats)
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn remaining(&self) -> &[u8] {
        &self.buf
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Drop any buffered partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract every complete message from the front of `buf`.
///
/// Consumed and skipped bytes are removed from `buf`; an incomplete trailing
/// frame is left in place for the next call.
pub fn process_buffer(buf: &mut BytesMut) -> Vec<Message> {
    let mut stats = FramerStats::default();
    drain(buf, &mut stats)
}

fn drain(buf: &mut BytesMut, stats: &mut FramerStats) -> Vec<Message> {
    let mut messages = Vec::new();

    loop {
        match decode_message(&buf[..]) {
            Ok((message, consumed)) => {
                buf.advance(consumed);
                stats.messages += 1;
                messages.push(message);
            }
            Err(FrameError::Incomplete { .. }) => break,
            Err(FrameError::InvalidSync(byte)) => {
                let skip = buf[1..]
                    .iter()
                    .position(|&b| b == SYNC)
                    .map_or(buf.len(), |pos| pos + 1);
                warn!(byte, skip, "discarding bytes before next sync byte");
                buf.advance(skip);
                stats.resync_bytes += skip as u64;
            }
            Err(err) => match err.skippable_len() {
                Some(skip) => {
                    if matches!(err, FrameError::Checksum { .. }) {
                        stats.checksum_failures += 1;
                    } else {
                        stats.invalid_frames += 1;
                    }
                    debug!(error = %err, skip, "skipping frame");
                    buf.advance(skip);
                }
                None => {
                    warn!(error = %err, "unrecoverable frame error; waiting for more bytes");
                    break;
                }
            },
        }
    }

    messages
}
