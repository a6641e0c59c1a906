use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Driver;

#[derive(Debug, Default)]
struct Loopback {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    reads: u64,
    closed: bool,
}

/// In-process driver backed by a shared byte queue.
///
/// Created together with a [`MemoryHandle`], which plays the radio side:
/// it injects bytes for the driver to read and collects what was written.
#[derive(Debug)]
pub struct MemoryDriver {
    shared: Arc<Mutex<Loopback>>,
}

/// The radio side of a [`MemoryDriver`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    shared: Arc<Mutex<Loopback>>,
}

impl MemoryDriver {
    /// Create a connected driver/handle pair.
    pub fn pair() -> (MemoryDriver, MemoryHandle) {
        let shared = Arc::new(Mutex::new(Loopback::default()));
        (
            MemoryDriver {
                shared: Arc::clone(&shared),
            },
            MemoryHandle { shared },
        )
    }

    /// Create a driver whose inbound queue is pre-loaded with `bytes`.
    pub fn preloaded(bytes: &[u8]) -> (MemoryDriver, MemoryHandle) {
        let (driver, handle) = Self::pair();
        handle.push(bytes);
        (driver, handle)
    }
}

impl Driver for MemoryDriver {
    fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        let mut shared = lock(&self.shared);
        shared.reads += 1;
        if shared.closed {
            return Err(TransportError::Closed);
        }
        let n = max_bytes.min(shared.inbound.len());
        let chunk: Vec<u8> = shared.inbound.drain(..n).collect();
        Ok(Bytes::from(chunk))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut shared = lock(&self.shared);
        if shared.closed {
            return Err(TransportError::Closed);
        }
        shared.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl MemoryHandle {
    /// Queue bytes for the driver to read.
    pub fn push(&self, bytes: &[u8]) {
        lock(&self.shared).inbound.extend(bytes.iter().copied());
    }

    /// Take everything written through the driver so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.shared).outbound)
    }

    /// Bytes queued but not yet read by the driver.
    pub fn pending(&self) -> usize {
        lock(&self.shared).inbound.len()
    }

    /// Number of `read` calls the driver has served.
    pub fn read_count(&self) -> u64 {
        lock(&self.shared).reads
    }

    /// Make every further driver call fail with [`TransportError::Closed`].
    pub fn close(&self) {
        debug!("closing memory transport");
        lock(&self.shared).closed = true;
    }
}

fn lock(shared: &Mutex<Loopback>) -> MutexGuard<'_, Loopback> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
