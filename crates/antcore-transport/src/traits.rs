use bytes::Bytes;

use crate::error::{Result, TransportError};

/// A byte-level connection to an ANT radio module.
///
/// `read` must return within a bounded time, handing back whatever arrived
/// (possibly nothing). An empty result means "no data yet" and is never an
/// error. The event pump re-checks its stop flag between reads, so a driver
/// whose `read` can block indefinitely will make `EventMachine::stop` hang.
pub trait Driver: Send {
    /// Read up to `max_bytes` bytes.
    fn read(&mut self, max_bytes: usize) -> Result<Bytes>;

    /// Write some prefix of `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Short driver name for diagnostics.
    fn name(&self) -> &str {
        "driver"
    }

    /// Write all of `data`, retrying short writes.
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(TransportError::Io(err))
                    if err.kind() == std::io::ErrorKind::Interrupted
                        || err.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        (**self).read(max_bytes)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }
}
