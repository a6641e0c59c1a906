//! Transport drivers for the ANT event layer.
//!
//! A driver is anything that can hand back the bytes a radio module has
//! produced since the last call and accept bytes to send to it:
//! - [`SerialDriver`] for USB/UART sticks exposed as a tty (Linux/macOS)
//! - [`MemoryDriver`] for in-process loopback and tests
//!
//! This is the lowest layer of antcore. The event pump only ever talks to the
//! [`Driver`] trait defined here.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::{MemoryDriver, MemoryHandle};
pub use traits::Driver;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialDriver};
