//! Runtime event layer for ANT.
//!
//! An [`EventMachine`] owns a transport [`Driver`](antcore_transport::Driver)
//! and a background pump thread that reads bytes, frames them into messages
//! and hands every message to the registered [`Observer`]s. Two observers are
//! always present: one keeps recent channel events (acks), the other keeps
//! recent messages of any kind. Callers block on those queues with
//! [`EventMachine::wait_for_ack`] and [`EventMachine::wait_for_message`].
//!
//! ```no_run
//! use antcore_event::EventMachine;
//! use antcore_frame::Message;
//! use antcore_transport::SerialDriver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let machine = EventMachine::new(SerialDriver::open("/dev/ttyUSB0")?);
//! machine.start()?;
//!
//! let reset = Message::reset_system();
//! machine.write_message(&reset)?;
//! let code = machine.wait_for_ack(reset.id());
//! println!("reset answered with 0x{code:02X}");
//!
//! machine.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod machine;
pub mod observer;
pub mod queue;
pub mod wait;

mod pump;

#[cfg(feature = "async")]
mod wait_async;

pub use config::{EventConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_READ_CHUNK_SIZE, MIN_INTERVAL};
pub use error::{EventError, Result};
pub use machine::{EventMachine, PumpState};
pub use observer::{AckObserver, FnObserver, MessageObserver, Observer, ObserverError};
pub use queue::BoundedQueue;
pub use tokio_util::sync::CancellationToken;
pub use wait::WaitOptions;
