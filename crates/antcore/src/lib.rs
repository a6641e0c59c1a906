//! ANT wireless protocol runtime.
//!
//! antcore turns the byte stream of an ANT radio module into decoded messages
//! and lets callers block until the module answers a command.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-level drivers (serial tty, in-memory loopback)
//! - [`frame`]: ANT wire codec, message types and the recovering framer
//! - [`event`]: event pump, observers, bounded queues and ack correlation

/// Re-export transport types.
pub mod transport {
    pub use antcore_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use antcore_frame::*;
}

/// Re-export event layer types.
pub mod event {
    pub use antcore_event::*;
}

pub use antcore_event::{EventMachine, WaitOptions};
pub use antcore_frame::{Message, MessageKind};
