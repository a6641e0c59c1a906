/// Errors that can occur in event machine operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] antcore_transport::TransportError),

    /// Frame-level error while encoding an outgoing message.
    #[error("frame error: {0}")]
    Frame(#[from] antcore_frame::FrameError),

    /// A bounded wait ran out of time.
    #[error("wait timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A wait was cancelled through its token.
    #[error("wait cancelled")]
    Cancelled,

    /// The pump thread could not be spawned.
    #[error("failed to spawn event pump: {0}")]
    Spawn(#[source] std::io::Error),

    /// The pump thread exited before it reported itself active.
    #[error("event pump exited during start-up")]
    PumpExited,
}

pub type Result<T> = std::result::Result<T, EventError>;
