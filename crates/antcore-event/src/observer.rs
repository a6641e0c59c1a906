use std::sync::Arc;

use antcore_frame::{ChannelEvent, Message};

use crate::queue::BoundedQueue;

/// Failure reported by an observer. The pump logs it and moves on.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives every message the pump extracts from the transport.
///
/// `process` runs on the pump thread, so it should return quickly. Errors
/// and panics are contained: they never reach other observers or stop the
/// pump.
pub trait Observer: Send + Sync {
    fn process(&self, message: &Message) -> Result<(), ObserverError>;

    /// Name used in log lines about this observer.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Keeps recent channel events for `wait_for_ack`.
#[derive(Debug)]
pub struct AckObserver {
    queue: Arc<BoundedQueue<ChannelEvent>>,
}

impl AckObserver {
    pub fn new(queue: Arc<BoundedQueue<ChannelEvent>>) -> Self {
        Self { queue }
    }
}

impl Observer for AckObserver {
    fn process(&self, message: &Message) -> Result<(), ObserverError> {
        if let Message::ChannelEvent(event) = message {
            self.queue.push(*event);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ack"
    }
}

/// Keeps recent messages of every kind for `wait_for_message`.
#[derive(Debug)]
pub struct MessageObserver {
    queue: Arc<BoundedQueue<Message>>,
}

impl MessageObserver {
    pub fn new(queue: Arc<BoundedQueue<Message>>) -> Self {
        Self { queue }
    }
}

impl Observer for MessageObserver {
    fn process(&self, message: &Message) -> Result<(), ObserverError> {
        self.queue.push(message.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "message"
    }
}

/// Adapts a closure into an [`Observer`].
pub struct FnObserver<F> {
    name: String,
    f: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&Message) -> Result<(), ObserverError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(&Message) -> Result<(), ObserverError> + Send + Sync,
{
    fn process(&self, message: &Message) -> Result<(), ObserverError> {
        (self.f)(message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
