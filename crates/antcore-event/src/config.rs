use std::time::Duration;

use tracing::warn;

/// Capacity of the ack and message queues unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 25;

/// Bytes requested from the driver per pump iteration.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 20;

/// Shortest pump, poll or lifecycle interval a machine will use.
pub const MIN_INTERVAL: Duration = Duration::from_micros(100);

/// Tuning for an [`EventMachine`](crate::EventMachine).
///
/// Zero capacities, a zero chunk size and intervals below [`MIN_INTERVAL`]
/// are raised by [`sanitized`](Self::sanitized) when the machine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConfig {
    /// Channel events retained for `wait_for_ack`. Oldest are dropped first.
    pub ack_queue_capacity: usize,
    /// Messages retained for `wait_for_message`. Oldest are dropped first.
    pub message_queue_capacity: usize,
    /// Maximum bytes read from the driver per pump iteration.
    pub read_chunk_size: usize,
    /// Pause between pump iterations.
    pub pump_interval: Duration,
    /// How often a blocked `wait_for_*` call rescans its queue.
    pub poll_interval: Duration,
    /// How often `start`/`stop` recheck the pump's state.
    pub lifecycle_poll_interval: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            ack_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            message_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            pump_interval: Duration::from_millis(2),
            poll_interval: Duration::from_millis(2),
            lifecycle_poll_interval: Duration::from_millis(1),
        }
    }
}

impl EventConfig {
    /// Raise values that would stall or spin the machine: zero capacities and
    /// chunk size become 1, short intervals become [`MIN_INTERVAL`].
    pub fn sanitized(mut self) -> Self {
        self.ack_queue_capacity = at_least_one("ack_queue_capacity", self.ack_queue_capacity);
        self.message_queue_capacity =
            at_least_one("message_queue_capacity", self.message_queue_capacity);
        self.read_chunk_size = at_least_one("read_chunk_size", self.read_chunk_size);
        self.pump_interval = at_least_min("pump_interval", self.pump_interval);
        self.poll_interval = at_least_min("poll_interval", self.poll_interval);
        self.lifecycle_poll_interval =
            at_least_min("lifecycle_poll_interval", self.lifecycle_poll_interval);
        self
    }
}

fn at_least_one(field: &'static str, value: usize) -> usize {
    if value == 0 {
        warn!(field, "zero is not usable, using 1");
        return 1;
    }
    value
}

fn at_least_min(field: &'static str, value: Duration) -> Duration {
    if value < MIN_INTERVAL {
        warn!(field, ?value, min = ?MIN_INTERVAL, "interval too short, raising");
        return MIN_INTERVAL;
    }
    value
}
