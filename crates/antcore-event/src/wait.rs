use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{EventError, Result};

/// Bounds on a `wait_for_*_with` call.
///
/// With neither a timeout nor a token the wait behaves exactly like the
/// unbounded variant.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Give up with [`EventError::Timeout`] after this long.
    pub timeout: Option<Duration>,
    /// Give up with [`EventError::Cancelled`] once this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with only a timeout.
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Tracks one bounded wait: how long the next poll may sleep and whether the
/// wait is over.
pub(crate) struct Waiter<'a> {
    options: &'a WaitOptions,
    deadline: Option<Instant>,
    poll_interval: Duration,
}

impl<'a> Waiter<'a> {
    pub(crate) fn new(options: &'a WaitOptions, poll_interval: Duration) -> Self {
        Self {
            options,
            // A timeout too large to represent as an instant never expires.
            deadline: options
                .timeout
                .and_then(|timeout| Instant::now().checked_add(timeout)),
            poll_interval,
        }
    }

    /// Sleep budget for the next poll: the poll interval, cut short by the deadline.
    pub(crate) fn slice(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .poll_interval
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.poll_interval,
        }
    }

    /// Err once the token is cancelled or the deadline has passed.
    pub(crate) fn check(&self) -> Result<()> {
        if let Some(token) = &self.options.cancel {
            if token.is_cancelled() {
                return Err(EventError::Cancelled);
            }
        }
        if let (Some(deadline), Some(timeout)) = (self.deadline, self.options.timeout) {
            if Instant::now() >= deadline {
                return Err(EventError::Timeout(timeout));
            }
        }
        Ok(())
    }
}
