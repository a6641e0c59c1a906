//! Async counterparts of the correlator waits.
//!
//! They poll the same queues on a tokio timer instead of parking a thread, so
//! many waits can share one runtime.

use std::time::Duration;

use antcore_frame::{Message, MessageKind};
use tokio_util::sync::CancellationToken;

use crate::error::{EventError, Result};
use crate::machine::EventMachine;
use crate::queue::BoundedQueue;
use crate::wait::WaitOptions;

impl EventMachine {
    /// Async [`wait_for_ack_with`](Self::wait_for_ack_with).
    pub async fn wait_for_ack_async(&self, message_id: u8, options: &WaitOptions) -> Result<u8> {
        let event = poll_queue(
            self.ack_queue().as_ref(),
            |event| event.message_id == message_id,
            options,
            self.config().poll_interval,
        )
        .await?;
        Ok(event.code)
    }

    /// Async [`wait_for_message_with`](Self::wait_for_message_with).
    pub async fn wait_for_message_async(
        &self,
        kind: MessageKind,
        options: &WaitOptions,
    ) -> Result<Message> {
        poll_queue(
            self.message_queue().as_ref(),
            |message| kind.matches(message),
            options,
            self.config().poll_interval,
        )
        .await
    }

    /// Async [`wait_for_message_where_with`](Self::wait_for_message_where_with).
    pub async fn wait_for_message_where_async<P>(
        &self,
        predicate: P,
        options: &WaitOptions,
    ) -> Result<Message>
    where
        P: FnMut(&Message) -> bool,
    {
        poll_queue(
            self.message_queue().as_ref(),
            predicate,
            options,
            self.config().poll_interval,
        )
        .await
    }
}

async fn poll_queue<T, P>(
    queue: &BoundedQueue<T>,
    mut predicate: P,
    options: &WaitOptions,
    interval: Duration,
) -> Result<T>
where
    P: FnMut(&T) -> bool,
{
    let cancel = options.cancel.clone().unwrap_or_default();
    let polling = async {
        loop {
            if let Some(item) = queue.take_first(&mut predicate) {
                return Ok(item);
            }
            sleep_or_cancel(&cancel, interval).await?;
        }
    };

    match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, polling)
            .await
            .unwrap_or(Err(EventError::Timeout(timeout))),
        None => polling.await,
    }
}

async fn sleep_or_cancel(cancel: &CancellationToken, interval: Duration) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(EventError::Cancelled),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use antcore_frame::{ids, ChannelEvent};
    use antcore_transport::MemoryDriver;

    use super::*;

    fn machine() -> Arc<EventMachine> {
        let (driver, _handle) = MemoryDriver::pair();
        Arc::new(EventMachine::new(driver))
    }

    #[tokio::test]
    async fn ack_arriving_later_is_returned() {
        let machine = machine();
        let queue = Arc::clone(machine.ack_queue());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            queue.push(ChannelEvent {
                channel: 0,
                message_id: ids::OPEN_CHANNEL,
                code: ids::RESPONSE_NO_ERROR,
            });
        });

        let code = machine
            .wait_for_ack_async(ids::OPEN_CHANNEL, &WaitOptions::timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(code, ids::RESPONSE_NO_ERROR);
        assert!(machine.ack_queue().is_empty());
    }

    #[tokio::test]
    async fn message_wait_times_out() {
        let machine = machine();
        let err = machine
            .wait_for_message_async(
                MessageKind::Startup,
                &WaitOptions::timeout(Duration::from_millis(10)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Timeout(_)));
    }

    #[tokio::test]
    async fn cancellation_ends_unbounded_wait() {
        let machine = machine();
        let token = CancellationToken::new();
        let options = WaitOptions::new().with_cancel(token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = machine
            .wait_for_message_where_async(|_| true, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Cancelled));
    }
}
