use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use antcore_frame::{message_name, Framer, Message};
use tracing::{debug, info, trace, warn};

use crate::machine::Shared;
use crate::observer::Observer;

/// The pump's own view of whether it is consuming the transport.
#[derive(Debug, Default)]
pub(crate) struct PumpFlag {
    active: Mutex<bool>,
    changed: Condvar,
}

impl PumpFlag {
    pub(crate) fn get(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, value: bool) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = value;
        self.changed.notify_all();
    }

    /// Block until the flag equals `target` or `gave_up` returns true,
    /// rechecking at least every `interval`.
    pub(crate) fn wait_until<F>(&self, target: bool, interval: Duration, mut gave_up: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *active == target {
                return true;
            }
            if gave_up() {
                return false;
            }
            active = self
                .changed
                .wait_timeout(active, interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Clears the pump flag however the loop exits. If the pump is unwinding, the
/// running flag is cleared as well so a later `start` can spawn a new pump.
struct ActiveGuard<'a> {
    shared: &'a Shared,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.running.store(false, Ordering::Release);
        }
        self.shared.pump.set(false);
    }
}

/// Pump loop body; runs on the dedicated pump thread until `running` clears.
pub(crate) fn run(shared: Arc<Shared>) {
    shared.claim_pump_thread();
    shared.pump.set(true);
    let _guard = ActiveGuard { shared: &shared };
    info!(
        driver = %shared.driver_name(),
        chunk = shared.config.read_chunk_size,
        "event pump started"
    );

    let mut framer = Framer::new();
    let mut read_failing = false;

    while shared.running.load(Ordering::Acquire) {
        let read = shared.lock_driver().read(shared.config.read_chunk_size);
        match read {
            Ok(bytes) => {
                if read_failing {
                    info!("transport reads recovered");
                    read_failing = false;
                }
                if !bytes.is_empty() {
                    trace!(len = bytes.len(), "read bytes");
                    framer.extend(&bytes);
                    let messages = framer.drain_messages();
                    if !messages.is_empty() {
                        let observers = shared.observer_snapshot();
                        for message in &messages {
                            dispatch(&observers, message);
                        }
                    }
                }
            }
            Err(err) => {
                if !read_failing {
                    warn!(error = %err, "transport read failed");
                    read_failing = true;
                }
            }
        }

        thread::sleep(shared.config.pump_interval);
    }

    let stats = framer.stats();
    info!(
        messages = stats.messages,
        checksum_failures = stats.checksum_failures,
        invalid_frames = stats.invalid_frames,
        resync_bytes = stats.resync_bytes,
        buffered = framer.remaining().len(),
        "event pump stopped"
    );
}

/// Deliver `message` to every observer in order, isolating failures.
pub(crate) fn dispatch(observers: &[Arc<dyn Observer>], message: &Message) {
    debug!(
        id = message.id(),
        name = message_name(message.id()),
        observers = observers.len(),
        "dispatching message"
    );
    for observer in observers {
        match panic::catch_unwind(AssertUnwindSafe(|| observer.process(message))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(observer = observer.name(), error = %err, "observer failed");
            }
            Err(_) => {
                warn!(observer = observer.name(), "observer panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::observer::{FnObserver, ObserverError};

    #[test]
    fn dispatch_reaches_every_observer_despite_failures() {
        let calls = Arc::new(AtomicUsize::new(0));

        let failing: Arc<dyn Observer> = Arc::new(FnObserver::new("failing", |_: &Message| {
            Err(ObserverError::new("always fails"))
        }));
        let panicking: Arc<dyn Observer> =
            Arc::new(FnObserver::new("panicking", |_: &Message| -> Result<(), ObserverError> {
                panic!("observer bug")
            }));
        let counting: Arc<dyn Observer> = {
            let calls = Arc::clone(&calls);
            Arc::new(FnObserver::new("counting", move |_: &Message| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
        };

        let observers = vec![failing, panicking, counting];
        for _ in 0..3 {
            dispatch(&observers, &Message::open_channel(0));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn flag_wait_returns_when_target_reached() {
        let flag = Arc::new(PumpFlag::default());
        assert!(!flag.get());

        let setter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                flag.set(true);
            })
        };

        assert!(flag.wait_until(true, Duration::from_millis(1), || false));
        setter.join().unwrap();
        assert!(flag.get());
    }

    #[test]
    fn flag_wait_gives_up() {
        let flag = PumpFlag::default();
        let mut checks = 0;
        let reached = flag.wait_until(true, Duration::from_millis(1), || {
            checks += 1;
            checks > 3
        });
        assert!(!reached);
        assert_eq!(checks, 4);
    }
}
