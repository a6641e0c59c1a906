use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};

use antcore_frame::{message_name, ChannelEvent, Message, MessageKind};
use antcore_transport::Driver;
use tracing::{debug, info, warn};

use crate::config::EventConfig;
use crate::error::{EventError, Result};
use crate::observer::{AckObserver, MessageObserver, Observer};
use crate::pump::{self, PumpFlag};
use crate::queue::BoundedQueue;
use crate::wait::{WaitOptions, Waiter};

const PUMP_THREAD_NAME: &str = "antcore-pump";

/// Observable lifecycle state, derived from the requested state and the
/// pump's own flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PumpState {
    Stopped,
    /// `start` requested, pump not yet consuming.
    Starting,
    Running,
    /// `stop` requested, pump still inside its last iteration.
    Stopping,
}

/// State shared between the machine and its pump thread.
pub(crate) struct Shared {
    pub(crate) config: EventConfig,
    driver: Mutex<Box<dyn Driver>>,
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    pub(crate) running: AtomicBool,
    pub(crate) pump: PumpFlag,
    pump_thread: Mutex<Option<ThreadId>>,
    /// Set while a `stop` from outside the pump is waiting for it to exit.
    stopping: Mutex<bool>,
}

impl Shared {
    pub(crate) fn lock_driver(&self) -> MutexGuard<'_, Box<dyn Driver>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn driver_name(&self) -> String {
        self.lock_driver().name().to_string()
    }

    /// Registry copy for one dispatch; register/remove never block on it.
    pub(crate) fn observer_snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Called by the pump before it reports itself active, so that every
    /// observer call can recognize the pump thread.
    pub(crate) fn claim_pump_thread(&self) {
        *self
            .pump_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
    }

    /// Mark a stop in progress and clear `running`. Returns the previous
    /// value of `running`.
    fn begin_stop(&self) -> bool {
        let mut stopping = self.stopping.lock().unwrap_or_else(PoisonError::into_inner);
        *stopping = true;
        self.running.swap(false, Ordering::AcqRel)
    }

    fn end_stop(&self) {
        *self.stopping.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Re-arm the loop from inside an observer. Refused while another thread
    /// is stopping the pump.
    fn rearm_from_pump(&self) -> bool {
        let stopping = self.stopping.lock().unwrap_or_else(PoisonError::into_inner);
        if *stopping {
            return false;
        }
        self.running.store(true, Ordering::Release);
        true
    }

    fn on_pump_thread(&self) -> bool {
        let pump_thread = *self
            .pump_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pump_thread == Some(thread::current().id())
    }
}

/// Owns a transport, the pump thread reading it, the observer registry and
/// the ack/message queues callers wait on.
///
/// Dropping the machine stops the pump.
pub struct EventMachine {
    shared: Arc<Shared>,
    ack_queue: Arc<BoundedQueue<ChannelEvent>>,
    message_queue: Arc<BoundedQueue<Message>>,
    lifecycle: Mutex<Option<JoinHandle<()>>>,
}

impl EventMachine {
    /// Create a stopped machine over `driver` with default tuning.
    pub fn new<D>(driver: D) -> Self
    where
        D: Driver + 'static,
    {
        Self::with_config(driver, EventConfig::default())
    }

    pub fn with_config<D>(driver: D, config: EventConfig) -> Self
    where
        D: Driver + 'static,
    {
        let config = config.sanitized();
        let ack_queue = Arc::new(BoundedQueue::new(config.ack_queue_capacity));
        let message_queue = Arc::new(BoundedQueue::new(config.message_queue_capacity));

        let builtins: Vec<Arc<dyn Observer>> = vec![
            Arc::new(AckObserver::new(Arc::clone(&ack_queue))),
            Arc::new(MessageObserver::new(Arc::clone(&message_queue))),
        ];

        let shared = Arc::new(Shared {
            config,
            driver: Mutex::new(Box::new(driver)),
            observers: RwLock::new(builtins),
            running: AtomicBool::new(false),
            pump: PumpFlag::default(),
            pump_thread: Mutex::new(None),
            stopping: Mutex::new(false),
        });

        Self {
            shared,
            ack_queue,
            message_queue,
            lifecycle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EventConfig {
        &self.shared.config
    }

    /// Add `observer` to the end of the dispatch order.
    ///
    /// Returns `false` if this exact observer is already registered.
    pub fn register_observer(&self, observer: Arc<dyn Observer>) -> bool {
        let mut observers = self
            .shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if observers.iter().any(|existing| same_observer(existing, &observer)) {
            return false;
        }
        debug!(observer = observer.name(), "registering observer");
        observers.push(observer);
        true
    }

    /// Remove `observer` if registered. Returns whether anything was removed.
    ///
    /// A dispatch already in progress may still deliver one more message to it.
    pub fn remove_observer<O>(&self, observer: &Arc<O>) -> bool
    where
        O: Observer + ?Sized,
    {
        let target = Arc::as_ptr(observer) as *const ();
        let mut observers = self
            .shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|existing| Arc::as_ptr(existing) as *const () != target);
        let removed = observers.len() != before;
        if removed {
            debug!(observer = observer.name(), "removed observer");
        }
        removed
    }

    /// Registered observers, including the two built-in ones.
    pub fn observer_count(&self) -> usize {
        self.shared
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Start the pump and block until it is consuming the transport.
    ///
    /// No-op if already running. There is no timeout: the pump reports itself
    /// active before its first read, so this returns promptly unless the
    /// thread cannot be scheduled.
    ///
    /// Called from an observer it only re-arms the running pump, and is
    /// ignored while another thread is inside [`stop`](Self::stop).
    pub fn start(&self) -> Result<()> {
        self.start_inner(None)
    }

    /// Replace the transport, then start.
    ///
    /// If the pump is already running this is a no-op and `driver` is dropped
    /// unused.
    pub fn start_with_driver<D>(&self, driver: D) -> Result<()>
    where
        D: Driver + 'static,
    {
        self.start_inner(Some(Box::new(driver)))
    }

    fn start_inner(&self, driver: Option<Box<dyn Driver>>) -> Result<()> {
        if self.shared.on_pump_thread() {
            // An observer restarting after its own stop: the loop has not
            // rechecked the flag yet, so it simply keeps going.
            if !self.shared.rearm_from_pump() {
                debug!("restart from observer ignored, stop in progress");
            }
            return Ok(());
        }

        let mut lifecycle = self.lock_lifecycle();
        if self.shared.running.load(Ordering::Acquire) {
            debug!("event pump already running");
            return Ok(());
        }

        // A previous pump may still be finishing after a stop issued from an
        // observer, or after a panic.
        if let Some(previous) = lifecycle.take() {
            join_pump(previous);
        }

        if let Some(driver) = driver {
            debug!(driver = driver.name(), "replacing transport driver");
            *self.shared.lock_driver() = driver;
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(PUMP_THREAD_NAME.to_string())
            .spawn(move || pump::run(shared));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(EventError::Spawn(err));
            }
        };
        let active = self.shared.pump.wait_until(
            true,
            self.shared.config.lifecycle_poll_interval,
            || handle.is_finished(),
        );
        if !active {
            self.shared.running.store(false, Ordering::Release);
            join_pump(handle);
            return Err(EventError::PumpExited);
        }

        *lifecycle = Some(handle);
        info!("event machine started");
        Ok(())
    }

    /// Stop the pump and block until it has finished its last iteration.
    ///
    /// No observer is called after this returns. No-op if not running. Called
    /// from an observer, it only requests the stop; the pump exits once the
    /// current dispatch returns.
    pub fn stop(&self) {
        if self.shared.on_pump_thread() {
            self.shared.running.store(false, Ordering::Release);
            return;
        }

        let mut lifecycle = self.lock_lifecycle();
        if !self.shared.begin_stop() && lifecycle.is_none() {
            self.shared.end_stop();
            return;
        }

        self.shared
            .pump
            .wait_until(false, self.shared.config.lifecycle_poll_interval, || false);

        if let Some(handle) = lifecycle.take() {
            join_pump(handle);
            info!("event machine stopped");
        }
        self.shared.end_stop();
    }

    pub fn state(&self) -> PumpState {
        let running = self.shared.running.load(Ordering::Acquire);
        match (running, self.shared.pump.get()) {
            (true, true) => PumpState::Running,
            (true, false) => PumpState::Starting,
            (false, true) => PumpState::Stopping,
            (false, false) => PumpState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Encode `message` and write it through the current driver.
    ///
    /// Shares the driver with the pump, so it may wait for one in-flight read.
    pub fn write_message(&self, message: &Message) -> Result<()> {
        let bytes = message.to_bytes()?;
        self.shared.lock_driver().write_all(&bytes)?;
        debug!(
            id = message.id(),
            name = message_name(message.id()),
            len = bytes.len(),
            "wrote message"
        );
        Ok(())
    }

    /// Block until a channel event answering `message_id` is queued, remove
    /// it and return its event code.
    ///
    /// Matches the oldest queued event for that id; there is no per-request
    /// correlation. Blocks forever if the answer never arrives.
    pub fn wait_for_ack(&self, message_id: u8) -> u8 {
        take_blocking(
            &*self.ack_queue,
            |event| event.message_id == message_id,
            &self.shared.config,
        )
        .code
    }

    /// [`wait_for_ack`](Self::wait_for_ack) bounded by `options`.
    pub fn wait_for_ack_with(&self, message_id: u8, options: &WaitOptions) -> Result<u8> {
        take_until(
            &*self.ack_queue,
            |event| event.message_id == message_id,
            options,
            &self.shared.config,
        )
        .map(|event| event.code)
    }

    /// Block until a message of `kind` is queued, then remove and return it.
    pub fn wait_for_message(&self, kind: MessageKind) -> Message {
        take_blocking(
            &*self.message_queue,
            |message| kind.matches(message),
            &self.shared.config,
        )
    }

    pub fn wait_for_message_with(&self, kind: MessageKind, options: &WaitOptions) -> Result<Message> {
        take_until(
            &*self.message_queue,
            |message| kind.matches(message),
            options,
            &self.shared.config,
        )
    }

    /// Block until a queued message satisfies `predicate`, then remove and
    /// return it.
    pub fn wait_for_message_where<P>(&self, predicate: P) -> Message
    where
        P: FnMut(&Message) -> bool,
    {
        take_blocking(&*self.message_queue, predicate, &self.shared.config)
    }

    pub fn wait_for_message_where_with<P>(&self, predicate: P, options: &WaitOptions) -> Result<Message>
    where
        P: FnMut(&Message) -> bool,
    {
        take_until(&*self.message_queue, predicate, options, &self.shared.config)
    }

    /// Recent channel events, oldest first.
    pub fn ack_queue(&self) -> &Arc<BoundedQueue<ChannelEvent>> {
        &self.ack_queue
    }

    /// Recent messages of every kind, oldest first.
    pub fn message_queue(&self) -> &Arc<BoundedQueue<Message>> {
        &self.message_queue
    }

    /// Discard everything queued for `wait_for_*`.
    pub fn clear_queues(&self) {
        self.ack_queue.clear();
        self.message_queue.clear();
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EventMachine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EventMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMachine")
            .field("state", &self.state())
            .field("observers", &self.observer_count())
            .field("acks", &self.ack_queue.len())
            .field("messages", &self.message_queue.len())
            .finish_non_exhaustive()
    }
}

fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn join_pump(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("event pump thread panicked");
    }
}

fn take_blocking<T, P>(queue: &BoundedQueue<T>, mut predicate: P, config: &EventConfig) -> T
where
    P: FnMut(&T) -> bool,
{
    loop {
        if let Some(item) = queue.take_first_or_wait(&mut predicate, config.poll_interval) {
            return item;
        }
    }
}

fn take_until<T, P>(
    queue: &BoundedQueue<T>,
    mut predicate: P,
    options: &WaitOptions,
    config: &EventConfig,
) -> Result<T>
where
    P: FnMut(&T) -> bool,
{
    let waiter = Waiter::new(options, config.poll_interval);
    loop {
        if let Some(item) = queue.take_first_or_wait(&mut predicate, waiter.slice()) {
            return Ok(item);
        }
        waiter.check()?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    use antcore_frame::ids;
    use antcore_transport::{MemoryDriver, MemoryHandle};

    use super::*;
    use crate::observer::{FnObserver, ObserverError};

    fn machine() -> (EventMachine, MemoryHandle) {
        let (driver, handle) = MemoryDriver::pair();
        (EventMachine::new(driver), handle)
    }

    fn ack(message_id: u8, code: u8) -> ChannelEvent {
        ChannelEvent {
            channel: 0,
            message_id,
            code,
        }
    }

    fn counting_observer(calls: &Arc<AtomicUsize>) -> Arc<dyn Observer> {
        let calls = Arc::clone(calls);
        Arc::new(FnObserver::new("counting", move |_: &Message| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), ObserverError>(())
        }))
    }

    #[test]
    fn builtins_are_registered() {
        let (machine, _handle) = machine();
        assert_eq!(machine.observer_count(), 2);
        assert_eq!(machine.state(), PumpState::Stopped);
        assert_eq!(machine.ack_queue().capacity(), 25);
        assert_eq!(machine.message_queue().capacity(), 25);
    }

    #[test]
    fn register_and_remove_are_idempotent() {
        let (machine, _handle) = machine();
        let calls = Arc::new(AtomicUsize::new(0));
        let observer = counting_observer(&calls);

        assert!(machine.register_observer(Arc::clone(&observer)));
        assert!(!machine.register_observer(Arc::clone(&observer)));
        assert_eq!(machine.observer_count(), 3);

        assert!(machine.remove_observer(&observer));
        assert!(!machine.remove_observer(&observer));
        assert_eq!(machine.observer_count(), 2);
    }

    #[test]
    fn distinct_observers_with_same_behavior_are_separate() {
        let (machine, _handle) = machine();
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(machine.register_observer(counting_observer(&calls)));
        assert!(machine.register_observer(counting_observer(&calls)));
        assert_eq!(machine.observer_count(), 4);
    }

    #[test]
    fn queued_ack_is_returned_and_consumed() {
        let (machine, _handle) = machine();
        machine.ack_queue().push(ack(ids::CHANNEL_PERIOD, ids::RESPONSE_NO_ERROR));
        machine.ack_queue().push(ack(ids::OPEN_CHANNEL, ids::CHANNEL_IN_WRONG_STATE));
        machine.ack_queue().push(ack(ids::OPEN_CHANNEL, ids::RESPONSE_NO_ERROR));

        assert_eq!(machine.wait_for_ack(ids::OPEN_CHANNEL), ids::CHANNEL_IN_WRONG_STATE);
        assert_eq!(machine.wait_for_ack(ids::OPEN_CHANNEL), ids::RESPONSE_NO_ERROR);
        assert_eq!(machine.ack_queue().len(), 1);
    }

    #[test]
    fn bounded_ack_wait_times_out() {
        let (machine, _handle) = machine();
        machine.ack_queue().push(ack(ids::CLOSE_CHANNEL, ids::RESPONSE_NO_ERROR));

        let started = Instant::now();
        let err = machine
            .wait_for_ack_with(ids::OPEN_CHANNEL, &WaitOptions::timeout(Duration::from_millis(30)))
            .unwrap_err();

        assert!(matches!(err, EventError::Timeout(_)));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(machine.ack_queue().len(), 1);
    }

    #[test]
    fn zero_timeout_still_takes_queued_match() {
        let (machine, _handle) = machine();
        machine.ack_queue().push(ack(ids::RESET_SYSTEM, ids::RESPONSE_NO_ERROR));

        let code = machine
            .wait_for_ack_with(ids::RESET_SYSTEM, &WaitOptions::timeout(Duration::ZERO))
            .unwrap();
        assert_eq!(code, ids::RESPONSE_NO_ERROR);
    }

    #[test]
    fn huge_timeout_takes_queued_match() {
        let (machine, _handle) = machine();
        machine.ack_queue().push(ack(ids::OPEN_CHANNEL, ids::RESPONSE_NO_ERROR));
        machine.ack_queue().push(ack(ids::OPEN_CHANNEL, ids::CHANNEL_IN_WRONG_STATE));

        let code = machine
            .wait_for_ack_with(ids::OPEN_CHANNEL, &WaitOptions::timeout(Duration::MAX))
            .unwrap();
        assert_eq!(code, ids::RESPONSE_NO_ERROR);

        let code = machine
            .wait_for_ack_with(
                ids::OPEN_CHANNEL,
                &WaitOptions::timeout(Duration::from_secs(u64::MAX)),
            )
            .unwrap();
        assert_eq!(code, ids::CHANNEL_IN_WRONG_STATE);
    }

    #[test]
    fn message_wait_by_kind_and_predicate() {
        let (machine, _handle) = machine();
        machine.message_queue().push(Message::Startup { reason: 0x20 });
        machine.message_queue().push(Message::broadcast_data(1, [1; 8]));
        machine.message_queue().push(Message::broadcast_data(2, [2; 8]));

        let second = machine.wait_for_message_where(|message| {
            matches!(message, Message::BroadcastData(data) if data.channel == 2)
        });
        assert_eq!(second, Message::broadcast_data(2, [2; 8]));

        let startup = machine.wait_for_message(MessageKind::Startup);
        assert_eq!(startup, Message::Startup { reason: 0x20 });

        let err = machine
            .wait_for_message_with(MessageKind::SerialError, &WaitOptions::timeout(Duration::from_millis(5)))
            .unwrap_err();
        assert!(matches!(err, EventError::Timeout(_)));
        assert_eq!(machine.message_queue().len(), 1);
    }

    #[test]
    fn zero_tuning_still_correlates() {
        let (driver, handle) = MemoryDriver::pair();
        let machine = EventMachine::with_config(
            driver,
            EventConfig {
                ack_queue_capacity: 0,
                read_chunk_size: 0,
                poll_interval: Duration::ZERO,
                ..EventConfig::default()
            },
        );
        assert_eq!(machine.ack_queue().capacity(), 1);
        assert_eq!(machine.config().poll_interval, crate::config::MIN_INTERVAL);

        machine.start().unwrap();
        handle.push(
            &Message::ChannelEvent(ack(ids::OPEN_CHANNEL, ids::RESPONSE_NO_ERROR))
                .to_bytes()
                .unwrap(),
        );
        let code = machine
            .wait_for_ack_with(ids::OPEN_CHANNEL, &WaitOptions::timeout(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(code, ids::RESPONSE_NO_ERROR);
        machine.stop();
    }

    #[test]
    fn clear_queues_empties_both() {
        let (machine, _handle) = machine();
        machine.ack_queue().push(ack(ids::OPEN_CHANNEL, 0));
        machine.message_queue().push(Message::Startup { reason: 0 });
        machine.clear_queues();
        assert!(machine.ack_queue().is_empty());
        assert!(machine.message_queue().is_empty());
    }

    #[test]
    fn write_message_reaches_driver() {
        let (machine, handle) = machine();
        machine.write_message(&Message::reset_system()).unwrap();
        assert_eq!(handle.take_written(), vec![0xA4, 0x01, 0x4A, 0x00, 0xEF]);
    }

    #[test]
    fn write_on_closed_driver_fails() {
        let (machine, handle) = machine();
        handle.close();
        let err = machine.write_message(&Message::reset_system()).unwrap_err();
        assert!(matches!(err, EventError::Transport(_)));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (machine, _handle) = machine();
        machine.stop();
        assert_eq!(machine.state(), PumpState::Stopped);

        machine.start().unwrap();
        machine.start().unwrap();
        assert_eq!(machine.state(), PumpState::Running);
        assert!(machine.is_running());

        machine.stop();
        machine.stop();
        assert_eq!(machine.state(), PumpState::Stopped);
        assert!(!machine.is_running());
    }

    #[test]
    fn machine_can_restart() {
        let (machine, handle) = machine();
        for _ in 0..3 {
            machine.start().unwrap();
            machine.stop();
        }
        let reads = handle.read_count();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.read_count(), reads);
    }

    #[test]
    fn start_with_driver_swaps_transport_when_stopped() {
        let (machine, old) = machine();
        let (driver, new) = MemoryDriver::pair();

        machine.start_with_driver(driver).unwrap();
        machine.write_message(&Message::open_channel(0)).unwrap();
        machine.stop();

        assert!(old.take_written().is_empty());
        assert!(!new.take_written().is_empty());
    }

    #[test]
    fn start_with_driver_while_running_keeps_transport() {
        let (machine, current) = machine();
        machine.start().unwrap();

        let (driver, unused) = MemoryDriver::pair();
        machine.start_with_driver(driver).unwrap();
        machine.write_message(&Message::open_channel(0)).unwrap();
        machine.stop();

        assert!(!current.take_written().is_empty());
        assert!(unused.take_written().is_empty());
    }

    #[test]
    fn drop_stops_pump() {
        let (machine, handle) = machine();
        machine.start().unwrap();
        drop(machine);

        let reads = handle.read_count();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.read_count(), reads);
    }
}
