use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use antcore_event::{EventConfig, EventError, EventMachine, FnObserver, PumpState};
use antcore_frame::{Message, MessageKind};
use antcore_transport::{Driver, MemoryDriver, MemoryHandle};
use bytes::Bytes;

/// Panics on its first read, then behaves like the wrapped loopback.
struct FaultyDriver {
    inner: MemoryDriver,
    faulted: bool,
}

impl Driver for FaultyDriver {
    fn read(&mut self, max_bytes: usize) -> antcore_transport::Result<Bytes> {
        if !self.faulted {
            self.faulted = true;
            panic!("radio fault");
        }
        self.inner.read(max_bytes)
    }

    fn write(&mut self, data: &[u8]) -> antcore_transport::Result<usize> {
        self.inner.write(data)
    }
}

fn faulty() -> (FaultyDriver, MemoryHandle) {
    let (inner, handle) = MemoryDriver::pair();
    (
        FaultyDriver {
            inner,
            faulted: false,
        },
        handle,
    )
}

fn settle(machine: &EventMachine, target: PumpState) -> PumpState {
    let mut state = machine.state();
    for _ in 0..2500 {
        if state == target {
            break;
        }
        thread::sleep(Duration::from_millis(2));
        state = machine.state();
    }
    state
}

#[test]
fn no_reads_after_stop_returns() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = EventMachine::new(driver);

    machine.start().expect("pump should start");
    assert_eq!(machine.state(), PumpState::Running);
    thread::sleep(Duration::from_millis(20));
    machine.stop();
    assert_eq!(machine.state(), PumpState::Stopped);

    let reads = handle.read_count();
    assert!(reads > 0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.read_count(), reads);
}

#[test]
fn no_dispatch_after_stop_returns() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = EventMachine::new(driver);
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        machine.register_observer(Arc::new(FnObserver::new("counting", move |_: &Message| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })));
    }

    machine.start().expect("pump should start");
    machine.stop();

    let before = calls.load(Ordering::SeqCst);
    handle.push(&Message::Startup { reason: 0 }.to_bytes().expect("encode"));
    thread::sleep(Duration::from_millis(50));

    assert_eq!(calls.load(Ordering::SeqCst), before);
    assert_eq!(handle.pending(), 5);
}

#[test]
fn bytes_buffered_while_stopped_are_delivered_after_restart() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = EventMachine::new(driver);

    handle.push(&Message::Startup { reason: 0x01 }.to_bytes().expect("encode"));
    machine.start().expect("pump should start");

    assert_eq!(
        machine.wait_for_message(MessageKind::Startup),
        Message::Startup { reason: 0x01 }
    );
    machine.stop();
}

#[test]
fn observer_can_stop_machine_from_pump_thread() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = Arc::new(EventMachine::new(driver));

    {
        let weak = Arc::downgrade(&machine);
        machine.register_observer(Arc::new(FnObserver::new("stopper", move |message: &Message| {
            if message.kind() == MessageKind::SerialError {
                if let Some(machine) = weak.upgrade() {
                    machine.stop();
                }
            }
            Ok(())
        })));
    }

    machine.start().expect("pump should start");
    handle.push(
        &Message::SerialError {
            code: 0x00,
            detail: Default::default(),
        }
        .to_bytes()
        .expect("encode"),
    );

    assert_eq!(settle(&machine, PumpState::Stopped), PumpState::Stopped);

    // The finished pump is reaped on the next start.
    machine.start().expect("pump should restart");
    assert!(machine.is_running());
    machine.stop();
}

#[test]
fn failing_transport_keeps_pump_alive() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = EventMachine::with_config(
        driver,
        EventConfig {
            pump_interval: Duration::from_millis(1),
            ..EventConfig::default()
        },
    );

    machine.start().expect("pump should start");
    handle.close();
    let reads = handle.read_count();
    thread::sleep(Duration::from_millis(30));

    assert!(handle.read_count() > reads);
    assert_eq!(machine.state(), PumpState::Running);
    machine.stop();
}

#[test]
fn concurrent_start_and_stop_settle() {
    let (driver, _handle) = MemoryDriver::pair();
    let machine = Arc::new(EventMachine::new(driver));

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        machine.start().expect("pump should start");
                    } else {
                        machine.stop();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }

    machine.stop();
    assert_eq!(machine.state(), PumpState::Stopped);
}

#[test]
fn observer_restart_during_stop_is_ignored() {
    let (driver, handle) = MemoryDriver::pair();
    let machine = Arc::new(EventMachine::new(driver));
    let (dispatching, in_dispatch) = mpsc::channel();

    {
        let weak = Arc::downgrade(&machine);
        machine.register_observer(Arc::new(FnObserver::new("restarter", move |message: &Message| {
            if message.kind() == MessageKind::Startup {
                let _ = dispatching.send(());
                // Give the other thread time to enter stop.
                thread::sleep(Duration::from_millis(50));
                if let Some(machine) = weak.upgrade() {
                    machine.start().expect("restart from observer");
                }
            }
            Ok(())
        })));
    }

    machine.start().expect("pump should start");
    handle.push(&Message::Startup { reason: 0 }.to_bytes().expect("encode"));
    in_dispatch
        .recv_timeout(Duration::from_secs(5))
        .expect("observer should run");

    machine.stop();
    assert_eq!(machine.state(), PumpState::Stopped);
    assert!(!machine.is_running());

    let reads = handle.read_count();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(handle.read_count(), reads);
}

#[test]
fn driver_panic_leaves_machine_restartable() {
    let (driver, handle) = faulty();
    let machine = EventMachine::new(driver);

    // The pump may die before start observes it running.
    match machine.start() {
        Ok(()) | Err(EventError::PumpExited) => {}
        Err(err) => panic!("unexpected start error: {err}"),
    }
    assert_eq!(settle(&machine, PumpState::Stopped), PumpState::Stopped);
    assert!(!machine.is_running());

    machine.start().expect("pump should restart");
    assert_eq!(machine.state(), PumpState::Running);

    handle.push(&Message::Startup { reason: 0x02 }.to_bytes().expect("encode"));
    assert_eq!(
        machine.wait_for_message(MessageKind::Startup),
        Message::Startup { reason: 0x02 }
    );
    machine.stop();
    assert_eq!(machine.state(), PumpState::Stopped);
}
