//! Drive the event machine against an in-memory radio.
//!
//! Run with:
//!   cargo run -p antcore --example loopback
//!
//! A thread plays the module: it answers every command it sees with
//! RESPONSE_NO_ERROR and then starts broadcasting data on channel 0.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use antcore::event::{FnObserver, WaitOptions};
use antcore::frame::{decode_message, ids, ChannelEvent, Message, MessageKind};
use antcore::transport::{MemoryDriver, MemoryHandle};
use antcore::EventMachine;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (driver, handle) = MemoryDriver::pair();
    let machine = EventMachine::new(driver);

    machine.register_observer(Arc::new(FnObserver::new("printer", |message: &Message| {
        eprintln!("<- {} ({} bytes)", ids::message_name(message.id()), message.payload().len());
        Ok(())
    })));
    machine.start()?;

    let powered = Arc::new(AtomicBool::new(true));
    let radio = {
        let handle = handle.clone();
        let powered = Arc::clone(&powered);
        thread::spawn(move || fake_radio(&handle, &powered))
    };

    let options = WaitOptions::timeout(Duration::from_secs(2));
    for command in [
        Message::assign_channel(0, 0x00, 0),
        Message::set_channel_period(0, 8070),
        Message::set_channel_rf_freq(0, 57),
        Message::open_channel(0),
    ] {
        machine.write_message(&command)?;
        let code = machine.wait_for_ack_with(command.id(), &options)?;
        println!(
            "{} -> {}",
            ids::message_name(command.id()),
            ids::event_name(code)
        );
    }

    let data = machine.wait_for_message_with(MessageKind::BroadcastData, &options)?;
    println!("first broadcast: {:02X?}", data.payload().as_ref());

    machine.stop();
    powered.store(false, Ordering::SeqCst);
    let _ = radio.join();
    Ok(())
}

fn fake_radio(handle: &MemoryHandle, powered: &AtomicBool) {
    let mut opened = false;
    while powered.load(Ordering::SeqCst) {
        let written = handle.take_written();
        let mut rest: &[u8] = &written;
        while let Ok((message, used)) = decode_message(rest) {
            rest = &rest[used..];
            let ack = Message::ChannelEvent(ChannelEvent {
                channel: 0,
                message_id: message.id(),
                code: ids::RESPONSE_NO_ERROR,
            });
            let Ok(bytes) = ack.to_bytes() else { return };
            handle.push(&bytes);
            opened |= message.id() == ids::OPEN_CHANNEL;
        }

        if opened {
            let Ok(bytes) = Message::broadcast_data(0, [0x01, 0x02, 0, 0, 0, 0, 0x10, 0x20]).to_bytes()
            else {
                return;
            };
            handle.push(&bytes);
        }
        thread::sleep(Duration::from_millis(50));
    }
}
