use antcore_event::{EventMachine, WaitOptions};
use antcore_frame::{ids, Message, RawFrame};
use tracing::{debug, warn};

use crate::cmd::{open_device, parse_duration, parse_hex, SendArgs};
use crate::exit::{event_error, frame_error, CliResult, NACK, SUCCESS};
use crate::output::{print_ack, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let message = build_message(args.id, &parse_hex(&args.payload)?)?;

    let driver = open_device(&args.device, args.baud)?;
    let machine = EventMachine::new(driver);
    machine
        .start()
        .map_err(|err| event_error("pump start failed", err))?;

    let result = exchange(&machine, &message, args.wait_ack, &WaitOptions::timeout(timeout));
    machine.stop();

    match result? {
        Some(code) => {
            print_ack(message.id(), code, format);
            if ids::is_success(code) {
                Ok(SUCCESS)
            } else {
                warn!(code, event = ids::event_name(code), "command rejected");
                Ok(NACK)
            }
        }
        None => Ok(SUCCESS),
    }
}

/// Interpret `payload` for `id` the same way received frames are interpreted,
/// so the wire bytes are validated before anything is sent.
fn build_message(id: u8, payload: &[u8]) -> CliResult<Message> {
    let message = Message::from_frame(RawFrame::new(id, payload.to_vec()))
        .map_err(|err| frame_error("invalid message", err))?;
    message
        .to_bytes()
        .map_err(|err| frame_error("invalid message", err))?;
    Ok(message)
}

fn exchange(
    machine: &EventMachine,
    message: &Message,
    wait_ack: bool,
    options: &WaitOptions,
) -> CliResult<Option<u8>> {
    machine
        .write_message(message)
        .map_err(|err| event_error("send failed", err))?;
    debug!(id = message.id(), "message sent");

    if !wait_ack {
        return Ok(None);
    }
    machine
        .wait_for_ack_with(message.id(), options)
        .map(Some)
        .map_err(|err| event_error("no response", err))
}
