use antcore_event::{CancellationToken, EventError, EventMachine, WaitOptions};
use tracing::info;

use crate::cmd::{open_device, MonitorArgs};
use crate::exit::{event_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let driver = open_device(&args.device, args.baud)?;
    let machine = EventMachine::new(driver);

    let shutdown = CancellationToken::new();
    install_ctrlc_handler(shutdown.clone())?;

    machine
        .start()
        .map_err(|err| event_error("pump start failed", err))?;
    info!(device = %args.device.display(), baud = args.baud, "monitoring");

    let result = print_until(&machine, args.count, &WaitOptions::new().with_cancel(shutdown), format);
    machine.stop();
    result
}

/// Print queued messages oldest first until `count` is reached or the wait is
/// cancelled.
fn print_until(
    machine: &EventMachine,
    count: Option<usize>,
    options: &WaitOptions,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;
    while count.map_or(true, |count| printed < count) {
        match machine.wait_for_message_where_with(|_| true, options) {
            Ok(message) => {
                print_message(&message, format);
                printed = printed.saturating_add(1);
            }
            Err(EventError::Cancelled) => break,
            Err(err) => return Err(event_error("receive failed", err)),
        }
    }
    info!(printed, "monitor finished");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use antcore_frame::Message;
    use antcore_transport::MemoryDriver;

    use super::*;

    #[test]
    fn stops_after_count() {
        let mut bytes = Vec::new();
        for reason in 0..3u8 {
            bytes.extend(Message::Startup { reason }.to_bytes().expect("encode").to_vec());
        }
        let (driver, _handle) = MemoryDriver::preloaded(&bytes);
        let machine = EventMachine::new(driver);
        machine.start().expect("start");

        let code = print_until(&machine, Some(2), &WaitOptions::new(), OutputFormat::Json)
            .expect("monitor");
        machine.stop();

        assert_eq!(code, SUCCESS);
    }

    #[test]
    fn cancellation_ends_cleanly() {
        let (driver, _handle) = MemoryDriver::pair();
        let machine = EventMachine::new(driver);
        let token = CancellationToken::new();
        token.cancel();

        let code = print_until(
            &machine,
            None,
            &WaitOptions::new().with_cancel(token),
            OutputFormat::Pretty,
        )
        .expect("monitor");
        assert_eq!(code, SUCCESS);
    }
}
