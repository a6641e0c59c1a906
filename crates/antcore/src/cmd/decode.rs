use std::time::{Duration, Instant};

use antcore_event::{EventConfig, EventMachine};
use antcore_frame::{Framer, FramerStats, Message};
use antcore_transport::MemoryDriver;
use serde::Serialize;

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{event_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_messages, OutputFormat};

const REPLAY_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct DecodeSummary {
    messages: usize,
    checksum_failures: u64,
    invalid_frames: u64,
    resync_bytes: u64,
    remaining: String,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;

    if args.pump {
        let messages = replay(&bytes)?;
        print_messages(&messages, format);
        return Ok(SUCCESS);
    }

    let mut framer = Framer::new();
    framer.extend(&bytes);
    let messages = framer.drain_messages();
    print_messages(&messages, format);
    print_summary(&framer.stats(), framer.remaining(), format);

    Ok(SUCCESS)
}

/// Push `bytes` through a running event machine and collect what its message
/// observer queued.
fn replay(bytes: &[u8]) -> CliResult<Vec<Message>> {
    let (driver, handle) = MemoryDriver::preloaded(bytes);
    let config = EventConfig {
        // Every frame is at least 4 bytes; nothing may be evicted.
        message_queue_capacity: bytes.len() / 4 + 1,
        ..EventConfig::default()
    };
    let machine = EventMachine::with_config(driver, config);
    machine
        .start()
        .map_err(|err| event_error("pump start failed", err))?;

    let started = Instant::now();
    while handle.pending() > 0 {
        if started.elapsed() >= REPLAY_DEADLINE {
            machine.stop();
            return Err(CliError::new(INTERNAL, "replay did not drain in time"));
        }
        std::thread::sleep(machine.config().pump_interval);
    }
    // One more read observes the drained driver, so the last chunk has been
    // dispatched by the time the pump stops.
    let reads = handle.read_count();
    while handle.read_count() <= reads && started.elapsed() < REPLAY_DEADLINE {
        std::thread::sleep(machine.config().pump_interval);
    }
    machine.stop();

    Ok(machine.message_queue().snapshot())
}

fn print_summary(stats: &FramerStats, remaining: &[u8], format: OutputFormat) {
    let summary = DecodeSummary {
        messages: stats.messages as usize,
        checksum_failures: stats.checksum_failures,
        invalid_frames: stats.invalid_frames,
        resync_bytes: stats.resync_bytes,
        remaining: hex::encode_upper(remaining),
    };
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "messages={} checksum_failures={} invalid_frames={} resync_bytes={} remaining={}",
                summary.messages,
                summary.checksum_failures,
                summary.invalid_frames,
                summary.resync_bytes,
                if summary.remaining.is_empty() {
                    "-"
                } else {
                    summary.remaining.as_str()
                }
            );
        }
        OutputFormat::Raw => {}
    }
}
