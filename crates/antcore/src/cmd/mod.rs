use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every message a radio module reports.
    Monitor(MonitorArgs),
    /// Send one message, optionally waiting for the module's answer.
    Send(SendArgs),
    /// Frame a hex byte string offline and print the messages found.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial device of the ANT stick (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value = "115200")]
    pub baud: u32,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device of the ANT stick.
    pub device: PathBuf,
    /// Message id, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_byte)]
    pub id: u8,
    /// Payload as hex (e.g. 00 or "01 4b").
    #[arg(long, default_value = "")]
    pub payload: String,
    /// Line speed.
    #[arg(long, default_value = "115200")]
    pub baud: u32,
    /// Wait for the channel event answering this message and print it.
    #[arg(long)]
    pub wait_ack: bool,
    /// Maximum time to wait when --wait-ack is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Bytes as hex. Whitespace and ':' separators are ignored.
    pub hex: String,
    /// Replay the bytes through the event pump instead of the bare framer.
    #[arg(long)]
    pub pump: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex input, ignoring whitespace and ':' separators.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    hex::decode(digits).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid byte {input:?}: {err}"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(unix)]
pub fn open_device(
    device: &std::path::Path,
    baud: u32,
) -> CliResult<antcore_transport::SerialDriver> {
    use antcore_transport::{SerialConfig, SerialDriver};

    let config = SerialConfig {
        baud_rate: baud,
        ..SerialConfig::default()
    };
    SerialDriver::open_with_config(device, config)
        .map_err(|err| crate::exit::transport_error("open failed", err))
}

#[cfg(not(unix))]
pub fn open_device(
    device: &std::path::Path,
    _baud: u32,
) -> CliResult<antcore_transport::MemoryDriver> {
    Err(CliError::new(
        USAGE,
        format!(
            "serial devices are not supported on this platform: {}",
            device.display()
        ),
    ))
}
