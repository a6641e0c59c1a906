use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use antcore_frame::{event_name, message_name, Message};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput {
    id: String,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'static str>,
    payload: String,
    timestamp: String,
}

impl MessageOutput {
    fn from_message(message: &Message) -> Self {
        let channel = match message {
            Message::ChannelEvent(event) => Some(event.channel),
            Message::BroadcastData(data)
            | Message::AcknowledgedData(data)
            | Message::BurstData(data) => Some(data.channel),
            _ => None,
        };
        let (response_to, event) = match message.as_channel_event() {
            Some(event) if event.is_rf_event() => (None, Some(event_name(event.code))),
            Some(event) => (
                Some(message_name(event.message_id).to_string()),
                Some(event_name(event.code)),
            ),
            None => (None, None),
        };

        Self {
            id: format!("0x{:02X}", message.id()),
            name: message_name(message.id()),
            channel,
            response_to,
            event,
            payload: hex::encode_upper(message.payload()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_messages(messages: &[Message], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = message_table();
            for message in messages {
                table.add_row(table_row(&MessageOutput::from_message(message)));
            }
            println!("{table}");
        }
        _ => {
            for message in messages {
                print_message(message, format);
            }
        }
    }
}

pub fn print_message(message: &Message, format: OutputFormat) {
    let out = MessageOutput::from_message(message);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = message_table();
            table.add_row(table_row(&out));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("{} {}", out.id, out.name);
            if let Some(channel) = out.channel {
                line.push_str(&format!(" channel={channel}"));
            }
            if let Some(response_to) = &out.response_to {
                line.push_str(&format!(" response_to={response_to}"));
            }
            if let Some(event) = out.event {
                line.push_str(&format!(" event={event}"));
            }
            line.push_str(&format!(" payload={}", out.payload));
            println!("{line}");
        }
        OutputFormat::Raw => match message.to_bytes() {
            Ok(bytes) => print_raw(&bytes),
            Err(err) => tracing::warn!(error = %err, "message could not be re-encoded"),
        },
    }
}

#[derive(Serialize)]
struct AckOutput {
    request: String,
    request_name: &'static str,
    code: String,
    event: &'static str,
    success: bool,
}

/// Print the event code a command was answered with.
pub fn print_ack(message_id: u8, code: u8, format: OutputFormat) {
    let out = AckOutput {
        request: format!("0x{message_id:02X}"),
        request_name: message_name(message_id),
        code: format!("0x{code:02X}"),
        event: event_name(code),
        success: antcore_frame::ids::is_success(code),
    };
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["REQUEST", "CODE", "EVENT"])
                .add_row(vec![
                    format!("{} {}", out.request, out.request_name),
                    out.code.clone(),
                    out.event.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{} {} -> {} {}", out.request, out.request_name, out.code, out.event);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn message_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "NAME", "CHANNEL", "EVENT", "PAYLOAD"]);
    table
}

fn table_row(out: &MessageOutput) -> Vec<String> {
    let event = match (&out.response_to, out.event) {
        (Some(response_to), Some(event)) => format!("{response_to}: {event}"),
        (None, Some(event)) => event.to_string(),
        _ => "-".to_string(),
    };
    vec![
        out.id.clone(),
        out.name.to_string(),
        out.channel.map_or_else(|| "-".to_string(), |c| c.to_string()),
        event,
        out.payload.clone(),
    ]
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
