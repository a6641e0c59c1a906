//! Message ids and channel event codes.
//!
//! Only the ids this layer constructs or distinguishes are listed; anything
//! else decodes as [`crate::Message::Other`].

/// Marker used in a channel event's `message_id` for RF events that are not a
/// response to any command.
pub const RF_EVENT: u8 = 0x01;

pub const VERSION: u8 = 0x3E;
pub const CHANNEL_EVENT: u8 = 0x40;
pub const UNASSIGN_CHANNEL: u8 = 0x41;
pub const ASSIGN_CHANNEL: u8 = 0x42;
pub const CHANNEL_PERIOD: u8 = 0x43;
pub const CHANNEL_SEARCH_TIMEOUT: u8 = 0x44;
pub const CHANNEL_RF_FREQ: u8 = 0x45;
pub const NETWORK_KEY: u8 = 0x46;
pub const TRANSMIT_POWER: u8 = 0x47;
pub const RESET_SYSTEM: u8 = 0x4A;
pub const OPEN_CHANNEL: u8 = 0x4B;
pub const CLOSE_CHANNEL: u8 = 0x4C;
pub const REQUEST_MESSAGE: u8 = 0x4D;
pub const BROADCAST_DATA: u8 = 0x4E;
pub const ACKNOWLEDGED_DATA: u8 = 0x4F;
pub const BURST_DATA: u8 = 0x50;
pub const CHANNEL_ID: u8 = 0x51;
pub const CHANNEL_STATUS: u8 = 0x52;
pub const CAPABILITIES: u8 = 0x54;
pub const SERIAL_NUMBER: u8 = 0x61;
pub const STARTUP: u8 = 0x6F;
pub const SERIAL_ERROR: u8 = 0xAE;

pub const RESPONSE_NO_ERROR: u8 = 0x00;
pub const EVENT_RX_SEARCH_TIMEOUT: u8 = 0x01;
pub const EVENT_RX_FAIL: u8 = 0x02;
pub const EVENT_TX: u8 = 0x03;
pub const EVENT_TRANSFER_RX_FAILED: u8 = 0x04;
pub const EVENT_TRANSFER_TX_COMPLETED: u8 = 0x05;
pub const EVENT_TRANSFER_TX_FAILED: u8 = 0x06;
pub const EVENT_CHANNEL_CLOSED: u8 = 0x07;
pub const EVENT_RX_FAIL_GO_TO_SEARCH: u8 = 0x08;
pub const EVENT_CHANNEL_COLLISION: u8 = 0x09;
pub const EVENT_TRANSFER_TX_START: u8 = 0x0A;
pub const CHANNEL_IN_WRONG_STATE: u8 = 0x15;
pub const CHANNEL_NOT_OPENED: u8 = 0x16;
pub const CHANNEL_ID_NOT_SET: u8 = 0x18;
pub const CLOSE_ALL_CHANNELS: u8 = 0x19;
pub const TRANSFER_IN_PROGRESS: u8 = 0x1F;
pub const TRANSFER_SEQUENCE_NUMBER_ERROR: u8 = 0x20;
pub const TRANSFER_IN_ERROR: u8 = 0x21;
pub const INVALID_MESSAGE: u8 = 0x28;
pub const INVALID_NETWORK_NUMBER: u8 = 0x29;
pub const INVALID_LIST_ID: u8 = 0x30;
pub const INVALID_SCAN_TX_CHANNEL: u8 = 0x31;
pub const INVALID_PARAMETER_PROVIDED: u8 = 0x33;
pub const EVENT_QUEUE_OVERFLOW: u8 = 0x35;

/// Returns a human-readable name for a message id.
pub fn message_name(id: u8) -> &'static str {
    match id {
        VERSION => "VERSION",
        CHANNEL_EVENT => "CHANNEL_EVENT",
        UNASSIGN_CHANNEL => "UNASSIGN_CHANNEL",
        ASSIGN_CHANNEL => "ASSIGN_CHANNEL",
        CHANNEL_PERIOD => "CHANNEL_PERIOD",
        CHANNEL_SEARCH_TIMEOUT => "CHANNEL_SEARCH_TIMEOUT",
        CHANNEL_RF_FREQ => "CHANNEL_RF_FREQ",
        NETWORK_KEY => "NETWORK_KEY",
        TRANSMIT_POWER => "TRANSMIT_POWER",
        RESET_SYSTEM => "RESET_SYSTEM",
        OPEN_CHANNEL => "OPEN_CHANNEL",
        CLOSE_CHANNEL => "CLOSE_CHANNEL",
        REQUEST_MESSAGE => "REQUEST_MESSAGE",
        BROADCAST_DATA => "BROADCAST_DATA",
        ACKNOWLEDGED_DATA => "ACKNOWLEDGED_DATA",
        BURST_DATA => "BURST_DATA",
        CHANNEL_ID => "CHANNEL_ID",
        CHANNEL_STATUS => "CHANNEL_STATUS",
        CAPABILITIES => "CAPABILITIES",
        SERIAL_NUMBER => "SERIAL_NUMBER",
        STARTUP => "STARTUP",
        SERIAL_ERROR => "SERIAL_ERROR",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a channel event code.
pub fn event_name(code: u8) -> &'static str {
    match code {
        RESPONSE_NO_ERROR => "RESPONSE_NO_ERROR",
        EVENT_RX_SEARCH_TIMEOUT => "EVENT_RX_SEARCH_TIMEOUT",
        EVENT_RX_FAIL => "EVENT_RX_FAIL",
        EVENT_TX => "EVENT_TX",
        EVENT_TRANSFER_RX_FAILED => "EVENT_TRANSFER_RX_FAILED",
        EVENT_TRANSFER_TX_COMPLETED => "EVENT_TRANSFER_TX_COMPLETED",
        EVENT_TRANSFER_TX_FAILED => "EVENT_TRANSFER_TX_FAILED",
        EVENT_CHANNEL_CLOSED => "EVENT_CHANNEL_CLOSED",
        EVENT_RX_FAIL_GO_TO_SEARCH => "EVENT_RX_FAIL_GO_TO_SEARCH",
        EVENT_CHANNEL_COLLISION => "EVENT_CHANNEL_COLLISION",
        EVENT_TRANSFER_TX_START => "EVENT_TRANSFER_TX_START",
        CHANNEL_IN_WRONG_STATE => "CHANNEL_IN_WRONG_STATE",
        CHANNEL_NOT_OPENED => "CHANNEL_NOT_OPENED",
        CHANNEL_ID_NOT_SET => "CHANNEL_ID_NOT_SET",
        CLOSE_ALL_CHANNELS => "CLOSE_ALL_CHANNELS",
        TRANSFER_IN_PROGRESS => "TRANSFER_IN_PROGRESS",
        TRANSFER_SEQUENCE_NUMBER_ERROR => "TRANSFER_SEQUENCE_NUMBER_ERROR",
        TRANSFER_IN_ERROR => "TRANSFER_IN_ERROR",
        INVALID_MESSAGE => "INVALID_MESSAGE",
        INVALID_NETWORK_NUMBER => "INVALID_NETWORK_NUMBER",
        INVALID_LIST_ID => "INVALID_LIST_ID",
        INVALID_SCAN_TX_CHANNEL => "INVALID_SCAN_TX_CHANNEL",
        INVALID_PARAMETER_PROVIDED => "INVALID_PARAMETER_PROVIDED",
        EVENT_QUEUE_OVERFLOW => "EVENT_QUEUE_OVERFLOW",
        _ => "UNKNOWN",
    }
}

/// Returns true if `code` reports success for a command response.
pub fn is_success(code: u8) -> bool {
    code == RESPONSE_NO_ERROR
}
