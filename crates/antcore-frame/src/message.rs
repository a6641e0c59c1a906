use bytes::{Bytes, BytesMut};

use crate::codec::{decode_frame, encode_frame, RawFrame};
use crate::error::{FrameError, Result};
use crate::ids;

/// Response or event reported on a channel.
///
/// When `message_id` is [`ids::RF_EVENT`] this is an unsolicited RF event;
/// otherwise it is the response to the command whose id is `message_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelEvent {
    pub channel: u8,
    pub message_id: u8,
    pub code: u8,
}

impl ChannelEvent {
    /// True for RF events that do not answer a command.
    pub fn is_rf_event(&self) -> bool {
        self.message_id == ids::RF_EVENT
    }
}

/// Data payload received on (or sent to) a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelData {
    pub channel: u8,
    pub data: Bytes,
}

/// A decoded ANT message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Channel response/event (`0x40`). The only ack-class message.
    ChannelEvent(ChannelEvent),
    /// Broadcast data (`0x4E`).
    BroadcastData(ChannelData),
    /// Acknowledged data (`0x4F`).
    AcknowledgedData(ChannelData),
    /// One packet of a burst transfer (`0x50`). The channel byte carries the
    /// burst sequence number in its upper bits.
    BurstData(ChannelData),
    /// Module start-up notification (`0x6F`).
    Startup { reason: u8 },
    /// The module rejected a malformed serial message (`0xAE`).
    SerialError { code: u8, detail: Bytes },
    /// Any message this layer does not interpret, including outgoing commands.
    Other(RawFrame),
}

/// Variant tag of a [`Message`], used to wait for a kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ChannelEvent,
    BroadcastData,
    AcknowledgedData,
    BurstData,
    Startup,
    SerialError,
    /// An uninterpreted message with this id.
    Other(u8),
}

impl MessageKind {
    /// True if `message` is of this kind.
    pub fn matches(self, message: &Message) -> bool {
        message.kind() == self
    }
}

impl Message {
    /// The message id used on the wire.
    pub fn id(&self) -> u8 {
        match self {
            Message::ChannelEvent(_) => ids::CHANNEL_EVENT,
            Message::BroadcastData(_) => ids::BROADCAST_DATA,
            Message::AcknowledgedData(_) => ids::ACKNOWLEDGED_DATA,
            Message::BurstData(_) => ids::BURST_DATA,
            Message::Startup { .. } => ids::STARTUP,
            Message::SerialError { .. } => ids::SERIAL_ERROR,
            Message::Other(frame) => frame.id,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::ChannelEvent(_) => MessageKind::ChannelEvent,
            Message::BroadcastData(_) => MessageKind::BroadcastData,
            Message::AcknowledgedData(_) => MessageKind::AcknowledgedData,
            Message::BurstData(_) => MessageKind::BurstData,
            Message::Startup { .. } => MessageKind::Startup,
            Message::SerialError { .. } => MessageKind::SerialError,
            Message::Other(frame) => MessageKind::Other(frame.id),
        }
    }

    /// The channel event carried by this message, if it is ack-class.
    pub fn as_channel_event(&self) -> Option<&ChannelEvent> {
        match self {
            Message::ChannelEvent(event) => Some(event),
            _ => None,
        }
    }

    /// Payload bytes as they appear on the wire.
    pub fn payload(&self) -> Bytes {
        match self {
            Message::ChannelEvent(event) => {
                Bytes::copy_from_slice(&[event.channel, event.message_id, event.code])
            }
            Message::BroadcastData(data)
            | Message::AcknowledgedData(data)
            | Message::BurstData(data) => {
                let mut out = Vec::with_capacity(1 + data.data.len());
                out.push(data.channel);
                out.extend_from_slice(&data.data);
                Bytes::from(out)
            }
            Message::Startup { reason } => Bytes::copy_from_slice(&[*reason]),
            Message::SerialError { code, detail } => {
                let mut out = Vec::with_capacity(1 + detail.len());
                out.push(*code);
                out.extend_from_slice(detail);
                Bytes::from(out)
            }
            Message::Other(frame) => frame.payload.clone(),
        }
    }

    /// Append the framed message to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.id(), &self.payload(), dst)
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Interpret a checksum-verified frame.
    pub fn from_frame(frame: RawFrame) -> Result<Self> {
        let id = frame.id;
        let payload = frame.payload.clone();
        let invalid = |reason: &'static str| FrameError::InvalidPayload {
            id,
            declared_len: payload.len(),
            reason,
        };

        let message = match frame.id {
            ids::CHANNEL_EVENT => {
                if payload.len() < 3 {
                    return Err(invalid("channel event needs channel, message id and code"));
                }
                Message::ChannelEvent(ChannelEvent {
                    channel: payload[0],
                    message_id: payload[1],
                    code: payload[2],
                })
            }
            ids::BROADCAST_DATA | ids::ACKNOWLEDGED_DATA | ids::BURST_DATA => {
                if payload.is_empty() {
                    return Err(invalid("data message needs a channel number"));
                }
                let data = ChannelData {
                    channel: payload[0],
                    data: payload.slice(1..),
                };
                match frame.id {
                    ids::BROADCAST_DATA => Message::BroadcastData(data),
                    ids::ACKNOWLEDGED_DATA => Message::AcknowledgedData(data),
                    _ => Message::BurstData(data),
                }
            }
            ids::STARTUP => {
                if payload.is_empty() {
                    return Err(invalid("startup message needs a reason byte"));
                }
                Message::Startup { reason: payload[0] }
            }
            ids::SERIAL_ERROR => {
                if payload.is_empty() {
                    return Err(invalid("serial error needs an error code"));
                }
                Message::SerialError {
                    code: payload[0],
                    detail: payload.slice(1..),
                }
            }
            _ => Message::Other(frame),
        };
        Ok(message)
    }

    fn command(id: u8, payload: &[u8]) -> Self {
        Message::Other(RawFrame::new(id, Bytes::copy_from_slice(payload)))
    }

    pub fn reset_system() -> Self {
        Self::command(ids::RESET_SYSTEM, &[0x00])
    }

    pub fn open_channel(channel: u8) -> Self {
        Self::command(ids::OPEN_CHANNEL, &[channel])
    }

    pub fn close_channel(channel: u8) -> Self {
        Self::command(ids::CLOSE_CHANNEL, &[channel])
    }

    pub fn assign_channel(channel: u8, channel_type: u8, network: u8) -> Self {
        Self::command(ids::ASSIGN_CHANNEL, &[channel, channel_type, network])
    }

    pub fn unassign_channel(channel: u8) -> Self {
        Self::command(ids::UNASSIGN_CHANNEL, &[channel])
    }

    pub fn set_network_key(network: u8, key: [u8; 8]) -> Self {
        let mut payload = [0u8; 9];
        payload[0] = network;
        payload[1..].copy_from_slice(&key);
        Self::command(ids::NETWORK_KEY, &payload)
    }

    pub fn set_channel_id(
        channel: u8,
        device_number: u16,
        device_type: u8,
        transmission_type: u8,
    ) -> Self {
        let [lo, hi] = device_number.to_le_bytes();
        Self::command(
            ids::CHANNEL_ID,
            &[channel, lo, hi, device_type, transmission_type],
        )
    }

    /// Message period in units of 1/32768 s.
    pub fn set_channel_period(channel: u8, period: u16) -> Self {
        let [lo, hi] = period.to_le_bytes();
        Self::command(ids::CHANNEL_PERIOD, &[channel, lo, hi])
    }

    /// Search timeout in units of 2.5 s; `0xFF` disables it.
    pub fn set_channel_search_timeout(channel: u8, timeout: u8) -> Self {
        Self::command(ids::CHANNEL_SEARCH_TIMEOUT, &[channel, timeout])
    }

    /// RF frequency as an offset in MHz from 2400 MHz.
    pub fn set_channel_rf_freq(channel: u8, frequency: u8) -> Self {
        Self::command(ids::CHANNEL_RF_FREQ, &[channel, frequency])
    }

    /// Ask the module to send message `id` for `channel`.
    pub fn request_message(channel: u8, id: u8) -> Self {
        Self::command(ids::REQUEST_MESSAGE, &[channel, id])
    }

    pub fn broadcast_data(channel: u8, data: [u8; 8]) -> Self {
        Message::BroadcastData(ChannelData {
            channel,
            data: Bytes::copy_from_slice(&data),
        })
    }

    pub fn acknowledged_data(channel: u8, data: [u8; 8]) -> Self {
        Message::AcknowledgedData(ChannelData {
            channel,
            data: Bytes::copy_from_slice(&data),
        })
    }
}

/// Decode one message from the front of `src`, returning it with the number
/// of bytes consumed.
pub fn decode_message(src: &[u8]) -> Result<(Message, usize)> {
    let (frame, consumed) = decode_frame(src)?;
    let message = Message::from_frame(frame)?;
    Ok((message, consumed))
}
