/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The first byte of the buffer is not the sync byte.
    #[error("invalid sync byte 0x{0:02X} (expected 0xA4)")]
    InvalidSync(u8),

    /// The buffer ends before the frame does.
    #[error("incomplete frame ({needed} more bytes needed)")]
    Incomplete { needed: usize },

    /// The frame is complete but its checksum does not match.
    #[error("checksum mismatch on {declared_len}-byte payload (expected 0x{expected:02X}, got 0x{actual:02X})")]
    Checksum {
        declared_len: usize,
        expected: u8,
        actual: u8,
    },

    /// The payload exceeds what the 1-byte length field can describe.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame is intact but its payload is too short for its message id.
    #[error("invalid payload for message 0x{id:02X} ({declared_len} bytes): {reason}")]
    InvalidPayload {
        id: u8,
        declared_len: usize,
        reason: &'static str,
    },
}

impl FrameError {
    /// Wire size of the offending frame when it is known to be complete and
    /// can be skipped as a unit.
    pub fn skippable_len(&self) -> Option<usize> {
        match self {
            FrameError::Checksum { declared_len, .. }
            | FrameError::InvalidPayload { declared_len, .. } => {
                Some(declared_len + crate::codec::FRAME_OVERHEAD)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
