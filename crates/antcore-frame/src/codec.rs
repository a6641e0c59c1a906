use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Sync byte that starts every frame.
pub const SYNC: u8 = 0xA4;

/// Bytes around the payload: sync (1) + length (1) + id (1) + checksum (1).
pub const FRAME_OVERHEAD: usize = 4;

/// Largest payload the 1-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// An undecoded frame: message id plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// The message id.
    pub id: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl RawFrame {
    /// Create a new frame.
    pub fn new(id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────────┬──────────────┐
/// │ Sync     │ Length   │ Id       │ Payload      │ Checksum     │
/// │ 0xA4     │ (1B)     │ (1B)     │ (Length B)   │ XOR of prior │
/// └──────────┴──────────┴──────────┴──────────────┴──────────────┘
/// ```
pub fn encode_frame(id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let start = dst.len();
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_u8(SYNC);
    dst.put_u8(payload.len() as u8);
    dst.put_u8(id);
    dst.put_slice(payload);
    let sum = checksum(&dst[start..]);
    dst.put_u8(sum);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// On success returns the frame and the number of bytes it occupied. A
/// [`FrameError::Checksum`] is only reported once the whole frame is
/// buffered, so its declared length can be used to step over it.
pub fn decode_frame(src: &[u8]) -> Result<(RawFrame, usize)> {
    let Some(&first) = src.first() else {
        return Err(FrameError::Incomplete {
            needed: FRAME_OVERHEAD,
        });
    };
    if first != SYNC {
        return Err(FrameError::InvalidSync(first));
    }
    if src.len() < 2 {
        return Err(FrameError::Incomplete {
            needed: FRAME_OVERHEAD - src.len(),
        });
    }

    let declared_len = src[1] as usize;
    let total = declared_len + FRAME_OVERHEAD;
    if src.len() < total {
        return Err(FrameError::Incomplete {
            needed: total - src.len(),
        });
    }

    let expected = checksum(&src[..total - 1]);
    let actual = src[total - 1];
    if expected != actual {
        return Err(FrameError::Checksum {
            declared_len,
            expected,
            actual,
        });
    }

    let frame = RawFrame {
        id: src[2],
        payload: Bytes::copy_from_slice(&src[3..3 + declared_len]),
    };
    Ok((frame, total))
}
