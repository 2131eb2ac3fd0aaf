//! Length-delimited, checksummed frames for sync messages.
//!
//! A frame on the wire is:
//!
//!   `<varint length><bincode SyncMessage><crc16 big-endian>`
//!
//! where length covers the payload and the checksum. [`SyncFramer`] can be fed arbitrary
//! chunks of a byte stream and yields whole frames when available. It applies a size limit
//! and resynchronizes on malformed input by dropping the leading byte.
use bytes::{Buf, BytesMut};
use crc::{Crc, CRC_16_IBM_SDLC};

use crate::errors::ToolModeError;
use crate::sync::SyncMessage;

/// Identifiers are short; anything larger is garbage.
pub const MAX_FRAME_SIZE: usize = 4 * 1024;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

fn write_varint(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Encode one message into a complete frame.
pub fn encode_frame(msg: &SyncMessage) -> Result<Vec<u8>, ToolModeError> {
    let mut body = bincode::serialize(msg)?;
    let crc = CRC16.checksum(&body);
    body.extend_from_slice(&crc.to_be_bytes());
    if body.len() > MAX_FRAME_SIZE {
        return Err(ToolModeError::MalformedFrame(format!(
            "frame of {} bytes exceeds {}",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }
    let mut out = Vec::with_capacity(body.len() + 3);
    write_varint(body.len(), &mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Verify the checksum of a frame body (length prefix already removed) and decode it.
pub fn decode_body(body: &[u8]) -> Result<SyncMessage, ToolModeError> {
    if body.len() < 2 {
        return Err(ToolModeError::MalformedFrame("frame shorter than checksum".to_string()));
    }
    let (payload, trailer) = body.split_at(body.len() - 2);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    let actual = CRC16.checksum(payload);
    if expected != actual {
        return Err(ToolModeError::MalformedFrame(format!(
            "checksum mismatch: expected {:04x}, got {:04x}",
            expected, actual
        )));
    }
    Ok(bincode::deserialize(payload)?)
}

/// Incremental frame splitter for one sender's byte stream.
pub struct SyncFramer {
    buf: BytesMut,
}

impl Default for SyncFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Attempt to extract the next complete frame body. Returns `None` when more bytes are
    /// needed or after dropping a byte to resynchronize on an oversize/invalid length.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            return None;
        }

        let mut len: usize = 0;
        let mut shift = 0u32;
        let mut varint_len = 0usize;
        let mut terminated = false;
        for b in self.buf.iter() {
            varint_len += 1;
            len |= ((b & 0x7F) as usize) << shift;
            if (b & 0x80) == 0 {
                terminated = true;
                break;
            }
            shift += 7;
            if shift > 21 {
                self.buf.advance(1);
                return None;
            }
        }
        if !terminated {
            return None;
        }

        if len > MAX_FRAME_SIZE || len < 2 {
            self.buf.advance(1);
            return None;
        }
        if self.buf.len() < varint_len + len {
            return None;
        }

        self.buf.advance(varint_len);
        Some(self.buf.split_to(len).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::AssetCode;
    use crate::selection::TreeKey;

    fn msg() -> SyncMessage {
        SyncMessage::new(
            TreeKey::Item,
            AssetCode::parse("game:scythe-copper").unwrap(),
            Some(AssetCode::parse("game:scythe-trim").unwrap()),
        )
    }

    #[test]
    fn frames_split_across_chunks() {
        let frame = encode_frame(&msg()).unwrap();
        let mut framer = SyncFramer::new();
        let (a, b) = frame.split_at(frame.len() / 2);
        framer.push(a);
        assert!(framer.next_frame().is_none());
        framer.push(b);
        let body = framer.next_frame().expect("complete frame");
        assert_eq!(decode_body(&body).unwrap(), msg());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let frame = encode_frame(&msg()).unwrap();
        let mut body = frame[1..].to_vec();
        body[4] ^= 0xFF;
        assert!(matches!(decode_body(&body), Err(ToolModeError::MalformedFrame(_))));
    }

    #[test]
    fn oversize_length_resyncs() {
        let mut framer = SyncFramer::new();
        // varint for 0x10000, well above the limit
        framer.push(&[0x80, 0x80, 0x04]);
        assert!(framer.next_frame().is_none());
        assert_eq!(framer.buffered(), 2);

        let frame = encode_frame(&msg()).unwrap();
        let mut clean = SyncFramer::new();
        clean.push(&frame);
        clean.push(&frame);
        assert!(clean.next_frame().is_some());
        assert!(clean.next_frame().is_some());
        assert!(clean.next_frame().is_none());
    }
}
