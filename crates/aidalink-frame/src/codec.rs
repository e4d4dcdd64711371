use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::message::{Instruction, MessageType};

/// Header: message id (2) + payload length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Joystick body: two 4-byte floats.
pub const JOYSTICK_BODY_SIZE: usize = 8;

/// Largest length a header can carry without setting the sign bit.
pub const MAX_PAYLOAD_LENGTH: usize = i32::MAX as usize;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message id (see [`MessageType`]).
    pub message_id: u16,
    /// Number of body bytes following the header.
    pub payload_length: u32,
}

impl Header {
    /// Create a header.
    pub fn new(message_id: u16, payload_length: u32) -> Self {
        Self {
            message_id,
            payload_length,
        }
    }

    /// The message type, if the id is a known one.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_id(self.message_id)
    }

    /// Payload length as a buffer size.
    pub fn payload_len(&self) -> usize {
        self.payload_length as usize
    }

    /// Encode this header to its wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        encode_header(self.message_id, self.payload_length)
    }
}

/// A complete message: id plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message id from the header.
    pub id: u16,
    /// The message body.
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The message type, if the id is a known one.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_id(self.id)
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a header into its wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────────┐
/// │ Id (2B BE)   │ Length (4B BE) │
/// └──────────────┴────────────────┘
/// ```
pub fn encode_header(message_id: u16, payload_length: u32) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[0..2].copy_from_slice(&message_id.to_be_bytes());
    out[2..6].copy_from_slice(&payload_length.to_be_bytes());
    out
}

/// Decode a six-byte header.
///
/// The length field is signed on the controller side, so a value with the
/// top bit set is rejected instead of being read as a huge unsigned length.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() != HEADER_SIZE {
        return Err(FrameError::InvalidHeaderSize {
            actual: bytes.len(),
        });
    }
    let mut buf = bytes;
    let message_id = buf.get_u16();
    let length = buf.get_i32();
    if length < 0 {
        return Err(FrameError::NegativeLength(length));
    }
    Ok(Header {
        message_id,
        payload_length: length as u32,
    })
}

/// Encode header and body into one contiguous buffer.
///
/// Sending the result with a single write keeps the header and body together
/// on the wire.
pub fn encode_message(message_id: u16, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > MAX_PAYLOAD_LENGTH {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: MAX_PAYLOAD_LENGTH,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_slice(&encode_header(message_id, body.len() as u32));
    dst.put_slice(body);
    Ok(())
}

/// Convenience wrapper around [`encode_message`] returning frozen bytes.
pub fn message(message_type: MessageType, body: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    encode_message(message_type.id(), body, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a 2-byte instruction body.
pub fn encode_instruction(instruction: Instruction) -> [u8; 2] {
    instruction.value().to_be_bytes()
}

/// Encode joystick axes, x then y, as big-endian floats.
///
/// Both axes must lie in [-1.0, 1.0]; NaN is rejected as well.
pub fn encode_joystick(x: f32, y: f32) -> Result<[u8; JOYSTICK_BODY_SIZE]> {
    let in_range = |v: f32| (-1.0..=1.0).contains(&v);
    if !in_range(x) || !in_range(y) {
        return Err(FrameError::JoystickOutOfRange { x, y });
    }
    let mut out = [0u8; JOYSTICK_BODY_SIZE];
    out[0..4].copy_from_slice(&x.to_be_bytes());
    out[4..8].copy_from_slice(&y.to_be_bytes());
    Ok(out)
}

/// Decode a joystick body back into `(x, y)`.
pub fn decode_joystick(bytes: &[u8]) -> Result<(f32, f32)> {
    if bytes.len() < JOYSTICK_BODY_SIZE {
        return Err(FrameError::Truncated {
            what: "joystick body",
            needed: JOYSTICK_BODY_SIZE,
            available: bytes.len(),
        });
    }
    let mut buf = bytes;
    Ok((buf.get_f32(), buf.get_f32()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_edges() {
        let cases = [
            (0u16, 0u32),
            (1, 2),
            (15, 1234),
            (99, 0),
            (u16::MAX, i32::MAX as u32),
            (0x8000, 0x7fff_ffff),
        ];
        for (id, len) in cases {
            let header = decode_header(&encode_header(id, len)).unwrap();
            assert_eq!(header, Header::new(id, len));
        }
    }

    #[test]
    fn header_is_big_endian() {
        assert_eq!(encode_header(15, 3), [0x00, 0x0f, 0x00, 0x00, 0x00, 0x03]);
        assert_eq!(
            encode_header(0x0102, 0x0304_0506),
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]
        );
    }

    #[test]
    fn sign_bit_length_is_protocol_error() {
        let bytes = [0x00, 0x0a, 0x80, 0x00, 0x00, 0x00];
        let err = decode_header(&bytes).unwrap_err();
        assert!(matches!(err, FrameError::NegativeLength(i32::MIN)));
        assert!(err.is_protocol_violation());

        let bytes = encode_header(10, u32::MAX);
        assert!(matches!(
            decode_header(&bytes),
            Err(FrameError::NegativeLength(-1))
        ));
    }

    #[test]
    fn header_wrong_size() {
        let err = decode_header(&[0, 1, 0]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidHeaderSize { actual: 3 }));
    }

    #[test]
    fn message_prefixes_header() {
        let bytes = message(MessageType::Camera, &encode_instruction(Instruction::On)).unwrap();
        assert_eq!(bytes.as_ref(), &[0, 1, 0, 0, 0, 2, 0, 1]);
    }

    #[test]
    fn empty_request_is_header_only() {
        let bytes = message(MessageType::ReqVideoFeed, &[]).unwrap();
        assert_eq!(bytes.as_ref(), &encode_header(6, 0));
    }

    #[test]
    fn message_wire_size() {
        let msg = Message::new(9, Bytes::from_static(b"hello"));
        assert_eq!(msg.wire_size(), HEADER_SIZE + 5);
        assert_eq!(msg.message_type(), Some(MessageType::Text));
    }

    #[test]
    fn joystick_bounds_accepted() {
        let body = encode_joystick(1.0, -1.0).unwrap();
        assert_eq!(body.len(), 8);
        assert_eq!(&body[0..4], &1.0f32.to_be_bytes());
        assert_eq!(&body[4..8], &(-1.0f32).to_be_bytes());
        assert_eq!(decode_joystick(&body).unwrap(), (1.0, -1.0));
    }

    #[test]
    fn joystick_out_of_range_rejected() {
        let err = encode_joystick(1.00001, 0.0).unwrap_err();
        assert!(matches!(err, FrameError::JoystickOutOfRange { .. }));
        assert!(!err.is_protocol_violation());

        assert!(encode_joystick(0.0, -1.5).is_err());
        assert!(encode_joystick(f32::NAN, 0.0).is_err());
    }

    #[test]
    fn decode_joystick_truncated() {
        let err = decode_joystick(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { needed: 8, .. }));
    }
}
