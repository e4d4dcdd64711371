//! Fixed-header message framing and body codecs for the AIDA robot link.
//!
//! Every message on every channel is framed with a 6-byte big-endian header:
//! - A 2-byte message id (see [`MessageType`])
//! - A 4-byte payload length
//!
//! There is no magic number and no version byte. Bodies are encoded by the
//! helpers in this crate (instructions, joystick axes, action sequences).
//! Nothing here performs I/O.

pub mod action;
pub mod channel;
pub mod codec;
pub mod error;
pub mod feedback;
pub mod message;
pub mod sequence;

pub use action::{Action, ActionKind};
pub use channel::ChannelId;
pub use codec::{
    decode_header, decode_joystick, encode_header, encode_instruction, encode_joystick,
    encode_message, message, Header, Message, HEADER_SIZE, JOYSTICK_BODY_SIZE,
    MAX_PAYLOAD_LENGTH,
};
pub use error::{FrameError, Result};
pub use feedback::{SequenceFeedback, SEQUENCE_FINISHED};
pub use message::{Instruction, MessageType};
pub use sequence::{decode_sequence, encode_sequence, encoded_sequence_len, SequenceMode};
