use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::action::{Action, ActionKind};
use crate::error::{FrameError, Result};
use crate::message::Instruction;

/// First field of a sequence body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// Execute the actions that follow.
    On,
    /// Stop whatever is executing.
    Off,
}

impl SequenceMode {
    /// The wire value, shared with [`Instruction`].
    pub fn value(self) -> u16 {
        match self {
            SequenceMode::On => Instruction::On.value(),
            SequenceMode::Off => Instruction::Off.value(),
        }
    }

    fn from_value(value: u16) -> Result<Self> {
        match Instruction::from_value(value) {
            Some(Instruction::On) => Ok(SequenceMode::On),
            Some(Instruction::Off) => Ok(SequenceMode::Off),
            _ => Err(FrameError::UnknownMode(value)),
        }
    }
}

/// Number of bytes [`encode_sequence`] produces for `actions`.
pub fn encoded_sequence_len(actions: &[Action]) -> usize {
    2 + actions
        .iter()
        .map(|action| {
            if action.kind.is_special() {
                2 + 2 + action.payload.len()
            } else {
                2
            }
        })
        .sum::<usize>()
}

/// Encode a sequence body.
///
/// ```text
/// mode (2B) { action id (2B) [ payload len (2B) payload (UTF-8) ] }*
/// ```
///
/// The bracketed part is present only for special actions. An empty action
/// list yields the 2-byte mode on its own.
pub fn encode_sequence(actions: &[Action], mode: SequenceMode) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_sequence_len(actions));
    buf.put_u16(mode.value());
    for action in actions {
        buf.put_u16(action.kind.id());
        if action.kind.is_special() {
            let payload = action.payload.as_bytes();
            if payload.len() > u16::MAX as usize {
                return Err(FrameError::PayloadTooLong {
                    len: payload.len(),
                    max: u16::MAX as usize,
                });
            }
            buf.put_u16(payload.len() as u16);
            buf.put_slice(payload);
        }
    }
    Ok(buf.freeze())
}

/// Decode a sequence body, the way the controller parses it.
pub fn decode_sequence(body: &[u8]) -> Result<(SequenceMode, Vec<Action>)> {
    let mut buf = body;
    let mode = SequenceMode::from_value(take_u16(&mut buf, "sequence mode")?)?;

    let mut actions = Vec::new();
    while buf.has_remaining() {
        let id = take_u16(&mut buf, "action id")?;
        let kind = ActionKind::from_id(id).ok_or(FrameError::UnknownAction(id))?;
        if !kind.is_special() {
            actions.push(Action::plain(kind));
            continue;
        }

        let len = take_u16(&mut buf, "action payload length")? as usize;
        if buf.remaining() < len {
            return Err(FrameError::Truncated {
                what: "action payload",
                needed: len,
                available: buf.remaining(),
            });
        }
        let payload = std::str::from_utf8(&buf[..len]).map_err(|_| FrameError::InvalidUtf8 {
            what: "action payload",
        })?;
        actions.push(Action::new(kind, payload));
        buf.advance(len);
    }
    Ok((mode, actions))
}

fn take_u16(buf: &mut &[u8], what: &'static str) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(FrameError::Truncated {
            what,
            needed: 2,
            available: buf.remaining(),
        });
    }
    Ok(buf.get_u16())
}
