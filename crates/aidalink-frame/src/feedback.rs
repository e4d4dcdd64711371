//! Execution feedback the controller sends back on the sequence channel.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::Message;
use crate::error::{FrameError, Result};
use crate::message::MessageType;

/// `next_index` value announcing that the last action has run.
pub const SEQUENCE_FINISHED: u32 = 99;

/// One feedback message, carried as a JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceFeedback {
    /// An action finished; `next_index` is the action about to run.
    Ack { next_index: u32 },
    /// Execution aborted after a stop instruction.
    #[serde(rename = "stop")]
    Stopped,
    /// Execution halted after a pause instruction.
    #[serde(rename = "pause")]
    Paused,
}

impl SequenceFeedback {
    /// Decode a feedback message received on the sequence channel.
    pub fn decode(message: &Message) -> Result<Self> {
        match message.message_type() {
            Some(MessageType::Ack | MessageType::StopAck | MessageType::PauseAck) => {
                Ok(serde_json::from_slice(&message.payload)?)
            }
            _ => Err(FrameError::NotFeedback(message.id)),
        }
    }

    /// The message id the controller uses for this feedback.
    pub fn message_type(&self) -> MessageType {
        match self {
            SequenceFeedback::Ack { .. } => MessageType::Ack,
            SequenceFeedback::Stopped => MessageType::StopAck,
            SequenceFeedback::Paused => MessageType::PauseAck,
        }
    }

    /// Encode as a message, the way the controller emits it.
    pub fn to_message(&self) -> Result<Message> {
        let body = serde_json::to_vec(self)?;
        Ok(Message::new(self.message_type().id(), Bytes::from(body)))
    }

    /// Whether the whole sequence has run to completion.
    pub fn is_finished(&self) -> bool {
        matches!(self, SequenceFeedback::Ack { next_index } if *next_index == SEQUENCE_FINISHED)
    }
}
