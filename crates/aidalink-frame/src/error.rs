/// Errors that can occur during header and body encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A received header carried a length with the sign bit set.
    #[error("negative payload length: {0}")]
    NegativeLength(i32),

    /// The header buffer was not exactly six bytes long.
    #[error("invalid header size ({actual} bytes, expected 6)")]
    InvalidHeaderSize { actual: usize },

    /// The body exceeds what the 4-byte length field can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A special action's payload does not fit the 2-byte length prefix.
    #[error("action payload too long ({len} bytes, max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// Joystick axes must lie in [-1.0, 1.0].
    #[error("joystick values must be between -1 and 1 (x={x}, y={y})")]
    JoystickOutOfRange { x: f32, y: f32 },

    /// A body ended before a field it announced.
    #[error("truncated {what}: need {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// An action id that is not in the action catalogue.
    #[error("unknown action id {0}")]
    UnknownAction(u16),

    /// A sequence mode that is neither ON nor OFF.
    #[error("unknown sequence mode {0}")]
    UnknownMode(u16),

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in {what}")]
    InvalidUtf8 { what: &'static str },

    /// A feedback body could not be parsed.
    #[error("malformed feedback: {0}")]
    Feedback(#[from] serde_json::Error),

    /// A message id that does not carry sequence feedback.
    #[error("message id {0} is not sequence feedback")]
    NotFeedback(u16),
}

impl FrameError {
    /// Whether this error describes bytes received from the peer, as opposed
    /// to a caller handing the encoder invalid input.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            FrameError::NegativeLength(_)
            | FrameError::InvalidHeaderSize { .. }
            | FrameError::Truncated { .. }
            | FrameError::UnknownAction(_)
            | FrameError::UnknownMode(_)
            | FrameError::InvalidUtf8 { .. }
            | FrameError::Feedback(_)
            | FrameError::NotFeedback(_) => true,
            FrameError::PayloadTooLarge { .. }
            | FrameError::PayloadTooLong { .. }
            | FrameError::JoystickOutOfRange { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
