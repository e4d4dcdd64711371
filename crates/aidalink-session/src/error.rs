use aidalink_frame::{ChannelId, FrameError};
use aidalink_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error, including caller contract violations such as an
    /// out-of-range joystick axis.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No open channel for the requested traffic class.
    #[error("channel {0} is not connected")]
    NotConnected(ChannelId),

    /// The robot answered with a message id the caller did not expect.
    #[error("expected message {expected}, got {actual}")]
    UnexpectedMessage { expected: u16, actual: u16 },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection parameters could not be obtained.
    #[error("settings error: {0}")]
    Settings(String),

    /// A background task failed to complete.
    #[error("task failed: {0}")]
    Task(String),
}

impl SessionError {
    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            SessionError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
