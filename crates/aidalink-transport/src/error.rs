use aidalink_frame::FrameError;

/// Errors that can occur on a channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not establish the connection. Only produced by `open`.
    #[error("cannot connect to robot at {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// A read exceeded the configured read timeout.
    #[error("read timed out: {0}")]
    ReadTimeout(std::io::Error),

    /// The peer closed the stream or an I/O error broke it mid-stream.
    #[error("robot disconnected unexpectedly")]
    Disconnected(#[source] Option<std::io::Error>),

    /// The peer sent bytes that violate the framing rules.
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),
}

impl TransportError {
    /// Short machine-readable kind, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::ConnectionFailed { .. } => "connection_failed",
            TransportError::ReadTimeout(_) => "read_timeout",
            TransportError::Disconnected(_) => "disconnected",
            TransportError::Protocol(_) => "protocol",
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
