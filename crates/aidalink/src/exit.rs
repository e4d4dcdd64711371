use std::fmt;
use std::io;

use aidalink_frame::FrameError;
use aidalink_session::SessionError;
use aidalink_transport::TransportError;

// Process exit codes. 124 matches timeout(1), 64 matches sysexits EX_USAGE.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => FAILURE,
        io::ErrorKind::InvalidInput => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::ConnectionFailed { source, host, port } => {
            io_error(&format!("{context} ({host}:{port})"), source)
        }
        TransportError::ReadTimeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::Protocol(err) => frame_error(context, err),
        TransportError::Disconnected(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    if err.is_protocol_violation() {
        return CliError::new(DATA_INVALID, format!("{context}: {err}"));
    }
    match err {
        FrameError::JoystickOutOfRange { .. } | FrameError::PayloadTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::NotConnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        SessionError::UnexpectedMessage { .. } | SessionError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::Settings(_) => CliError::new(USAGE, format!("{context}: {err}")),
        SessionError::Task(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connect_is_failure() {
        let err = transport_error(
            "connect failed",
            TransportError::ConnectionFailed {
                host: "127.0.0.1".to_string(),
                port: 6662,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("127.0.0.1:6662"));
    }

    #[test]
    fn timeouts_map_to_124() {
        let connect = transport_error(
            "connect failed",
            TransportError::ConnectionFailed {
                host: "10.0.0.9".to_string(),
                port: 6662,
                source: io::Error::from(io::ErrorKind::TimedOut),
            },
        );
        assert_eq!(connect.code, TIMEOUT);

        let read = session_error(
            "receive failed",
            SessionError::Transport(TransportError::ReadTimeout(io::Error::from(
                io::ErrorKind::WouldBlock,
            ))),
        );
        assert_eq!(read.code, TIMEOUT);
    }

    #[test]
    fn protocol_and_contract_errors_differ() {
        let protocol = session_error(
            "receive failed",
            SessionError::Transport(TransportError::Protocol(FrameError::NegativeLength(-1))),
        );
        assert_eq!(protocol.code, DATA_INVALID);

        let contract = session_error(
            "send failed",
            SessionError::Frame(FrameError::JoystickOutOfRange { x: 2.0, y: 0.0 }),
        );
        assert_eq!(contract.code, USAGE);
    }

    #[test]
    fn disconnect_is_transport_error() {
        let err = session_error(
            "receive failed",
            SessionError::Transport(TransportError::Disconnected(None)),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
