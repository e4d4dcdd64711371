//! Multi-channel TCP link to the AIDA robot controller.
//!
//! The robot is driven over six independent TCP connections to one
//! `host:port`, each carrying one traffic class, all using the same 6-byte
//! big-endian header framing.
//!
//! # Crate Structure
//!
//! - [`frame`] — Header framing and body codecs (instructions, joystick, sequences)
//! - [`transport`] — Blocking TCP channels with exact-size reads
//! - [`session`] — Connection manager, state registry and the `RobotLink` facade

/// Re-export frame types.
pub mod frame {
    pub use aidalink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use aidalink_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use aidalink_session::*;
}
