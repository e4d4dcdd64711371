//! Blocking TCP channels for the AIDA robot link.
//!
//! A [`Channel`] owns exactly one TCP connection for one traffic class:
//! - Connect with a mandatory timeout
//! - Whole-message writes
//! - Exact-size reads that gather short reads internally
//! - `close()` from any thread, which unblocks a pending read
//!
//! Every failure is one of the four [`TransportError`] kinds.

pub mod channel;
pub mod config;
pub mod error;
pub mod io;

pub use channel::{Channel, Endpoint};
pub use config::{ChannelConfig, DEFAULT_CONNECT_TIMEOUT};
pub use error::{Result, TransportError};
