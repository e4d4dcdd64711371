//! Connection management and the robot facade for the AIDA robot link.
//!
//! [`ConnectionManager`] owns one TCP channel per [`ChannelId`] and keeps an
//! observable [`StateRegistry`] in step with every connect, disconnect and
//! I/O failure. [`RobotLink`] puts the robot's verbs on top: device
//! instructions, joystick samples, action sequences and frame requests.
//! [`RobotSimulator`] plays the robot's side for bench tests.
//!
//! [`ChannelId`]: aidalink_frame::ChannelId

pub mod error;
pub mod link;
pub mod manager;
pub mod settings;
pub mod simulator;
pub mod source;
pub mod state;

#[cfg(feature = "async")]
pub mod async_link;

#[cfg(feature = "async")]
pub use async_link::AsyncRobotLink;
pub use error::{Result, SessionError};
pub use link::{InstructionPolicy, LinkConfig, RobotLink};
pub use manager::{BringUpReport, ConnectionManager};
pub use settings::{
    EnvSettings, Settings, SettingsSource, DEFAULT_HOST, DEFAULT_PORT, HOST_ENV, PORT_ENV,
};
pub use simulator::{RobotSimulator, SimEvent, SimulatorConfig, SimulatorHandle};
pub use source::{JsonSequence, SequenceSource};
pub use state::{ConnectionState, StateChange, StateRegistry, SUBSCRIBER_CAPACITY};
