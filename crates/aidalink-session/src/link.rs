//! Application-facing verbs over the connection manager.

use std::time::Duration;

use aidalink_frame::{
    encode_instruction, encode_joystick, encode_sequence, message, ChannelId, Instruction,
    MessageType, SequenceFeedback, SequenceMode,
};
use aidalink_transport::{ChannelConfig, Endpoint, DEFAULT_CONNECT_TIMEOUT};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::manager::{BringUpReport, ConnectionManager};
use crate::settings::SettingsSource;
use crate::source::SequenceSource;
use crate::state::{ConnectionState, StateRegistry};

/// What happens when a device on/off instruction cannot be sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstructionPolicy {
    /// Log a warning and report success. The channel state still changes.
    #[default]
    BestEffort,
    /// Return the error to the caller.
    Propagate,
}

/// Facade configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Per-channel connect timeout used at bring-up.
    pub connect_timeout: Duration,
    pub instruction_policy: InstructionPolicy,
    /// Socket options for every channel.
    pub channel: ChannelConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            instruction_policy: InstructionPolicy::default(),
            channel: ChannelConfig::default(),
        }
    }
}

/// One robot, six channels.
///
/// Every verb routes to a fixed channel and message id. Receives return the
/// raw payload without checking the id the robot put in the header.
pub struct RobotLink {
    manager: ConnectionManager,
    config: LinkConfig,
}

impl Default for RobotLink {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl RobotLink {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            manager: ConnectionManager::with_config(config.channel.clone()),
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn states(&self) -> &StateRegistry {
        self.manager.states()
    }

    pub fn state_of(&self, id: ChannelId) -> ConnectionState {
        self.manager.states().get(id)
    }

    pub fn is_connected(&self, id: ChannelId) -> bool {
        self.manager.is_connected(id)
    }

    /// Read the robot address from `source` and connect every channel.
    ///
    /// Only a settings failure is returned as an error; channel failures are
    /// logged and collected in the report.
    pub fn bring_up(&self, source: &dyn SettingsSource) -> Result<BringUpReport> {
        let settings = source.settings()?;
        Ok(self.connect(&settings.endpoint()))
    }

    /// Connect every channel to `endpoint` concurrently.
    pub fn connect(&self, endpoint: &Endpoint) -> BringUpReport {
        let report =
            self.manager
                .connect_all(&ChannelId::ALL, endpoint, self.config.connect_timeout);
        info!(
            %endpoint,
            connected = report.connected().len(),
            total = ChannelId::ALL.len(),
            "bring-up finished"
        );
        report
    }

    /// Disconnect every channel.
    pub fn disconnect(&self) {
        for id in ChannelId::ALL {
            self.manager.disconnect(id);
        }
    }

    pub fn start_camera(&self) -> Result<()> {
        self.instruct(ChannelId::Video, MessageType::Camera, Instruction::On)
    }

    pub fn stop_camera(&self) -> Result<()> {
        self.instruct(ChannelId::Video, MessageType::Camera, Instruction::Off)
    }

    pub fn start_lidar(&self) -> Result<()> {
        self.instruct(ChannelId::Lidar, MessageType::Lidar, Instruction::On)
    }

    pub fn stop_lidar(&self) -> Result<()> {
        self.instruct(ChannelId::Lidar, MessageType::Lidar, Instruction::Off)
    }

    pub fn start_mic(&self) -> Result<()> {
        self.instruct(ChannelId::Stt, MessageType::Mic, Instruction::On)
    }

    pub fn stop_mic(&self) -> Result<()> {
        self.instruct(ChannelId::Stt, MessageType::Mic, Instruction::Off)
    }

    pub fn start_stt(&self) -> Result<()> {
        self.instruct(ChannelId::Stt, MessageType::Stt, Instruction::On)
    }

    pub fn stop_stt(&self) -> Result<()> {
        self.instruct(ChannelId::Stt, MessageType::Stt, Instruction::Off)
    }

    pub fn start_gesture(&self) -> Result<()> {
        self.instruct(
            ChannelId::Gesture,
            MessageType::ImageAnalysis,
            Instruction::Gesture,
        )
    }

    pub fn stop_gesture(&self) -> Result<()> {
        self.instruct(ChannelId::Gesture, MessageType::ImageAnalysis, Instruction::Off)
    }

    pub fn start_pose(&self) -> Result<()> {
        self.instruct(ChannelId::Gesture, MessageType::ImageAnalysis, Instruction::Pose)
    }

    pub fn stop_pose(&self) -> Result<()> {
        self.instruct(ChannelId::Gesture, MessageType::ImageAnalysis, Instruction::Off)
    }

    /// Send an action list for immediate execution.
    pub fn send_sequence<S: SequenceSource + ?Sized>(&self, source: &S) -> Result<()> {
        let actions = source.actions()?;
        let body = encode_sequence(&actions, SequenceMode::On)?;
        let bytes = message(MessageType::Sequence, &body)?;
        self.manager.send(ChannelId::Sequence, &bytes)?;
        debug!(actions = actions.len(), bytes = bytes.len(), "sequence sent");
        Ok(())
    }

    /// Abort the running sequence.
    pub fn send_stop_sequence(&self) -> Result<()> {
        self.send_instruction(ChannelId::Sequence, MessageType::Sequence, Instruction::Off)
    }

    /// Halt the running sequence after the current action.
    pub fn send_pause_sequence(&self) -> Result<()> {
        self.send_instruction(ChannelId::Sequence, MessageType::Sequence, Instruction::Pause)
    }

    /// Wait for the next ack/stop/pause reply on the sequence channel.
    pub fn receive_sequence_feedback(&self) -> Result<SequenceFeedback> {
        let reply = self.manager.receive_message(ChannelId::Sequence)?;
        match reply.message_type() {
            Some(MessageType::Ack | MessageType::StopAck | MessageType::PauseAck) => {
                Ok(SequenceFeedback::decode(&reply)?)
            }
            _ => Err(SessionError::UnexpectedMessage {
                expected: MessageType::Ack.id(),
                actual: reply.id,
            }),
        }
    }

    /// Send one joystick sample. Out-of-range axes fail before any I/O.
    pub fn send_joystick(&self, x: f32, y: f32) -> Result<()> {
        let body = encode_joystick(x, y)?;
        let bytes = message(MessageType::Joystick, &body)?;
        self.manager.send(ChannelId::Joystick, &bytes)
    }

    pub fn request_video(&self) -> Result<()> {
        self.request(ChannelId::Video, MessageType::ReqVideoFeed)
    }

    /// Next encoded video frame.
    pub fn receive_video(&self) -> Result<Bytes> {
        self.receive_payload(ChannelId::Video)
    }

    pub fn request_lidar(&self) -> Result<()> {
        self.request(ChannelId::Lidar, MessageType::ReqLidar)
    }

    /// Next encoded lidar image.
    pub fn receive_lidar(&self) -> Result<Bytes> {
        self.receive_payload(ChannelId::Lidar)
    }

    pub fn request_stt(&self) -> Result<()> {
        self.request(ChannelId::Stt, MessageType::ReqStt)
    }

    /// Next transcript. Invalid UTF-8 is replaced, never rejected.
    pub fn receive_stt(&self) -> Result<String> {
        let payload = self.receive_payload(ChannelId::Stt)?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    fn instruct(
        &self,
        channel: ChannelId,
        message_type: MessageType,
        instruction: Instruction,
    ) -> Result<()> {
        match self.send_instruction(channel, message_type, instruction) {
            Ok(()) => Ok(()),
            Err(err) if self.config.instruction_policy == InstructionPolicy::BestEffort => {
                warn!(
                    channel = channel.name(),
                    message = message_type.name(),
                    instruction = ?instruction,
                    error = %err,
                    "instruction not delivered"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn send_instruction(
        &self,
        channel: ChannelId,
        message_type: MessageType,
        instruction: Instruction,
    ) -> Result<()> {
        let bytes = message(message_type, &encode_instruction(instruction))?;
        self.manager.send(channel, &bytes)
    }

    fn request(&self, channel: ChannelId, message_type: MessageType) -> Result<()> {
        let bytes = message(message_type, &[])?;
        self.manager.send(channel, &bytes)
    }

    fn receive_payload(&self, channel: ChannelId) -> Result<Bytes> {
        let reply = self.manager.receive_message(channel)?;
        debug!(
            channel = channel.name(),
            id = reply.id,
            bytes = reply.payload.len(),
            "payload received"
        );
        Ok(reply.payload)
    }
}

#[cfg(test)]
mod tests {
    use aidalink_frame::{Action, FrameError};

    use super::*;

    #[test]
    fn joystick_range_checked_before_channel_lookup() {
        let link = RobotLink::default();
        let err = link.send_joystick(1.00001, 0.0).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::JoystickOutOfRange { .. })
        ));
    }

    #[test]
    fn best_effort_instruction_swallows_missing_channel() {
        let link = RobotLink::default();
        assert!(link.start_camera().is_ok());
        assert!(link.stop_gesture().is_ok());
    }

    #[test]
    fn propagate_policy_returns_error() {
        let link = RobotLink::new(LinkConfig {
            instruction_policy: InstructionPolicy::Propagate,
            ..LinkConfig::default()
        });
        let err = link.start_lidar().unwrap_err();
        assert!(matches!(err, SessionError::NotConnected(ChannelId::Lidar)));
    }

    #[test]
    fn sequence_verbs_always_propagate() {
        let link = RobotLink::default();
        assert!(matches!(
            link.send_stop_sequence(),
            Err(SessionError::NotConnected(ChannelId::Sequence))
        ));
        assert!(matches!(
            link.send_sequence(&Vec::<Action>::new()),
            Err(SessionError::NotConnected(ChannelId::Sequence))
        ));
    }

    #[test]
    fn default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.instruction_policy, InstructionPolicy::BestEffort);
    }
}
