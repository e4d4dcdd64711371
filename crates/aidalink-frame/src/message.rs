//! Message ids and instruction values.
//!
//! The numeric values are fixed by the robot controller and must not change.

/// Message id carried in the first two bytes of every header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    Camera = 1,
    ImageAnalysis = 2,
    Mic = 3,
    Stt = 4,
    Lidar = 5,
    ReqVideoFeed = 6,
    ReqStt = 7,
    ReqLidar = 8,
    Text = 9,
    VideoFrame = 10,
    LidarData = 11,
    Audio = 12,
    /// Lidar images streamed by the controller after a lidar request.
    LidarFrame = 13,
    Joystick = 14,
    Sequence = 15,
    Ack = 99,
    /// Sequence aborted after a stop instruction.
    StopAck = 100,
    /// Sequence halted after a pause instruction.
    PauseAck = 101,
}

impl MessageType {
    const ALL: [MessageType; 18] = [
        MessageType::Camera,
        MessageType::ImageAnalysis,
        MessageType::Mic,
        MessageType::Stt,
        MessageType::Lidar,
        MessageType::ReqVideoFeed,
        MessageType::ReqStt,
        MessageType::ReqLidar,
        MessageType::Text,
        MessageType::VideoFrame,
        MessageType::LidarData,
        MessageType::Audio,
        MessageType::LidarFrame,
        MessageType::Joystick,
        MessageType::Sequence,
        MessageType::Ack,
        MessageType::StopAck,
        MessageType::PauseAck,
    ];

    /// The wire value.
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Look up a message type by wire value.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    /// Returns a human-readable name for the message id.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Camera => "camera",
            MessageType::ImageAnalysis => "image-analysis",
            MessageType::Mic => "mic",
            MessageType::Stt => "stt",
            MessageType::Lidar => "lidar",
            MessageType::ReqVideoFeed => "req-video-feed",
            MessageType::ReqStt => "req-stt",
            MessageType::ReqLidar => "req-lidar",
            MessageType::Text => "text",
            MessageType::VideoFrame => "video-frame",
            MessageType::LidarData => "lidar-data",
            MessageType::Audio => "audio",
            MessageType::LidarFrame => "lidar-frame",
            MessageType::Joystick => "joystick",
            MessageType::Sequence => "sequence",
            MessageType::Ack => "ack",
            MessageType::StopAck => "stop-ack",
            MessageType::PauseAck => "pause-ack",
        }
    }
}

/// Value of a 2-byte instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Instruction {
    On = 1,
    Off = 2,
    Gesture = 3,
    Pose = 4,
    Pause = 5,
}

impl Instruction {
    /// The wire value.
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Look up an instruction by wire value.
    pub fn from_value(value: u16) -> Option<Self> {
        match value {
            1 => Some(Instruction::On),
            2 => Some(Instruction::Off),
            3 => Some(Instruction::Gesture),
            4 => Some(Instruction::Pose),
            5 => Some(Instruction::Pause),
            _ => None,
        }
    }
}
