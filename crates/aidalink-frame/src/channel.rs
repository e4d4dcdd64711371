//! Logical channel ids.
//!
//! Each channel is its own TCP connection to the same robot endpoint. The
//! id never goes on the wire; it only selects the connection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One dedicated connection per traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    /// Lidar on/off and lidar image frames.
    Lidar,
    /// Camera on/off and video frames.
    Video,
    /// Microphone, speech-to-text control and transcripts.
    Stt,
    /// Joystick axis updates.
    Joystick,
    /// Action sequences, stop/pause and execution feedback.
    Sequence,
    /// Gesture and pose recognition control.
    Gesture,
}

impl ChannelId {
    /// Every declared channel, in declaration order.
    pub const ALL: [ChannelId; 6] = [
        ChannelId::Lidar,
        ChannelId::Video,
        ChannelId::Stt,
        ChannelId::Joystick,
        ChannelId::Sequence,
        ChannelId::Gesture,
    ];

    /// Returns a human-readable name for the channel.
    pub fn name(self) -> &'static str {
        match self {
            ChannelId::Lidar => "lidar",
            ChannelId::Video => "video",
            ChannelId::Stt => "stt",
            ChannelId::Joystick => "joystick",
            ChannelId::Sequence => "sequence",
            ChannelId::Gesture => "gesture",
        }
    }

    /// Parse a channel from its name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_each_channel_once() {
        let mut ids = ChannelId::ALL.to_vec();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn name_roundtrips_case_insensitively() {
        for id in ChannelId::ALL {
            assert_eq!(ChannelId::from_name(id.name()), Some(id));
        }
        assert_eq!(ChannelId::from_name("SEQUENCE"), Some(ChannelId::Sequence));
        assert_eq!(ChannelId::from_name("audio"), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ChannelId::Joystick).unwrap();
        assert_eq!(json, "\"joystick\"");
    }
}
