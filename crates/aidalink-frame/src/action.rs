//! Robot actions that make up a sequence.

use serde::{Deserialize, Serialize};

/// Every action the controller knows how to execute.
///
/// Special actions carry a UTF-8 payload on the wire: a gesture or sound
/// name, the text to speak, or a loop iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    TurnLeft,
    Forwards,
    ForwardsLong,
    TurnRight,
    InputGesture,
    InputVoice,
    TurnLeftLong,
    Backwards,
    BackwardsLong,
    TurnRightLong,
    LoopStart,
    LoopEnd,
    InputSound,
}

impl ActionKind {
    /// Every action kind, ordered by wire id.
    pub const ALL: [ActionKind; 13] = [
        ActionKind::TurnLeft,
        ActionKind::Forwards,
        ActionKind::ForwardsLong,
        ActionKind::TurnRight,
        ActionKind::InputGesture,
        ActionKind::InputVoice,
        ActionKind::TurnLeftLong,
        ActionKind::Backwards,
        ActionKind::BackwardsLong,
        ActionKind::TurnRightLong,
        ActionKind::LoopStart,
        ActionKind::LoopEnd,
        ActionKind::InputSound,
    ];

    /// The wire id.
    pub fn id(self) -> u16 {
        match self {
            ActionKind::TurnLeft => 1,
            ActionKind::Forwards => 2,
            ActionKind::ForwardsLong => 3,
            ActionKind::TurnRight => 4,
            ActionKind::InputGesture => 6,
            ActionKind::InputVoice => 7,
            ActionKind::TurnLeftLong => 8,
            ActionKind::Backwards => 9,
            ActionKind::BackwardsLong => 10,
            ActionKind::TurnRightLong => 11,
            ActionKind::LoopStart => 12,
            ActionKind::LoopEnd => 13,
            ActionKind::InputSound => 14,
        }
    }

    /// Whether the action is followed by a length-prefixed payload.
    ///
    /// `LoopEnd` carries nothing: the controller parses it as a plain id.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            ActionKind::InputGesture
                | ActionKind::InputVoice
                | ActionKind::InputSound
                | ActionKind::LoopStart
        )
    }

    /// Nominal execution time on the robot, in seconds.
    pub fn duration_secs(self) -> f64 {
        match self {
            ActionKind::ForwardsLong
            | ActionKind::BackwardsLong
            | ActionKind::TurnLeftLong
            | ActionKind::TurnRightLong => 2.0,
            ActionKind::LoopStart | ActionKind::LoopEnd => 0.0,
            _ => 1.0,
        }
    }

    /// Look up an action kind by wire id.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// One step of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Only encoded for special actions.
    #[serde(default)]
    pub payload: String,
}

impl Action {
    /// Create an action with a payload.
    pub fn new(kind: ActionKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Create an action without a payload.
    pub fn plain(kind: ActionKind) -> Self {
        Self::new(kind, String::new())
    }

    /// A loop start marker with its iteration count.
    pub fn loop_start(iterations: u32) -> Self {
        Self::new(ActionKind::LoopStart, iterations.to_string())
    }
}

impl From<ActionKind> for Action {
    fn from(kind: ActionKind) -> Self {
        Action::plain(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_resolve() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ActionKind::from_id(5), None);
        assert_eq!(ActionKind::from_id(0), None);
    }

    #[test]
    fn special_actions() {
        let special: Vec<_> = ActionKind::ALL
            .into_iter()
            .filter(|k| k.is_special())
            .map(ActionKind::id)
            .collect();
        assert_eq!(special, vec![6, 7, 12, 14]);
    }

    #[test]
    fn durations() {
        assert_eq!(ActionKind::Forwards.duration_secs(), 1.0);
        assert_eq!(ActionKind::TurnRightLong.duration_secs(), 2.0);
        assert_eq!(ActionKind::LoopEnd.duration_secs(), 0.0);
    }

    #[test]
    fn action_json_shape() {
        let action: Action =
            serde_json::from_str(r#"{"kind":"input_voice","payload":"hej"}"#).unwrap();
        assert_eq!(action, Action::new(ActionKind::InputVoice, "hej"));

        let plain: Action = serde_json::from_str(r#"{"kind":"forwards"}"#).unwrap();
        assert_eq!(plain, Action::plain(ActionKind::Forwards));
    }
}
