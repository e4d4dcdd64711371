//! Where action lists come from.

use aidalink_frame::Action;

use crate::error::Result;

/// Supplies the actions of one sequence, in execution order.
pub trait SequenceSource {
    fn actions(&self) -> Result<Vec<Action>>;
}

impl SequenceSource for [Action] {
    fn actions(&self) -> Result<Vec<Action>> {
        Ok(self.to_vec())
    }
}

impl SequenceSource for Vec<Action> {
    fn actions(&self) -> Result<Vec<Action>> {
        Ok(self.clone())
    }
}

/// A sequence stored as a JSON array of actions, e.g.
/// `[{"kind": "loop_start", "payload": "3"}, {"kind": "forwards"}]`.
#[derive(Debug, Clone)]
pub struct JsonSequence {
    json: String,
}

impl JsonSequence {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl SequenceSource for JsonSequence {
    fn actions(&self) -> Result<Vec<Action>> {
        Ok(serde_json::from_str(&self.json)?)
    }
}
