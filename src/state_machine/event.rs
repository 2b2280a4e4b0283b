//! Event representation

use crate::error::{EntityKind, ModelError};
use crate::state_machine::check_identifier;
use serde::{Deserialize, Serialize};

pub type EventId = String;

/// An event that can trigger transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<EventId>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_identifier(EntityKind::Event, "event name", &self.name)
    }
}
