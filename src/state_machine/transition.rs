//! Transition representation

use crate::error::{EntityKind, ModelError};
use crate::state_machine::{EventId, StateId, check_callback};
use serde::{Deserialize, Serialize};

/// A transition between states, triggered by an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub event: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transition {
    pub fn new(
        from: impl Into<StateId>,
        to: impl Into<StateId>,
        event: impl Into<EventId>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            event: event.into(),
            guard: None,
            action: None,
            description: None,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_self_transition(&self) -> bool {
        self.from == self.to
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Checks that every field is filled in. References are checked by the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [("from", &self.from), ("to", &self.to), ("event", &self.event)] {
            if value.is_empty() {
                return Err(ModelError::invalid(
                    EntityKind::Transition,
                    self.display_label(),
                    format!("{} cannot be empty", field),
                ));
            }
        }

        let label = self.display_label();
        check_callback(
            EntityKind::Transition,
            &label,
            "guard",
            self.guard.as_deref(),
        )?;
        check_callback(
            EntityKind::Transition,
            &label,
            "action",
            self.action.as_deref(),
        )
    }

    /// `from --event [guard] / action--> to`
    pub fn display_label(&self) -> String {
        let mut label = self.event.clone();
        if let Some(guard) = &self.guard {
            label.push_str(&format!(" [{}]", guard));
        }
        if let Some(action) = &self.action {
            label.push_str(&format!(" / {}", action));
        }
        format!("{} --{}--> {}", self.from, label, self.to)
    }
}
