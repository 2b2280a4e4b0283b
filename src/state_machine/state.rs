//! State representation

use crate::error::{EntityKind, ModelError};
use crate::state_machine::{check_callback, check_identifier};
use serde::{Deserialize, Serialize};

pub type StateId = String;

/// A named state of the machine, with optional entry/exit actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: StateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl State {
    pub fn new(name: impl Into<StateId>) -> Self {
        Self {
            name: name.into(),
            entry_action: None,
            exit_action: None,
            description: None,
        }
    }

    pub fn with_entry(mut self, action: impl Into<String>) -> Self {
        self.entry_action = Some(action.into());
        self
    }

    pub fn with_exit(mut self, action: impl Into<String>) -> Self {
        self.exit_action = Some(action.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the name grammar and any attached action names
    pub fn validate(&self) -> Result<(), ModelError> {
        check_identifier(EntityKind::State, "state name", &self.name)?;
        check_callback(
            EntityKind::State,
            &self.name,
            "entry action",
            self.entry_action.as_deref(),
        )?;
        check_callback(
            EntityKind::State,
            &self.name,
            "exit action",
            self.exit_action.as_deref(),
        )
    }

    /// Get a short display string
    pub fn display_short(&self) -> String {
        let mut hooks = Vec::new();
        if let Some(entry) = &self.entry_action {
            hooks.push(format!("entry: {}", entry));
        }
        if let Some(exit) = &self.exit_action {
            hooks.push(format!("exit: {}", exit));
        }

        if hooks.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, hooks.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(State::new("pending").validate().is_ok());
        assert!(State::new("order_approved").validate().is_ok());
        assert!(State::new("").validate().is_err());
        assert!(State::new("order approved").validate().is_err());
        assert!(State::new("pending").with_entry("").validate().is_err());
    }

    #[test]
    fn test_display_short() {
        assert_eq!(State::new("approved").display_short(), "approved");

        let state = State::new("pending").with_entry("logEntry").with_exit("logExit");
        assert_eq!(
            state.display_short(),
            "pending (entry: logEntry, exit: logExit)"
        );
    }
}
