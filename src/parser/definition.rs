//! Machine definition documents
//!
//! A definition is the serialized form of a [`Model`]. Building one drives the
//! model's add-operations in document order and keeps going past failures, so
//! every construction error is reported in one pass.

use crate::error::ModelError;
use crate::state_machine::{Event, Model, State, Transition};
use serde::{Deserialize, Serialize};

/// Top-level definition document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MachineDefinition {
    pub name: String,
    pub initial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub states: Vec<StateDefinition>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StateDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EventDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransitionDefinition {
    pub from: String,
    pub to: String,
    /// Triggering event
    pub on: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A model built from a definition, with every add-operation that failed
#[derive(Debug, Clone)]
pub struct Built {
    pub model: Model,
    pub errors: Vec<ModelError>,
}

impl Built {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl MachineDefinition {
    /// Build the model. Only an unusable machine name or initial state fails
    /// outright; entity errors are collected in [`Built::errors`].
    pub fn build(&self) -> Result<Built, ModelError> {
        let mut model = Model::new(&self.name, &self.initial)?;
        if let Some(package) = &self.package {
            model = model.with_package(package);
        }

        let mut errors = Vec::new();

        for def in &self.states {
            let mut state = State::new(&def.name);
            state.entry_action = def.entry.clone();
            state.exit_action = def.exit.clone();
            state.description = def.description.clone();
            if let Err(err) = model.add_state(state) {
                errors.push(err);
            }
        }

        for def in &self.events {
            let mut event = Event::new(&def.name);
            event.description = def.description.clone();
            if let Err(err) = model.add_event(event) {
                errors.push(err);
            }
        }

        for def in &self.transitions {
            let mut transition = Transition::new(&def.from, &def.to, &def.on);
            transition.guard = def.guard.clone();
            transition.action = def.action.clone();
            transition.description = def.description.clone();
            if let Err(err) = model.add_transition(transition) {
                errors.push(err);
            }
        }

        if !errors.is_empty() {
            tracing::debug!(
                machine = %self.name,
                errors = errors.len(),
                "Definition built with construction errors"
            );
        }

        Ok(Built { model, errors })
    }

    /// The definition that rebuilds `model`
    pub fn from_model(model: &Model) -> Self {
        Self {
            name: model.name().to_string(),
            initial: model.initial().to_string(),
            package: model.package().map(str::to_string),
            states: model
                .states()
                .iter()
                .map(|s| StateDefinition {
                    name: s.name.clone(),
                    entry: s.entry_action.clone(),
                    exit: s.exit_action.clone(),
                    description: s.description.clone(),
                })
                .collect(),
            events: model
                .events()
                .iter()
                .map(|e| EventDefinition {
                    name: e.name.clone(),
                    description: e.description.clone(),
                })
                .collect(),
            transitions: model
                .transitions()
                .iter()
                .map(|t| TransitionDefinition {
                    from: t.from.clone(),
                    to: t.to.clone(),
                    on: t.event.clone(),
                    guard: t.guard.clone(),
                    action: t.action.clone(),
                    description: t.description.clone(),
                })
                .collect(),
        }
    }
}
