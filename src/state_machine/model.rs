//! Model - the entity registry for one state machine definition
//!
//! A [`Model`] owns every state, event and transition of a machine. It is built
//! incrementally through its add-operations, which fail fast and leave the
//! model untouched on error, and is then handed read-only to the graph
//! analyzer, the validator and the code generator.

use crate::error::{EntityKind, ModelError};
use crate::state_machine::{Event, EventId, State, StateId, Transition, ValidationReport};
use std::collections::HashMap;

/// The role a named callback plays in the generated code. Entry and exit
/// actions share a signature, so they share a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackRole {
    Guard,
    Action,
    StateHook,
}

impl CallbackRole {
    pub fn name(&self) -> &'static str {
        match self {
            CallbackRole::Guard => "guard",
            CallbackRole::Action => "transition action",
            CallbackRole::StateHook => "entry/exit action",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    initial: StateId,
    package: Option<String>,

    /// States in declaration order
    states: Vec<State>,
    /// Lookup table from state name to its position in `states`
    state_index: HashMap<StateId, usize>,

    /// Events in declaration order
    events: Vec<Event>,
    /// Lookup table from event name to its position in `events`
    event_index: HashMap<EventId, usize>,

    transitions: Vec<Transition>,
}

impl Model {
    /// Create an empty model. The initial state is only checked against the
    /// registry at validation time, since it is named before any state exists.
    pub fn new(name: impl Into<String>, initial: impl Into<StateId>) -> Result<Self, ModelError> {
        let name = name.into();
        let initial = initial.into();

        if name.is_empty() {
            return Err(ModelError::invalid(
                EntityKind::Machine,
                name,
                "machine name cannot be empty",
            ));
        }
        if initial.is_empty() {
            return Err(ModelError::invalid(
                EntityKind::Machine,
                name,
                "initial state cannot be empty",
            ));
        }

        Ok(Self {
            name,
            initial,
            package: None,
            states: Vec::new(),
            state_index: HashMap::new(),
            events: Vec::new(),
            event_index: HashMap::new(),
            transitions: Vec::new(),
        })
    }

    /// Set the package the generated code belongs to (used by the Go emitter)
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Adds a state. Fails on an invalid or already registered name.
    pub fn add_state(&mut self, state: State) -> Result<(), ModelError> {
        state.validate()?;
        if self.state_index.contains_key(&state.name) {
            return Err(ModelError::duplicate(EntityKind::State, state.name));
        }

        tracing::debug!(machine = %self.name, state = %state.name, "Adding state");
        self.state_index.insert(state.name.clone(), self.states.len());
        self.states.push(state);
        Ok(())
    }

    /// Adds an event. Fails on an invalid or already registered name.
    pub fn add_event(&mut self, event: Event) -> Result<(), ModelError> {
        event.validate()?;
        if self.event_index.contains_key(&event.name) {
            return Err(ModelError::duplicate(EntityKind::Event, event.name));
        }

        tracing::debug!(machine = %self.name, event = %event.name, "Adding event");
        self.event_index.insert(event.name.clone(), self.events.len());
        self.events.push(event);
        Ok(())
    }

    /// Appends a transition whose endpoints and event are already registered
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), ModelError> {
        transition.validate()?;

        if self.get_state(&transition.from).is_none() {
            return Err(ModelError::dangling(
                "from",
                EntityKind::State,
                transition.from,
            ));
        }
        if self.get_state(&transition.to).is_none() {
            return Err(ModelError::dangling("to", EntityKind::State, transition.to));
        }
        if self.get_event(&transition.event).is_none() {
            return Err(ModelError::dangling(
                "event",
                EntityKind::Event,
                transition.event,
            ));
        }

        tracing::debug!(
            machine = %self.name,
            transition = %transition.display_label(),
            "Adding transition"
        );
        self.transitions.push(transition);
        Ok(())
    }

    /// Get a state by name
    pub fn get_state(&self, name: &str) -> Option<&State> {
        self.state_index
            .get(name)
            .and_then(|&idx| self.states.get(idx))
            .filter(|state| state.name == name)
    }

    /// Get an event by name
    pub fn get_event(&self, name: &str) -> Option<&Event> {
        self.event_index
            .get(name)
            .and_then(|&idx| self.events.get(idx))
            .filter(|event| event.name == name)
    }

    /// Mutable access to a registered state, e.g. to attach actions after the fact.
    /// Renaming a state through this handle detaches it from lookups; the
    /// validator reports the resulting inconsistencies.
    pub fn state_mut(&mut self, name: &str) -> Option<&mut State> {
        let idx = *self.state_index.get(name)?;
        self.states.get_mut(idx)
    }

    /// Mutable access to the transition at `index` in insertion order
    pub fn transition_mut(&mut self, index: usize) -> Option<&mut Transition> {
        self.transitions.get_mut(index)
    }

    /// All states in declaration order
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// All events in declaration order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// All transitions in insertion order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }

    /// Every callback usage: entry/exit actions in state order, then guards and
    /// actions in transition order. Names repeat when a callback is reused.
    pub fn callbacks(&self) -> Vec<(&str, CallbackRole)> {
        let hooks = self.states.iter().flat_map(|state| {
            [state.entry_action.as_deref(), state.exit_action.as_deref()]
                .into_iter()
                .flatten()
                .map(|name| (name, CallbackRole::StateHook))
        });
        let transitions = self.transitions.iter().flat_map(|t| {
            [
                t.guard.as_deref().map(|name| (name, CallbackRole::Guard)),
                t.action.as_deref().map(|name| (name, CallbackRole::Action)),
            ]
            .into_iter()
            .flatten()
        });
        hooks.chain(transitions).collect()
    }

    /// Transitions leaving `state`, in insertion order
    pub fn transitions_from(&self, state: &str) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.from == state)
            .collect()
    }

    /// Transitions entering `state`, in insertion order
    pub fn transitions_to(&self, state: &str) -> Vec<&Transition> {
        self.transitions.iter().filter(|t| t.to == state).collect()
    }

    /// Run every whole-model check. Never mutates the model.
    pub fn validate(&self) -> ValidationReport {
        crate::state_machine::validate(self)
    }
}
