//! Lowering a [`Model`] into the [`MachineIr`] the emitters render

use crate::codegen::ir::{Branch, Callback, EventArm, MachineIr, StateArm, Stmt, Symbol};
use crate::error::GenerationError;
use crate::state_machine::{CallbackRole, Model, Transition, is_valid_identifier};
use std::collections::HashMap;

const DEFAULT_PACKAGE: &str = "main";

/// Settings that shape the IR but are not part of the model
#[derive(Debug, Clone, Default)]
pub struct LowerOptions<'a> {
    pub package: Option<&'a str>,
    pub concurrency_safe: bool,
}

/// Lower a model. Fails on anything the emitters could not render exhaustively;
/// a model that passed validation never fails here.
pub fn lower(model: &Model, options: &LowerOptions<'_>) -> Result<MachineIr, GenerationError> {
    if model.states().is_empty() {
        return Err(violation("state machine has no states"));
    }
    if model.events().is_empty() {
        return Err(violation("state machine has no events"));
    }

    let state_index: HashMap<&str, usize> = model
        .states()
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();
    let event_index: HashMap<&str, usize> = model
        .events()
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.as_str(), i))
        .collect();

    let initial = lookup(&state_index, "initial state", model.initial())?;

    let callbacks = CallbackTable::collect(model)?;

    let mut dispatch = Vec::with_capacity(model.states().len());
    for (index, state) in model.states().iter().enumerate() {
        let mut events: Vec<EventArm> = Vec::new();
        let mut unguarded: Vec<Option<Branch>> = Vec::new();

        for transition in model.transitions_from(&state.name) {
            let event = lookup(&event_index, "event", &transition.event)?;
            let branch = lower_transition(model, &state_index, &callbacks, transition)?;

            let slot = match events.iter().position(|arm| arm.event == event) {
                Some(slot) => slot,
                None => {
                    events.push(EventArm {
                        event,
                        branches: Vec::new(),
                    });
                    unguarded.push(None);
                    events.len() - 1
                }
            };

            if branch.guard.is_some() {
                events[slot].branches.push(branch);
            } else if unguarded[slot].replace(branch).is_some() {
                return Err(violation(format!(
                    "state {:?} has more than one unguarded transition on event {:?}",
                    state.name, transition.event
                )));
            }
        }

        for (arm, fallback) in events.iter_mut().zip(unguarded) {
            arm.branches.extend(fallback);
        }
        dispatch.push(StateArm {
            state: index,
            events,
        });
    }

    let package = options
        .package
        .or(model.package())
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PACKAGE)
        .to_string();
    if !is_valid_identifier(&package) {
        return Err(violation(format!("package name {:?} is not a valid identifier", package)));
    }

    Ok(MachineIr {
        name: Symbol::new(model.name()),
        package,
        states: model.states().iter().map(|s| Symbol::new(&s.name)).collect(),
        events: model.events().iter().map(|e| Symbol::new(&e.name)).collect(),
        initial,
        callbacks: callbacks.into_callbacks(),
        dispatch,
        concurrency_safe: options.concurrency_safe,
    })
}

fn lower_transition(
    model: &Model,
    state_index: &HashMap<&str, usize>,
    callbacks: &CallbackTable<'_>,
    transition: &Transition,
) -> Result<Branch, GenerationError> {
    let source = model
        .get_state(&transition.from)
        .ok_or_else(|| violation(format!("undefined state {:?}", transition.from)))?;
    let target_state = model
        .get_state(&transition.to)
        .ok_or_else(|| violation(format!("undefined state {:?}", transition.to)))?;
    let target = lookup(state_index, "state", &transition.to)?;

    let mut body = Vec::with_capacity(4);
    if let Some(exit) = source.exit_action.as_deref() {
        body.push(Stmt::Exit(callbacks.index(exit)?));
    }
    if let Some(action) = transition.action.as_deref() {
        body.push(Stmt::Action(callbacks.index(action)?));
    }
    body.push(Stmt::SetState(target));
    if let Some(entry) = target_state.entry_action.as_deref() {
        body.push(Stmt::Entry(callbacks.index(entry)?));
    }

    let guard = transition
        .guard
        .as_deref()
        .map(|guard| callbacks.index(guard))
        .transpose()?;

    Ok(Branch {
        guard,
        target,
        body,
    })
}

/// Distinct callbacks in first-use order, each with a single role
struct CallbackTable<'m> {
    order: Vec<(&'m str, CallbackRole)>,
    index: HashMap<&'m str, usize>,
}

impl<'m> CallbackTable<'m> {
    fn collect(model: &'m Model) -> Result<Self, GenerationError> {
        let mut table = Self {
            order: Vec::new(),
            index: HashMap::new(),
        };

        for (name, role) in model.callbacks() {
            match table.index.get(name) {
                Some(&i) if table.order[i].1 != role => {
                    return Err(violation(format!(
                        "callback {:?} is used both as a {} and as a {}",
                        name,
                        table.order[i].1.name(),
                        role.name()
                    )));
                }
                Some(_) => {}
                None => {
                    table.index.insert(name, table.order.len());
                    table.order.push((name, role));
                }
            }
        }

        Ok(table)
    }

    fn index(&self, name: &str) -> Result<usize, GenerationError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| violation(format!("unknown callback {:?}", name)))
    }

    fn into_callbacks(self) -> Vec<Callback> {
        self.order
            .into_iter()
            .map(|(name, role)| Callback {
                symbol: Symbol::new(name),
                role,
            })
            .collect()
    }
}

fn lookup(index: &HashMap<&str, usize>, what: &str, name: &str) -> Result<usize, GenerationError> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| violation(format!("undefined {} {:?}", what, name)))
}

fn violation(message: impl Into<String>) -> GenerationError {
    GenerationError::InvariantViolation(message.into())
}
