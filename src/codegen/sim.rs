//! Executes a [`MachineIr`] the way the generated code does
//!
//! Emitters render the same dispatch table the simulator walks, so the
//! simulator is the reference for what a generated `transition` call does:
//! which callbacks run, in which order, and which state the machine ends in.

use crate::codegen::ir::{MachineIr, Stmt};
use std::collections::HashSet;
use thiserror::Error;

/// Outcomes of user callbacks, supplied by the caller
pub trait Hooks {
    fn guard(&mut self, name: &str) -> bool;

    fn action(&mut self, name: &str, from: &str, to: &str) -> Result<(), String>;

    /// Entry or exit action
    fn state_hook(&mut self, name: &str) -> Result<(), String>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid transition: event {event:?} is not permitted in state {state:?}")]
    InvalidTransition { state: String, event: String },

    #[error("guard {guard:?} rejected event {event:?} in state {state:?}")]
    GuardRejected {
        state: String,
        event: String,
        guard: String,
    },

    #[error("action {action:?} failed in state {state:?} on event {event:?}: {message}")]
    ActionFailed {
        action: String,
        state: String,
        event: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct Simulator<'ir> {
    ir: &'ir MachineIr,
    current: usize,
}

impl<'ir> Simulator<'ir> {
    /// Start in the initial state
    pub fn new(ir: &'ir MachineIr) -> Self {
        Self {
            ir,
            current: ir.initial,
        }
    }

    pub fn current_state(&self) -> &'ir str {
        &self.ir.state(self.current).name
    }

    pub fn permitted_events(&self) -> Vec<&'ir str> {
        self.ir
            .permitted_events(self.current)
            .into_iter()
            .map(|e| self.ir.event(e).name.as_str())
            .collect()
    }

    pub fn can_transition(&self, event: &str) -> bool {
        self.permitted_events().contains(&event)
    }

    /// Dispatch `event`: pick a branch, then run exit, action, state
    /// assignment and entry in that order. A failure before the assignment
    /// leaves the state unchanged; an entry failure leaves it at the target.
    pub fn transition<H: Hooks>(
        &mut self,
        event: &str,
        hooks: &mut H,
    ) -> Result<(), DispatchError> {
        let ir = self.ir;
        let from = ir.state(self.current).name.as_str();
        let invalid = || DispatchError::InvalidTransition {
            state: from.to_string(),
            event: event.to_string(),
        };

        let event_index = ir
            .events
            .iter()
            .position(|e| e.name == event)
            .ok_or_else(invalid)?;
        let arm = ir
            .event_arm(self.current, event_index)
            .ok_or_else(invalid)?;

        let mut rejected_by = None;
        let mut chosen = None;
        for branch in &arm.branches {
            match branch.guard {
                Some(guard) => {
                    let name = ir.callback(guard).symbol.name.as_str();
                    if hooks.guard(name) {
                        chosen = Some(branch);
                        break;
                    }
                    rejected_by = Some(name);
                }
                None => {
                    chosen = Some(branch);
                    break;
                }
            }
        }

        let Some(branch) = chosen else {
            return Err(DispatchError::GuardRejected {
                state: from.to_string(),
                event: event.to_string(),
                guard: rejected_by.unwrap_or_default().to_string(),
            });
        };

        let to = ir.state(branch.target).name.as_str();
        for stmt in &branch.body {
            let outcome = match *stmt {
                Stmt::Exit(cb) | Stmt::Entry(cb) => {
                    let name = &ir.callback(cb).symbol.name;
                    hooks.state_hook(name).map_err(|m| (name, m))
                }
                Stmt::Action(cb) => {
                    let name = &ir.callback(cb).symbol.name;
                    hooks.action(name, from, to).map_err(|m| (name, m))
                }
                Stmt::SetState(target) => {
                    tracing::trace!(from, to, event, "Committing state");
                    self.current = target;
                    Ok(())
                }
            };

            if let Err((action, message)) = outcome {
                return Err(DispatchError::ActionFailed {
                    action: action.clone(),
                    state: from.to_string(),
                    event: event.to_string(),
                    message,
                });
            }
        }

        Ok(())
    }
}

/// [`Hooks`] driven by fixed sets of rejecting guards and failing actions.
/// Every callback invocation is recorded in `calls`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHooks {
    pub rejecting_guards: HashSet<String>,
    pub failing_actions: HashSet<String>,
    pub calls: Vec<String>,
}

impl ScriptedHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(mut self, guard: impl Into<String>) -> Self {
        self.rejecting_guards.insert(guard.into());
        self
    }

    pub fn fail(mut self, action: impl Into<String>) -> Self {
        self.failing_actions.insert(action.into());
        self
    }

    fn outcome(&self, name: &str) -> Result<(), String> {
        if self.failing_actions.contains(name) {
            Err(format!("{} failed", name))
        } else {
            Ok(())
        }
    }
}

impl Hooks for ScriptedHooks {
    fn guard(&mut self, name: &str) -> bool {
        self.calls.push(format!("guard:{}", name));
        !self.rejecting_guards.contains(name)
    }

    fn action(&mut self, name: &str, from: &str, to: &str) -> Result<(), String> {
        self.calls.push(format!("action:{}({}->{})", name, from, to));
        self.outcome(name)
    }

    fn state_hook(&mut self, name: &str) -> Result<(), String> {
        self.calls.push(format!("hook:{}", name));
        self.outcome(name)
    }
}
