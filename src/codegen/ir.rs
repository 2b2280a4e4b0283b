//! Intermediate representation of a generated state machine
//!
//! The IR is what every emitter renders. It carries each declared name already
//! spelled for the target languages, and the dispatch table as a nested
//! state → event → branch structure whose statements are in execution order.
//! States, events and callbacks are referenced by index into their tables.

use crate::codegen::naming::{to_camel_case, to_pascal_case, to_snake_case};
use crate::error::GenerationError;
use crate::state_machine::CallbackRole;
use std::collections::HashSet;

/// A declared name with its generated spellings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub pascal: String,
    pub camel: String,
    pub snake: String,
}

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pascal: to_pascal_case(name),
            camel: to_camel_case(name),
            snake: to_snake_case(name),
        }
    }
}

/// A user-supplied guard or action the generated code calls out to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub symbol: Symbol,
    pub role: CallbackRole,
}

/// One step of a dispatch branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stmt {
    /// Exit action of the source state
    Exit(usize),
    /// Transition action
    Action(usize),
    /// Commit the target state
    SetState(usize),
    /// Entry action of the target state
    Entry(usize),
}

impl Stmt {
    /// Position in the fixed dispatch order
    fn rank(&self) -> u8 {
        match self {
            Stmt::Exit(_) => 0,
            Stmt::Action(_) => 1,
            Stmt::SetState(_) => 2,
            Stmt::Entry(_) => 3,
        }
    }
}

/// One candidate transition for a `(state, event)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub guard: Option<usize>,
    pub target: usize,
    pub body: Vec<Stmt>,
}

/// Every candidate for one event in one state. Guarded branches come first,
/// in insertion order; the unguarded fallback, if any, is last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventArm {
    pub event: usize,
    pub branches: Vec<Branch>,
}

impl EventArm {
    pub fn fallback(&self) -> Option<&Branch> {
        self.branches.last().filter(|b| b.guard.is_none())
    }

    pub fn guarded(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| b.guard.is_some())
    }
}

/// Dispatch arm of one declared state; `events` is empty for terminal states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateArm {
    pub state: usize,
    pub events: Vec<EventArm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIr {
    pub name: Symbol,
    pub package: String,
    pub states: Vec<Symbol>,
    pub events: Vec<Symbol>,
    pub initial: usize,
    pub callbacks: Vec<Callback>,
    /// One arm per declared state, in declaration order
    pub dispatch: Vec<StateArm>,
    pub concurrency_safe: bool,
}

impl MachineIr {
    pub fn state(&self, index: usize) -> &Symbol {
        &self.states[index]
    }

    pub fn event(&self, index: usize) -> &Symbol {
        &self.events[index]
    }

    pub fn callback(&self, index: usize) -> &Callback {
        &self.callbacks[index]
    }

    pub fn initial_state(&self) -> &Symbol {
        self.state(self.initial)
    }

    /// The candidates for `event` while in `state`
    pub fn event_arm(&self, state: usize, event: usize) -> Option<&EventArm> {
        self.dispatch
            .get(state)?
            .events
            .iter()
            .find(|arm| arm.event == event)
    }

    /// Events handled in `state`, in the order their first transition was declared
    pub fn permitted_events(&self, state: usize) -> Vec<usize> {
        self.dispatch
            .get(state)
            .map(|arm| arm.events.iter().map(|e| e.event).collect())
            .unwrap_or_default()
    }

    /// Whether `state` handles less than every event, so its dispatch needs a
    /// catch-all arm
    pub fn is_partial(&self, state: usize) -> bool {
        self.dispatch
            .get(state)
            .is_some_and(|arm| arm.events.len() < self.events.len())
    }

    /// Structural checks every emitter relies on: one arm per declared state,
    /// each handled event listed once per state, at most one unguarded branch
    /// placed last, and bodies in dispatch order with exactly one state assignment
    /// to the branch target.
    pub fn verify(&self) -> Result<(), GenerationError> {
        if self.states.is_empty() {
            return Err(violation("machine has no states"));
        }
        if self.initial >= self.states.len() {
            return Err(violation(format!(
                "initial state index {} is out of range",
                self.initial
            )));
        }
        if self.dispatch.len() != self.states.len() {
            return Err(violation(format!(
                "{} dispatch arms for {} states",
                self.dispatch.len(),
                self.states.len()
            )));
        }

        for (index, arm) in self.dispatch.iter().enumerate() {
            if arm.state != index {
                return Err(violation(format!(
                    "dispatch arm {} is for state index {}",
                    index, arm.state
                )));
            }
            let state = &self.states[index].name;

            let mut seen = HashSet::new();
            for event_arm in &arm.events {
                let Some(event) = self.events.get(event_arm.event) else {
                    return Err(violation(format!(
                        "state {:?} handles unknown event index {}",
                        state, event_arm.event
                    )));
                };
                if !seen.insert(event_arm.event) {
                    return Err(violation(format!(
                        "state {:?} handles event {:?} twice",
                        state, event.name
                    )));
                }
                self.verify_event_arm(state, &event.name, event_arm)?;
            }
        }

        Ok(())
    }

    fn verify_event_arm(
        &self,
        state: &str,
        event: &str,
        arm: &EventArm,
    ) -> Result<(), GenerationError> {
        if arm.branches.is_empty() {
            return Err(violation(format!(
                "state {:?} lists event {:?} without a transition",
                state, event
            )));
        }

        let unguarded = arm.branches.iter().filter(|b| b.guard.is_none()).count();
        if unguarded > 1 || (unguarded == 1 && arm.fallback().is_none()) {
            return Err(violation(format!(
                "state {:?} on event {:?} has an ambiguous or misplaced unguarded transition",
                state, event
            )));
        }

        for branch in &arm.branches {
            if let Some(guard) = branch.guard {
                self.expect_role(guard, CallbackRole::Guard)?;
            }
            if branch.target >= self.states.len() {
                return Err(violation(format!(
                    "state {:?} on event {:?} targets unknown state index {}",
                    state, event, branch.target
                )));
            }
            self.verify_body(state, event, branch)?;
        }

        Ok(())
    }

    fn verify_body(
        &self,
        state: &str,
        event: &str,
        branch: &Branch,
    ) -> Result<(), GenerationError> {
        let mut assignments = 0;
        let mut last_rank = None;

        for stmt in &branch.body {
            if last_rank.is_some_and(|rank| stmt.rank() <= rank) {
                return Err(violation(format!(
                    "state {:?} on event {:?} runs {:?} out of order",
                    state, event, stmt
                )));
            }
            last_rank = Some(stmt.rank());

            match *stmt {
                Stmt::Exit(cb) | Stmt::Entry(cb) => self.expect_role(cb, CallbackRole::StateHook)?,
                Stmt::Action(cb) => self.expect_role(cb, CallbackRole::Action)?,
                Stmt::SetState(target) => {
                    if target != branch.target {
                        return Err(violation(format!(
                            "state {:?} on event {:?} assigns a state other than its target",
                            state, event
                        )));
                    }
                    assignments += 1;
                }
            }
        }

        if assignments != 1 {
            return Err(violation(format!(
                "state {:?} on event {:?} must assign the state exactly once",
                state, event
            )));
        }
        Ok(())
    }

    fn expect_role(&self, index: usize, role: CallbackRole) -> Result<(), GenerationError> {
        match self.callbacks.get(index) {
            Some(callback) if callback.role == role => Ok(()),
            Some(callback) => Err(violation(format!(
                "callback {:?} is used as a {} but declared as a {}",
                callback.symbol.name,
                role.name(),
                callback.role.name()
            ))),
            None => Err(violation(format!("unknown callback index {}", index))),
        }
    }
}

fn violation(message: impl Into<String>) -> GenerationError {
    GenerationError::InvariantViolation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `idle --start / boot--> running`, `running` terminal
    fn small_ir() -> MachineIr {
        MachineIr {
            name: Symbol::new("Job"),
            package: "main".to_string(),
            states: vec![Symbol::new("idle"), Symbol::new("running")],
            events: vec![Symbol::new("start")],
            initial: 0,
            callbacks: vec![Callback {
                symbol: Symbol::new("boot"),
                role: CallbackRole::Action,
            }],
            dispatch: vec![
                StateArm {
                    state: 0,
                    events: vec![EventArm {
                        event: 0,
                        branches: vec![Branch {
                            guard: None,
                            target: 1,
                            body: vec![Stmt::Action(0), Stmt::SetState(1)],
                        }],
                    }],
                },
                StateArm {
                    state: 1,
                    events: vec![],
                },
            ],
            concurrency_safe: false,
        }
    }

    fn expect_violation(ir: &MachineIr, fragment: &str) {
        match ir.verify() {
            Err(GenerationError::InvariantViolation(message)) => {
                assert!(message.contains(fragment), "{}", message)
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn test_symbol_spellings() {
        let symbol = Symbol::new("order_approved");
        assert_eq!(symbol.pascal, "OrderApproved");
        assert_eq!(symbol.camel, "orderApproved");
        assert_eq!(symbol.snake, "order_approved");
    }

    #[test]
    fn test_verify_accepts_well_formed() {
        let ir = small_ir();
        assert!(ir.verify().is_ok());
        assert_eq!(ir.permitted_events(0), vec![0]);
        assert!(ir.permitted_events(1).is_empty());
        assert!(!ir.is_partial(0));
        assert!(ir.is_partial(1));
        assert!(!ir.is_partial(7));
        assert_eq!(ir.initial_state().name, "idle");
    }

    #[test]
    fn test_verify_missing_arm() {
        let mut ir = small_ir();
        ir.dispatch.pop();
        expect_violation(&ir, "2 states");
    }

    #[test]
    fn test_verify_duplicate_event() {
        let mut ir = small_ir();
        let arm = ir.dispatch[0].events[0].clone();
        ir.dispatch[0].events.push(arm);
        expect_violation(&ir, "twice");
    }

    #[test]
    fn test_verify_body_order() {
        let mut ir = small_ir();
        ir.dispatch[0].events[0].branches[0].body = vec![Stmt::SetState(1), Stmt::Action(0)];
        expect_violation(&ir, "out of order");

        ir.dispatch[0].events[0].branches[0].body = vec![Stmt::Action(0)];
        expect_violation(&ir, "exactly once");

        ir.dispatch[0].events[0].branches[0].body = vec![Stmt::SetState(0)];
        expect_violation(&ir, "other than its target");
    }

    #[test]
    fn test_verify_callback_roles() {
        let mut ir = small_ir();
        ir.dispatch[0].events[0].branches[0].guard = Some(0);
        expect_violation(&ir, "used as a guard");
    }

    #[test]
    fn test_verify_fallback_must_be_last() {
        let mut ir = small_ir();
        ir.callbacks.push(Callback {
            symbol: Symbol::new("ready"),
            role: CallbackRole::Guard,
        });
        let guarded = Branch {
            guard: Some(1),
            target: 1,
            body: vec![Stmt::SetState(1)],
        };
        ir.dispatch[0].events[0].branches.push(guarded.clone());
        expect_violation(&ir, "misplaced");

        ir.dispatch[0].events[0].branches.rotate_right(1);
        assert!(ir.verify().is_ok());
        let arm = ir.event_arm(0, 0).unwrap();
        assert_eq!(arm.guarded().count(), 1);
        assert!(arm.fallback().is_some());
    }
}
