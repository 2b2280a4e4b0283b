//! Go emitter
//!
//! Every switch over the state type carries `//exhaustive:enforce` so the
//! `exhaustive` linter rejects a hand edit that drops a state. Callbacks are
//! plain func fields; a nil guard rejects and a nil action is skipped.

use crate::codegen::Target;
use crate::codegen::emit::{Emitter, GENERATED_HEADER, write_aligned};
use crate::codegen::ir::{Branch, EventArm, MachineIr, Stmt, Symbol};
use crate::state_machine::CallbackRole;
use std::fmt::{self, Write};

const EXHAUSTIVE: &str = "//exhaustive:enforce";

#[derive(Debug, Clone, Copy, Default)]
pub struct GoEmitter;

struct Names {
    machine: String,
    state: String,
    event: String,
    context: String,
    guards: String,
    actions: String,
    action_error: String,
    err_invalid: String,
    err_rejected: String,
}

impl Names {
    fn new(ir: &MachineIr) -> Self {
        let machine = ir.name.pascal.clone();
        Self {
            state: format!("{}State", machine),
            event: format!("{}Event", machine),
            context: format!("{}Context", machine),
            guards: format!("{}Guards", machine),
            actions: format!("{}Actions", machine),
            action_error: format!("{}ActionError", machine),
            err_invalid: format!("Err{}InvalidTransition", machine),
            err_rejected: format!("Err{}GuardRejected", machine),
            machine,
        }
    }

    fn state_const(&self, symbol: &Symbol) -> String {
        format!("{}{}", self.state, symbol.pascal)
    }

    fn event_const(&self, symbol: &Symbol) -> String {
        format!("{}{}", self.event, symbol.pascal)
    }
}

impl Emitter for GoEmitter {
    fn target(&self) -> Target {
        Target::Go
    }

    fn emit(&self, ir: &MachineIr, out: &mut String) -> fmt::Result {
        let names = Names::new(ir);

        writeln!(out, "{}", GENERATED_HEADER)?;
        writeln!(out)?;
        writeln!(out, "package {}", ir.package)?;
        writeln!(out)?;
        writeln!(out, "import (")?;
        writeln!(out, "\t\"context\"")?;
        writeln!(out, "\t\"errors\"")?;
        writeln!(out, "\t\"fmt\"")?;
        if ir.concurrency_safe {
            writeln!(out, "\t\"sync\"")?;
        }
        writeln!(out, ")")?;
        writeln!(out)?;

        emit_enum(
            out,
            &names.state,
            "state",
            ir,
            &ir.states,
            |s| names.state_const(s),
        )?;
        emit_enum(
            out,
            &names.event,
            "event",
            ir,
            &ir.events,
            |e| names.event_const(e),
        )?;
        emit_errors(out, &names)?;
        emit_callbacks(out, ir, &names)?;
        emit_machine(out, ir, &names)?;
        emit_transition(out, ir, &names)
    }
}

fn emit_enum(
    out: &mut String,
    ty: &str,
    what: &str,
    ir: &MachineIr,
    symbols: &[Symbol],
    constant: impl Fn(&Symbol) -> String,
) -> fmt::Result {
    writeln!(
        out,
        "// {} is a {} of the {} state machine.",
        ty, what, ir.name.pascal
    )?;
    writeln!(out, "type {} int", ty)?;
    writeln!(out)?;
    writeln!(out, "const (")?;
    for (i, symbol) in symbols.iter().enumerate() {
        if i == 0 {
            writeln!(out, "\t{} {} = iota", constant(symbol), ty)?;
        } else {
            writeln!(out, "\t{}", constant(symbol))?;
        }
    }
    writeln!(out, ")")?;
    writeln!(out)?;

    let receiver = &what[..1];
    writeln!(out, "// String returns the {} name as declared.", what)?;
    writeln!(out, "func ({} {}) String() string {{", receiver, ty)?;
    writeln!(out, "\t{}", EXHAUSTIVE)?;
    writeln!(out, "\tswitch {} {{", receiver)?;
    for symbol in symbols {
        writeln!(out, "\tcase {}:", constant(symbol))?;
        writeln!(out, "\t\treturn {:?}", symbol.name)?;
    }
    writeln!(out, "\t}}")?;
    writeln!(
        out,
        "\treturn fmt.Sprintf(\"{}(%d)\", int({}))",
        ty, receiver
    )?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_errors(out: &mut String, names: &Names) -> fmt::Result {
    writeln!(out, "var (")?;
    writeln!(
        out,
        "\t// {} is returned when no transition handles the event in the current state.",
        names.err_invalid
    )?;
    writeln!(
        out,
        "\t{} = errors.New(\"invalid transition\")",
        names.err_invalid
    )?;
    writeln!(
        out,
        "\t// {} is returned when every candidate transition was rejected by its guard.",
        names.err_rejected
    )?;
    writeln!(
        out,
        "\t{} = errors.New(\"guard rejected transition\")",
        names.err_rejected
    )?;
    writeln!(out, ")")?;
    writeln!(out)?;

    writeln!(
        out,
        "// {} wraps an error returned by a user action.",
        names.action_error
    )?;
    writeln!(out, "type {} struct {{", names.action_error)?;
    write_aligned(
        out,
        "\t",
        &[
            ("Action".to_string(), "string".to_string()),
            ("State".to_string(), names.state.clone()),
            ("Event".to_string(), names.event.clone()),
            ("Err".to_string(), "error".to_string()),
        ],
    )?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "func (e *{}) Error() string {{", names.action_error)?;
    writeln!(
        out,
        "\treturn fmt.Sprintf(\"action %s failed in state %s on event %s: %v\", e.Action, e.State, e.Event, e.Err)"
    )?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "func (e *{}) Unwrap() error {{", names.action_error)?;
    writeln!(out, "\treturn e.Err")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_callbacks(out: &mut String, ir: &MachineIr, names: &Names) -> fmt::Result {
    writeln!(
        out,
        "// {} carries caller data to guards and actions.",
        names.context
    )?;
    writeln!(out, "type {} struct {{", names.context)?;
    writeln!(out, "\tData any")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(
        out,
        "// {} holds the guard functions. A nil guard rejects its transition.",
        names.guards
    )?;
    emit_func_struct(out, ir, &names.guards, |callback| match callback {
        CallbackRole::Guard => Some(format!(
            "func(ctx context.Context, c *{}) bool",
            names.context
        )),
        _ => None,
    })?;

    writeln!(
        out,
        "// {} holds the transition and entry/exit actions. A nil action is skipped.",
        names.actions
    )?;
    emit_func_struct(out, ir, &names.actions, |callback| match callback {
        CallbackRole::Action => Some(format!(
            "func(ctx context.Context, from, to {}, c *{}) error",
            names.state, names.context
        )),
        CallbackRole::StateHook => Some(format!(
            "func(ctx context.Context, c *{}) error",
            names.context
        )),
        CallbackRole::Guard => None,
    })
}

/// One func field per callback, blank-line separated so gofmt keeps each
/// field's single-space layout
fn emit_func_struct(
    out: &mut String,
    ir: &MachineIr,
    ty: &str,
    signature: impl Fn(CallbackRole) -> Option<String>,
) -> fmt::Result {
    let fields: Vec<(&Symbol, String)> = ir
        .callbacks
        .iter()
        .filter_map(|c| signature(c.role).map(|sig| (&c.symbol, sig)))
        .collect();

    if fields.is_empty() {
        writeln!(out, "type {} struct{{}}", ty)?;
        return writeln!(out);
    }

    writeln!(out, "type {} struct {{", ty)?;
    for (i, (symbol, sig)) in fields.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "\t{} {}", symbol.pascal, sig)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_machine(out: &mut String, ir: &MachineIr, names: &Names) -> fmt::Result {
    let Names {
        machine,
        state,
        event,
        context,
        guards,
        actions,
        ..
    } = names;

    writeln!(out, "// {} is the generated state machine.", machine)?;
    writeln!(out, "type {} struct {{", machine)?;
    let mut fields = Vec::new();
    if ir.concurrency_safe {
        fields.push(("mu".to_string(), "sync.RWMutex".to_string()));
    }
    fields.push(("currentState".to_string(), state.clone()));
    fields.push(("guards".to_string(), guards.clone()));
    fields.push(("actions".to_string(), actions.clone()));
    fields.push(("context".to_string(), format!("*{}", context)));
    write_aligned(out, "\t", &fields)?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(
        out,
        "// New{} returns a machine in the {} state.",
        machine,
        ir.initial_state().name
    )?;
    writeln!(
        out,
        "func New{}(guards {}, actions {}, c *{}) *{} {{",
        machine, guards, actions, context, machine
    )?;
    writeln!(out, "\treturn &{}{{", machine)?;
    write_aligned(
        out,
        "\t\t",
        &[
            (
                "currentState:".to_string(),
                format!("{},", names.state_const(ir.initial_state())),
            ),
            ("guards:".to_string(), "guards,".to_string()),
            ("actions:".to_string(), "actions,".to_string()),
            ("context:".to_string(), "c,".to_string()),
        ],
    )?;
    writeln!(out, "\t}}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    let read_lock = if ir.concurrency_safe {
        "\tsm.mu.RLock()\n\tdefer sm.mu.RUnlock()\n"
    } else {
        ""
    };

    writeln!(out, "// State returns the current state.")?;
    writeln!(out, "func (sm *{}) State() {} {{", machine, state)?;
    write!(out, "{}", read_lock)?;
    writeln!(out, "\treturn sm.currentState")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(
        out,
        "// PermittedEvents returns the events with a transition out of the current state.\n// Guards are not evaluated."
    )?;
    writeln!(
        out,
        "func (sm *{}) PermittedEvents() []{} {{",
        machine, event
    )?;
    write!(out, "{}", read_lock)?;
    writeln!(out, "\treturn sm.permittedEvents()")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(
        out,
        "// CanTransition reports whether event has a transition out of the current state."
    )?;
    writeln!(
        out,
        "func (sm *{}) CanTransition(event {}) bool {{",
        machine, event
    )?;
    write!(out, "{}", read_lock)?;
    writeln!(out, "\tfor _, permitted := range sm.permittedEvents() {{")?;
    writeln!(out, "\t\tif permitted == event {{")?;
    writeln!(out, "\t\t\treturn true")?;
    writeln!(out, "\t\t}}")?;
    writeln!(out, "\t}}")?;
    writeln!(out, "\treturn false")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(
        out,
        "func (sm *{}) permittedEvents() []{} {{",
        machine, event
    )?;
    writeln!(out, "\t{}", EXHAUSTIVE)?;
    writeln!(out, "\tswitch sm.currentState {{")?;
    for arm in &ir.dispatch {
        writeln!(out, "\tcase {}:", names.state_const(ir.state(arm.state)))?;
        if arm.events.is_empty() {
            writeln!(out, "\t\treturn nil")?;
        } else {
            let events: Vec<String> = arm
                .events
                .iter()
                .map(|e| names.event_const(ir.event(e.event)))
                .collect();
            writeln!(out, "\t\treturn []{}{{{}}}", event, events.join(", "))?;
        }
    }
    writeln!(out, "\t}}")?;
    writeln!(out, "\treturn nil")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_transition(out: &mut String, ir: &MachineIr, names: &Names) -> fmt::Result {
    writeln!(
        out,
        "// Transition dispatches event: guard, exit action, transition action, state\n// change, entry action. A failure before the state change leaves the state\n// unchanged; a failing entry action leaves the machine in the new state."
    )?;
    writeln!(
        out,
        "func (sm *{}) Transition(ctx context.Context, event {}) error {{",
        names.machine, names.event
    )?;
    if ir.concurrency_safe {
        writeln!(out, "\tsm.mu.Lock()")?;
        writeln!(out, "\tdefer sm.mu.Unlock()")?;
        writeln!(out)?;
    }
    writeln!(out, "\tfrom := sm.currentState")?;
    writeln!(out, "\t{}", EXHAUSTIVE)?;
    writeln!(out, "\tswitch from {{")?;
    for arm in &ir.dispatch {
        writeln!(out, "\tcase {}:", names.state_const(ir.state(arm.state)))?;
        if arm.events.is_empty() {
            continue;
        }
        if !ir.is_partial(arm.state) {
            writeln!(out, "\t\t{}", EXHAUSTIVE)?;
        }
        writeln!(out, "\t\tswitch event {{")?;
        for event_arm in &arm.events {
            emit_event_arm(out, ir, names, event_arm)?;
        }
        writeln!(out, "\t\t}}")?;
    }
    writeln!(out, "\t}}")?;
    writeln!(
        out,
        "\treturn fmt.Errorf(\"%w: event %s in state %s\", {}, event, from)",
        names.err_invalid
    )?;
    writeln!(out, "}}")
}

fn emit_event_arm(out: &mut String, ir: &MachineIr, names: &Names, arm: &EventArm) -> fmt::Result {
    const INDENT: &str = "\t\t\t";

    writeln!(out, "\t\tcase {}:", names.event_const(ir.event(arm.event)))?;

    let mut last_guard = None;
    for branch in arm.guarded() {
        let Some(guard) = branch.guard else {
            continue;
        };
        let guard = &ir.callback(guard).symbol;
        writeln!(
            out,
            "{}if sm.guards.{} != nil && sm.guards.{}(ctx, sm.context) {{",
            INDENT, guard.pascal, guard.pascal
        )?;
        emit_body(out, ir, names, branch, &format!("{}\t", INDENT))?;
        writeln!(out, "{}\treturn nil", INDENT)?;
        writeln!(out, "{}}}", INDENT)?;
        last_guard = Some(guard);
    }

    match (arm.fallback(), last_guard) {
        (Some(fallback), _) => {
            emit_body(out, ir, names, fallback, INDENT)?;
            writeln!(out, "{}return nil", INDENT)?;
        }
        (None, Some(guard)) => {
            writeln!(
                out,
                "{}return fmt.Errorf(\"%w: guard %s rejected event %s in state %s\", {}, {:?}, event, from)",
                INDENT, names.err_rejected, guard.name
            )?;
        }
        (None, None) => {}
    }
    Ok(())
}

fn emit_body(
    out: &mut String,
    ir: &MachineIr,
    names: &Names,
    branch: &Branch,
    indent: &str,
) -> fmt::Result {
    for stmt in &branch.body {
        let (symbol, call) = match *stmt {
            Stmt::Exit(cb) | Stmt::Entry(cb) => {
                let symbol = &ir.callback(cb).symbol;
                (
                    symbol,
                    format!("sm.actions.{}(ctx, sm.context)", symbol.pascal),
                )
            }
            Stmt::Action(cb) => {
                let symbol = &ir.callback(cb).symbol;
                (
                    symbol,
                    format!(
                        "sm.actions.{}(ctx, from, {}, sm.context)",
                        symbol.pascal,
                        names.state_const(ir.state(branch.target))
                    ),
                )
            }
            Stmt::SetState(target) => {
                writeln!(
                    out,
                    "{}sm.currentState = {}",
                    indent,
                    names.state_const(ir.state(target))
                )?;
                continue;
            }
        };

        writeln!(out, "{}if sm.actions.{} != nil {{", indent, symbol.pascal)?;
        writeln!(out, "{}\tif err := {}; err != nil {{", indent, call)?;
        writeln!(
            out,
            "{}\t\treturn &{}{{Action: {:?}, State: from, Event: event, Err: err}}",
            indent, names.action_error, symbol.name
        )?;
        writeln!(out, "{}\t}}", indent)?;
        writeln!(out, "{}}}", indent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::lower::{LowerOptions, lower};
    use crate::state_machine::{Event, Model, State, Transition};

    fn order_model() -> Model {
        let mut model = Model::new("OrderStateMachine", "pending")
            .unwrap()
            .with_package("orders");
        model
            .add_state(
                State::new("pending")
                    .with_entry("logEntry")
                    .with_exit("logExit"),
            )
            .unwrap();
        model.add_state(State::new("approved")).unwrap();
        model.add_state(State::new("rejected")).unwrap();
        model
            .add_state(State::new("shipped").with_entry("notifyCustomer"))
            .unwrap();
        for name in ["approve", "reject", "ship"] {
            model.add_event(Event::new(name)).unwrap();
        }
        model
            .add_transition(
                Transition::new("pending", "approved", "approve")
                    .with_guard("hasPayment")
                    .with_action("chargeCard"),
            )
            .unwrap();
        model
            .add_transition(
                Transition::new("pending", "rejected", "reject").with_action("sendRejectionEmail"),
            )
            .unwrap();
        model
            .add_transition(
                Transition::new("approved", "shipped", "ship").with_action("notifyShipping"),
            )
            .unwrap();
        model
    }

    fn render(model: &Model, concurrency_safe: bool) -> String {
        let options = LowerOptions {
            package: None,
            concurrency_safe,
        };
        let ir = lower(model, &options).unwrap();
        let mut out = String::new();
        GoEmitter.emit(&ir, &mut out).unwrap();
        out
    }

    #[test]
    fn test_emits_declarations() {
        let code = render(&order_model(), false);
        assert!(code.starts_with(GENERATED_HEADER));
        assert!(code.contains("package orders"));
        assert!(code.contains("type OrderStateMachineState int"));
        for name in ["Pending", "Approved", "Rejected", "Shipped"] {
            assert!(code.contains(&format!("OrderStateMachineState{}", name)));
        }
        assert!(code.contains("type OrderStateMachineEvent int"));
        for name in ["Approve", "Reject", "Ship"] {
            assert!(code.contains(&format!("OrderStateMachineEvent{}", name)));
        }
        assert!(code.contains("\tOrderStateMachineStatePending OrderStateMachineState = iota\n"));
        assert!(code.contains("//exhaustive:enforce"));
        assert!(!code.contains("\"sync\""));
    }

    #[test]
    fn test_emits_callback_fields() {
        let code = render(&order_model(), false);
        assert!(code.contains(
            "HasPayment func(ctx context.Context, c *OrderStateMachineContext) bool"
        ));
        assert!(code.contains(
            "ChargeCard func(ctx context.Context, from, to OrderStateMachineState, c *OrderStateMachineContext) error"
        ));
        assert!(code.contains(
            "NotifyShipping func(ctx context.Context, from, to OrderStateMachineState, c *OrderStateMachineContext) error"
        ));
        assert!(code.contains(
            "LogEntry func(ctx context.Context, c *OrderStateMachineContext) error"
        ));
        assert!(code.contains(
            "NotifyCustomer func(ctx context.Context, c *OrderStateMachineContext) error"
        ));
    }

    #[test]
    fn test_emits_api_surface() {
        let code = render(&order_model(), false);
        assert!(code.contains("func NewOrderStateMachine("));
        assert!(code.contains("func (sm *OrderStateMachine) State()"));
        assert!(code.contains("func (sm *OrderStateMachine) Transition("));
        assert!(code.contains("func (sm *OrderStateMachine) PermittedEvents()"));
        assert!(code.contains("func (sm *OrderStateMachine) CanTransition("));
        assert!(code.contains("currentState: OrderStateMachineStatePending"));
        assert!(code.contains(
            "ErrOrderStateMachineInvalidTransition = errors.New(\"invalid transition\")"
        ));
        assert!(code.contains("ErrOrderStateMachineGuardRejected"));
    }

    #[test]
    fn test_dispatch_order_in_text() {
        let code = render(&order_model(), false);
        let guard = code.find("sm.guards.HasPayment(ctx, sm.context)").unwrap();
        let exit = code.find("sm.actions.LogExit(ctx, sm.context)").unwrap();
        let action = code
            .find("sm.actions.ChargeCard(ctx, from, OrderStateMachineStateApproved, sm.context)")
            .unwrap();
        let commit = code
            .find("sm.currentState = OrderStateMachineStateApproved")
            .unwrap();
        assert!(guard < exit && exit < action && action < commit);

        assert!(code.contains(
            "return fmt.Errorf(\"%w: guard %s rejected event %s in state %s\", ErrOrderStateMachineGuardRejected, \"hasPayment\", event, from)"
        ));
    }

    #[test]
    fn test_package_defaults_to_main() {
        let mut model = Model::new("DoorLock", "locked").unwrap();
        model.add_state(State::new("locked")).unwrap();
        model.add_state(State::new("unlocked")).unwrap();
        model.add_event(Event::new("lock")).unwrap();
        model.add_event(Event::new("unlock")).unwrap();
        model
            .add_transition(Transition::new("locked", "unlocked", "unlock"))
            .unwrap();
        model
            .add_transition(Transition::new("unlocked", "locked", "lock"))
            .unwrap();

        let code = render(&model, false);
        assert!(code.contains("package main"));
        assert!(code.contains("type DoorLockState int"));
        assert!(code.contains("DoorLockEventUnlock"));
        assert!(code.contains("type DoorLockGuards struct{}"));
        assert!(code.contains("type DoorLockActions struct{}"));
    }

    #[test]
    fn test_concurrency_safe_mutex() {
        let code = render(&order_model(), true);
        assert!(code.contains("\t\"sync\"\n"));
        assert!(code.contains("mu           sync.RWMutex"));
        assert!(code.contains("\tsm.mu.Lock()\n\tdefer sm.mu.Unlock()\n"));
        assert!(code.contains("\tsm.mu.RLock()\n\tdefer sm.mu.RUnlock()\n"));
    }
}
