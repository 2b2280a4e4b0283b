//! Rust emitter
//!
//! Produces a self-contained module: state and event enums, an error enum,
//! a callbacks trait the user implements, and a machine generic over it whose
//! `transition` is a nested `match` the compiler checks for exhaustiveness.

use crate::codegen::Target;
use crate::codegen::emit::{Emitter, GENERATED_HEADER};
use crate::codegen::ir::{Branch, EventArm, MachineIr, Stmt, Symbol};
use crate::state_machine::CallbackRole;
use std::fmt::{self, Write};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers
const RESERVED: &[&str] = &["crate", "self", "Self", "super"];

/// Escape a generated identifier that collides with a keyword
pub fn escape_ident(ident: &str) -> String {
    if RESERVED.contains(&ident) {
        format!("{}_", ident)
    } else if KEYWORDS.contains(&ident) {
        format!("r#{}", ident)
    } else {
        ident.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

/// Type names derived from the machine name
struct Names {
    machine: String,
    state: String,
    event: String,
    error: String,
    action_error: String,
    action_result: String,
    callbacks: String,
    shared: String,
}

impl Names {
    fn new(ir: &MachineIr) -> Self {
        let machine = escape_ident(&ir.name.pascal);
        Self {
            state: format!("{}State", machine),
            event: format!("{}Event", machine),
            error: format!("{}Error", machine),
            action_error: format!("{}ActionError", machine),
            action_result: format!("{}ActionResult", machine),
            callbacks: format!("{}Callbacks", machine),
            shared: format!("Shared{}", machine),
            machine,
        }
    }
}

fn variant(symbol: &Symbol) -> String {
    escape_ident(&symbol.pascal)
}

fn method(symbol: &Symbol) -> String {
    escape_ident(&symbol.snake)
}

impl Emitter for RustEmitter {
    fn target(&self) -> Target {
        Target::Rust
    }

    fn emit(&self, ir: &MachineIr, out: &mut String) -> fmt::Result {
        let names = Names::new(ir);

        writeln!(out, "{}", GENERATED_HEADER)?;
        writeln!(out, "// State machine: {}", ir.name.name)?;
        writeln!(out)?;
        writeln!(out, "use std::error::Error as StdError;")?;
        writeln!(out, "use std::fmt;")?;
        if ir.concurrency_safe {
            writeln!(out, "use std::sync::{{PoisonError, RwLock}};")?;
        }
        writeln!(out)?;

        emit_enum(out, &names.state, "States", &ir.name.name, &ir.states)?;
        emit_enum(out, &names.event, "Events", &ir.name.name, &ir.events)?;
        emit_error(out, &names)?;
        emit_callbacks(out, ir, &names)?;
        emit_machine(out, ir, &names)?;
        if ir.concurrency_safe {
            emit_shared(out, &names)?;
        }
        Ok(())
    }
}

fn emit_enum(
    out: &mut String,
    ty: &str,
    what: &str,
    machine: &str,
    symbols: &[Symbol],
) -> fmt::Result {
    writeln!(out, "/// {} of the `{}` state machine", what, machine)?;
    writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]")?;
    writeln!(out, "pub enum {} {{", ty)?;
    for symbol in symbols {
        writeln!(out, "    {},", variant(symbol))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl {} {{", ty)?;
    writeln!(out, "    pub const ALL: [{}; {}] = [", ty, symbols.len())?;
    for symbol in symbols {
        writeln!(out, "        {}::{},", ty, variant(symbol))?;
    }
    writeln!(out, "    ];")?;
    writeln!(out)?;
    writeln!(out, "    /// Name as declared in the definition")?;
    writeln!(out, "    pub fn as_str(&self) -> &'static str {{")?;
    writeln!(out, "        match self {{")?;
    for symbol in symbols {
        writeln!(
            out,
            "            {}::{} => {:?},",
            ty,
            variant(symbol),
            symbol.name
        )?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl fmt::Display for {} {{", ty)?;
    writeln!(
        out,
        "    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{"
    )?;
    writeln!(out, "        f.write_str(self.as_str())")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_error(out: &mut String, names: &Names) -> fmt::Result {
    let Names {
        state,
        event,
        error,
        action_error,
        action_result,
        ..
    } = names;

    writeln!(out, "/// Error returned by a failing user action")?;
    writeln!(
        out,
        "pub type {} = Box<dyn StdError + Send + Sync + 'static>;",
        action_error
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "pub type {} = Result<(), {}>;",
        action_result, action_error
    )?;
    writeln!(out)?;

    writeln!(out, "#[derive(Debug)]")?;
    writeln!(out, "pub enum {} {{", error)?;
    writeln!(
        out,
        "    /// No transition handles the event in the current state"
    )?;
    writeln!(
        out,
        "    InvalidTransition {{ state: {}, event: {} }},",
        state, event
    )?;
    writeln!(
        out,
        "    /// Every candidate transition was rejected by its guard"
    )?;
    writeln!(out, "    GuardRejected {{")?;
    writeln!(out, "        state: {},", state)?;
    writeln!(out, "        event: {},", event)?;
    writeln!(out, "        guard: &'static str,")?;
    writeln!(out, "    }},")?;
    writeln!(out, "    /// A user action returned an error")?;
    writeln!(out, "    ActionFailed {{")?;
    writeln!(out, "        action: &'static str,")?;
    writeln!(out, "        state: {},", state)?;
    writeln!(out, "        event: {},", event)?;
    writeln!(out, "        source: {},", action_error)?;
    writeln!(out, "    }},")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl {} {{", error)?;
    writeln!(out, "    pub fn kind(&self) -> &'static str {{")?;
    writeln!(out, "        match self {{")?;
    for kind in ["InvalidTransition", "GuardRejected", "ActionFailed"] {
        writeln!(
            out,
            "            {}::{} {{ .. }} => {:?},",
            error, kind, kind
        )?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl fmt::Display for {} {{", error)?;
    writeln!(
        out,
        "    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{"
    )?;
    writeln!(out, "        match self {{")?;
    writeln!(
        out,
        "            {}::InvalidTransition {{ state, event }} => {{",
        error
    )?;
    writeln!(
        out,
        "                write!(f, \"invalid transition: event {{}} is not permitted in state {{}}\", event, state)"
    )?;
    writeln!(out, "            }}")?;
    writeln!(
        out,
        "            {}::GuardRejected {{ state, event, guard }} => {{",
        error
    )?;
    writeln!(
        out,
        "                write!(f, \"guard {{}} rejected event {{}} in state {{}}\", guard, event, state)"
    )?;
    writeln!(out, "            }}")?;
    writeln!(out, "            {}::ActionFailed {{", error)?;
    writeln!(out, "                action,")?;
    writeln!(out, "                state,")?;
    writeln!(out, "                event,")?;
    writeln!(out, "                source,")?;
    writeln!(out, "            }} => write!(")?;
    writeln!(out, "                f,")?;
    writeln!(
        out,
        "                \"action {{}} failed in state {{}} on event {{}}: {{}}\","
    )?;
    writeln!(out, "                action, state, event, source")?;
    writeln!(out, "            ),")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl StdError for {} {{", error)?;
    writeln!(
        out,
        "    fn source(&self) -> Option<&(dyn StdError + 'static)> {{"
    )?;
    writeln!(out, "        match self {{")?;
    writeln!(
        out,
        "            {}::ActionFailed {{ source, .. }} => Some(source.as_ref()),",
        error
    )?;
    writeln!(out, "            _ => None,")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_callbacks(out: &mut String, ir: &MachineIr, names: &Names) -> fmt::Result {
    writeln!(
        out,
        "/// Guards and actions called by `{}::transition`",
        names.machine
    )?;
    if ir.callbacks.is_empty() {
        writeln!(out, "pub trait {} {{}}", names.callbacks)?;
        writeln!(out)?;
        writeln!(out, "impl {} for () {{}}", names.callbacks)?;
        return writeln!(out);
    }

    writeln!(out, "pub trait {} {{", names.callbacks)?;
    for (i, callback) in ir.callbacks.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        let name = method(&callback.symbol);
        match callback.role {
            CallbackRole::Guard => {
                writeln!(out, "    /// Guard `{}`", callback.symbol.name)?;
                writeln!(out, "    fn {}(&self) -> bool;", name)?;
            }
            CallbackRole::Action => {
                writeln!(out, "    /// Transition action `{}`", callback.symbol.name)?;
                writeln!(
                    out,
                    "    fn {}(&mut self, from: {}, to: {}) -> {};",
                    name, names.state, names.state, names.action_result
                )?;
            }
            CallbackRole::StateHook => {
                writeln!(out, "    /// Entry/exit action `{}`", callback.symbol.name)?;
                writeln!(
                    out,
                    "    fn {}(&mut self) -> {};",
                    name, names.action_result
                )?;
            }
        }
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_machine(out: &mut String, ir: &MachineIr, names: &Names) -> fmt::Result {
    let Names {
        machine,
        state,
        event,
        error,
        callbacks,
        ..
    } = names;

    writeln!(out, "#[derive(Debug)]")?;
    writeln!(out, "pub struct {}<C> {{", machine)?;
    writeln!(out, "    current_state: {},", state)?;
    writeln!(out, "    callbacks: C,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl<C: {}> {}<C> {{", callbacks, machine)?;
    writeln!(
        out,
        "    /// Create a machine in the `{}` state",
        ir.initial_state().name
    )?;
    writeln!(out, "    pub fn new(callbacks: C) -> Self {{")?;
    writeln!(out, "        Self {{")?;
    writeln!(
        out,
        "            current_state: {}::{},",
        state,
        variant(ir.initial_state())
    )?;
    writeln!(out, "            callbacks,")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn current_state(&self) -> {} {{", state)?;
    writeln!(out, "        self.current_state")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn callbacks(&self) -> &C {{")?;
    writeln!(out, "        &self.callbacks")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn callbacks_mut(&mut self) -> &mut C {{")?;
    writeln!(out, "        &mut self.callbacks")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn into_callbacks(self) -> C {{")?;
    writeln!(out, "        self.callbacks")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    writeln!(
        out,
        "    /// Events with a transition out of the current state. Guards are not evaluated."
    )?;
    writeln!(
        out,
        "    pub fn permitted_events(&self) -> &'static [{}] {{",
        event
    )?;
    writeln!(out, "        match self.current_state {{")?;
    for arm in &ir.dispatch {
        let permitted: Vec<String> = arm
            .events
            .iter()
            .map(|e| format!("{}::{}", event, variant(ir.event(e.event))))
            .collect();
        writeln!(
            out,
            "            {}::{} => &[{}],",
            state,
            variant(ir.state(arm.state)),
            permitted.join(", ")
        )?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    pub fn can_transition(&self, event: {}) -> bool {{",
        event
    )?;
    writeln!(out, "        self.permitted_events().contains(&event)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    writeln!(
        out,
        "    /// Dispatch `event`: guard, exit action, transition action, state change,"
    )?;
    writeln!(
        out,
        "    /// entry action. Any failure before the state change leaves the state"
    )?;
    writeln!(
        out,
        "    /// unchanged; a failing entry action leaves the machine in the new state."
    )?;
    writeln!(
        out,
        "    pub fn transition(&mut self, event: {}) -> Result<(), {}> {{",
        event, error
    )?;
    writeln!(out, "        let from = self.current_state;")?;
    writeln!(out, "        match from {{")?;
    for arm in &ir.dispatch {
        let state_path = format!("{}::{}", state, variant(ir.state(arm.state)));
        if arm.events.is_empty() {
            writeln!(
                out,
                "            {} => Err({}::InvalidTransition {{ state: from, event }}),",
                state_path, error
            )?;
            continue;
        }

        writeln!(out, "            {} => match event {{", state_path)?;
        for event_arm in &arm.events {
            emit_event_arm(out, ir, names, event_arm)?;
        }
        if ir.is_partial(arm.state) {
            writeln!(
                out,
                "                _ => Err({}::InvalidTransition {{ state: from, event }}),",
                error
            )?;
        }
        writeln!(out, "            }},")?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_event_arm(
    out: &mut String,
    ir: &MachineIr,
    names: &Names,
    arm: &EventArm,
) -> fmt::Result {
    const INDENT: &str = "                    ";

    writeln!(
        out,
        "                {}::{} => {{",
        names.event,
        variant(ir.event(arm.event))
    )?;

    let mut last_guard = None;
    for branch in arm.guarded() {
        let Some(guard) = branch.guard else {
            continue;
        };
        let guard = &ir.callback(guard).symbol;
        writeln!(out, "{}if self.callbacks.{}() {{", INDENT, method(guard))?;
        emit_body(out, ir, names, branch, &format!("{}    ", INDENT))?;
        writeln!(out, "{}    return Ok(());", INDENT)?;
        writeln!(out, "{}}}", INDENT)?;
        last_guard = Some(guard);
    }

    match (arm.fallback(), last_guard) {
        (Some(fallback), _) => {
            emit_body(out, ir, names, fallback, INDENT)?;
            writeln!(out, "{}Ok(())", INDENT)?;
        }
        (None, Some(guard)) => {
            writeln!(out, "{}Err({}::GuardRejected {{", INDENT, names.error)?;
            writeln!(out, "{}    state: from,", INDENT)?;
            writeln!(out, "{}    event,", INDENT)?;
            writeln!(out, "{}    guard: {:?},", INDENT, guard.name)?;
            writeln!(out, "{}}})", INDENT)?;
        }
        (None, None) => {
            writeln!(
                out,
                "{}Err({}::InvalidTransition {{ state: from, event }})",
                INDENT, names.error
            )?;
        }
    }

    writeln!(out, "                }}")
}

fn emit_body(
    out: &mut String,
    ir: &MachineIr,
    names: &Names,
    branch: &Branch,
    indent: &str,
) -> fmt::Result {
    for stmt in &branch.body {
        match *stmt {
            Stmt::Exit(cb) | Stmt::Entry(cb) => {
                let symbol = &ir.callback(cb).symbol;
                writeln!(
                    out,
                    "{}self.callbacks.{}().map_err(|source| {{",
                    indent, method(symbol)
                )?;
                emit_action_failed(out, names, &symbol.name, indent)?;
            }
            Stmt::Action(cb) => {
                let symbol = &ir.callback(cb).symbol;
                writeln!(
                    out,
                    "{}self.callbacks.{}(from, {}::{}).map_err(|source| {{",
                    indent,
                    method(symbol),
                    names.state,
                    variant(ir.state(branch.target))
                )?;
                emit_action_failed(out, names, &symbol.name, indent)?;
            }
            Stmt::SetState(target) => {
                writeln!(
                    out,
                    "{}self.current_state = {}::{};",
                    indent,
                    names.state,
                    variant(ir.state(target))
                )?;
            }
        }
    }
    Ok(())
}

fn emit_action_failed(out: &mut String, names: &Names, action: &str, indent: &str) -> fmt::Result {
    writeln!(out, "{}    {}::ActionFailed {{", indent, names.error)?;
    writeln!(out, "{}        action: {:?},", indent, action)?;
    writeln!(out, "{}        state: from,", indent)?;
    writeln!(out, "{}        event,", indent)?;
    writeln!(out, "{}        source,", indent)?;
    writeln!(out, "{}    }}", indent)?;
    writeln!(out, "{}}})?;", indent)
}

fn emit_shared(out: &mut String, names: &Names) -> fmt::Result {
    let Names {
        machine,
        state,
        event,
        error,
        callbacks,
        shared,
        ..
    } = names;

    writeln!(
        out,
        "/// `{}` behind a `RwLock`: queries take the read lock, `transition` the write lock",
        machine
    )?;
    writeln!(out, "#[derive(Debug)]")?;
    writeln!(out, "pub struct {}<C> {{", shared)?;
    writeln!(out, "    inner: RwLock<{}<C>>,", machine)?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "impl<C: {}> {}<C> {{", callbacks, shared)?;
    writeln!(out, "    pub fn new(callbacks: C) -> Self {{")?;
    writeln!(out, "        Self {{")?;
    writeln!(
        out,
        "            inner: RwLock::new({}::new(callbacks)),",
        machine
    )?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn current_state(&self) -> {} {{", state)?;
    writeln!(
        out,
        "        self.inner.read().unwrap_or_else(PoisonError::into_inner).current_state()"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    pub fn permitted_events(&self) -> &'static [{}] {{",
        event
    )?;
    writeln!(
        out,
        "        self.inner.read().unwrap_or_else(PoisonError::into_inner).permitted_events()"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    pub fn can_transition(&self, event: {}) -> bool {{",
        event
    )?;
    writeln!(
        out,
        "        self.inner.read().unwrap_or_else(PoisonError::into_inner).can_transition(event)"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    pub fn transition(&self, event: {}) -> Result<(), {}> {{",
        event, error
    )?;
    writeln!(
        out,
        "        self.inner.write().unwrap_or_else(PoisonError::into_inner).transition(event)"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn into_inner(self) -> {}<C> {{", machine)?;
    writeln!(
        out,
        "        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")
}
