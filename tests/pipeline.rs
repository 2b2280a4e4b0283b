//! End-to-end tests: definition document to validated model to generated code.

use fsmgen::codegen::{
    DispatchError, GenerateOptions, Generator, ScriptedHooks, Simulator, Target,
};
use fsmgen::error::{GenerationError, ValidationError};
use fsmgen::parser::{DefinitionParser, JsonParser, MachineDefinition, TomlParser};
use fsmgen::state_machine::{Model, StateGraph, Transition};

const ORDER: &str = include_str!("../demos/order.toml");
const DOOR_LOCK: &str = include_str!("../demos/door_lock.json");

fn order_model() -> Model {
    let built = TomlParser.parse(ORDER).unwrap().build().unwrap();
    assert!(built.is_clean(), "{:?}", built.errors);
    built.model
}

#[test]
fn order_definition_validates() {
    let model = order_model();
    let report = model.validate();
    assert!(report.is_valid(), "{:?}", report.issues());
    assert!(report.issues().is_empty());

    let graph = StateGraph::build(&model);
    assert!(graph.unreachable_states().is_empty());
    assert!(!graph.has_cycles());
    assert_eq!(graph.terminal_states(), vec!["rejected", "shipped"]);
}

#[test]
fn archived_state_is_unreachable() {
    let mut model = order_model();
    model
        .add_state(fsmgen::state_machine::State::new("archived"))
        .unwrap();

    let graph = StateGraph::build(&model);
    assert_eq!(graph.unreachable_states(), vec!["archived"]);
    assert!(!model.validate().is_valid());
}

#[test]
fn shipping_back_to_pending_is_a_cycle() {
    let mut model = order_model();
    model
        .add_transition(Transition::new("shipped", "pending", "ship"))
        .unwrap();
    assert!(StateGraph::build(&model).has_cycles());
}

#[test]
fn duplicate_unguarded_transition_is_reported_once() {
    let mut model = order_model();
    model.transition_mut(0).unwrap().guard = None;
    model
        .add_transition(Transition::new("pending", "rejected", "approve"))
        .unwrap();

    let report = model.validate();
    let non_deterministic: Vec<&ValidationError> = report
        .errors()
        .filter(|e| matches!(e, ValidationError::NonDeterministicTransition { .. }))
        .collect();
    assert_eq!(non_deterministic.len(), 1);
    assert!(matches!(
        non_deterministic[0],
        ValidationError::NonDeterministicTransition { from, event, count: 2 }
            if from == "pending" && event == "approve"
    ));
}

#[test]
fn generating_without_a_model_fails() {
    let generator = Generator::new(GenerateOptions::default());
    assert!(matches!(generator.generate(None), Err(GenerationError::NilModel)));
}

#[test]
fn shipping_a_pending_order_is_invalid() {
    let model = order_model();
    let ir = Generator::new(GenerateOptions::default()).lower(&model).unwrap();
    let mut sim = Simulator::new(&ir);

    let err = sim.transition("ship", &mut ScriptedHooks::new()).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    assert_eq!(sim.current_state(), "pending");

    let rust = String::from_utf8(
        Generator::new(GenerateOptions::default())
            .generate(Some(&model))
            .unwrap(),
    )
    .unwrap();
    assert!(rust.contains(
        "_ => Err(OrderStateMachineError::InvalidTransition { state: from, event }),"
    ));
}

#[test]
fn full_order_lifecycle() {
    let model = order_model();
    let ir = Generator::new(GenerateOptions::default()).lower(&model).unwrap();
    let mut sim = Simulator::new(&ir);
    let mut hooks = ScriptedHooks::new();

    sim.transition("approve", &mut hooks).unwrap();
    sim.transition("ship", &mut hooks).unwrap();
    assert_eq!(sim.current_state(), "shipped");
    assert_eq!(
        hooks.calls,
        vec![
            "guard:hasPayment",
            "hook:logExit",
            "action:chargeCard(pending->approved)",
            "action:notifyShipping(approved->shipped)",
            "hook:notifyCustomer",
        ]
    );
}

#[test]
fn go_output_for_order_definition() {
    let model = order_model();
    let generator = Generator::new(GenerateOptions {
        target: Target::Go,
        ..Default::default()
    });
    let code = String::from_utf8(generator.generate(Some(&model)).unwrap()).unwrap();

    assert!(code.contains("package orders"));
    assert!(code.contains("type OrderStateMachineState int"));
    assert!(code.contains("//exhaustive:enforce"));
    assert!(code.contains("func NewOrderStateMachine("));
    assert!(code.contains("currentState: OrderStateMachineStatePending"));
    assert!(code.contains(
        "SendRejectionEmail func(ctx context.Context, from, to OrderStateMachineState, c *OrderStateMachineContext) error"
    ));
}

#[test]
fn door_lock_json_definition() {
    let definition = JsonParser.parse(DOOR_LOCK).unwrap();
    let model = definition.build().unwrap().model;
    assert!(model.validate().is_valid());

    let generator = Generator::new(GenerateOptions {
        target: Target::Go,
        concurrency_safe: true,
        package: None,
    });
    let code = String::from_utf8(generator.generate(Some(&model)).unwrap()).unwrap();
    assert!(code.contains("package security"));
    assert!(code.contains("type DoorLockState int"));
    assert!(code.contains("sync.RWMutex"));

    assert_eq!(MachineDefinition::from_model(&model), definition);
}
