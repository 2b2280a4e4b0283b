//! Whole-model validation
//!
//! Every check runs independently and appends to one report, so a definition
//! author sees all problems at once instead of fixing them one by one.

use crate::codegen::naming::{to_pascal_case, to_snake_case};
use crate::error::{EntityKind, Error, ModelError, Severity, ValidationError};
use crate::state_machine::{
    CallbackRole, Model, StateGraph, Transition, is_valid_identifier,
};
use std::collections::{HashMap, HashSet};

/// The outcome of validating a model: every issue found, in check order
#[derive(Debug, Clone)]
pub struct ValidationReport {
    machine: String,
    issues: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn issues(&self) -> &[ValidationError] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// True when no issue has error severity. Warnings never fail a report.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Turn a failing report into [`Error::Validation`]
    pub fn into_result(self) -> crate::Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::Validation {
                name: self.machine.clone(),
                errors: self.error_count(),
            })
        }
    }
}

/// Run every whole-model check and collect all issues
pub fn validate(model: &Model) -> ValidationReport {
    let mut issues = Vec::new();

    let has_initial = check_initial_state(model, &mut issues);
    check_non_empty(model, &mut issues);
    check_entities(model, &mut issues);
    if has_initial {
        check_reachability(model, &mut issues);
    }
    check_determinism(model, &mut issues);
    check_generated_names(model, &mut issues);
    check_callback_roles(model, &mut issues);

    let report = ValidationReport {
        machine: model.name().to_string(),
        issues,
    };
    tracing::debug!(
        machine = %model.name(),
        errors = report.error_count(),
        warnings = report.warning_count(),
        "Validated state machine"
    );
    report
}

fn check_initial_state(model: &Model, issues: &mut Vec<ValidationError>) -> bool {
    if model.get_state(model.initial()).is_some() {
        return true;
    }
    issues.push(ValidationError::MissingInitialState {
        initial: model.initial().to_string(),
    });
    false
}

fn check_non_empty(model: &Model, issues: &mut Vec<ValidationError>) {
    if model.states().is_empty() {
        issues.push(ValidationError::EmptyStateSet);
    }
    if model.events().is_empty() {
        issues.push(ValidationError::EmptyEventSet);
    }
}

/// Re-check every entity already in the model, in case it was mutated after insertion
fn check_entities(model: &Model, issues: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for state in model.states() {
        if let Err(err) = state.validate() {
            issues.push(err.into());
        } else if !seen.insert(state.name.as_str()) {
            issues.push(ModelError::duplicate(EntityKind::State, &state.name).into());
        }
    }

    let mut seen = HashSet::new();
    for event in model.events() {
        if let Err(err) = event.validate() {
            issues.push(err.into());
        } else if !seen.insert(event.name.as_str()) {
            issues.push(ModelError::duplicate(EntityKind::Event, &event.name).into());
        }
    }

    for transition in model.transitions() {
        if let Err(err) = transition.validate() {
            issues.push(err.into());
            continue;
        }
        if model.get_state(&transition.from).is_none() {
            issues
                .push(ModelError::dangling("from", EntityKind::State, &transition.from).into());
        }
        if model.get_state(&transition.to).is_none() {
            issues.push(ModelError::dangling("to", EntityKind::State, &transition.to).into());
        }
        if model.get_event(&transition.event).is_none() {
            issues
                .push(ModelError::dangling("event", EntityKind::Event, &transition.event).into());
        }
    }
}

fn check_reachability(model: &Model, issues: &mut Vec<ValidationError>) {
    let graph = StateGraph::build(model);
    for state in graph.unreachable_states() {
        issues.push(ValidationError::UnreachableState {
            state: state.to_string(),
        });
    }
}

/// Group transitions by `(from, event)`, groups ordered by first appearance
fn transition_groups(model: &Model) -> Vec<((&str, &str), Vec<&Transition>)> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut groups: HashMap<(&str, &str), Vec<&Transition>> = HashMap::new();

    for transition in model.transitions() {
        let key = (transition.from.as_str(), transition.event.as_str());
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(transition);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key).map(|group| (key, group)))
        .collect()
}

/// Exact check for unguarded ambiguity, heuristic warning for guarded groups
fn check_determinism(model: &Model, issues: &mut Vec<ValidationError>) {
    for ((from, event), group) in transition_groups(model) {
        let unguarded = group.iter().filter(|t| !t.is_guarded()).count();
        if unguarded > 1 {
            issues.push(ValidationError::NonDeterministicTransition {
                from: from.to_string(),
                event: event.to_string(),
                count: unguarded,
            });
        }

        let guards: Vec<String> = group.iter().filter_map(|t| t.guard.clone()).collect();
        if guards.len() > 1 {
            issues.push(ValidationError::PossibleGuardConflict {
                from: from.to_string(),
                event: event.to_string(),
                guards,
            });
        }
    }
}

/// Names must survive the trip to generated identifiers: usable, and distinct
/// from every other name of the same kind.
fn check_generated_names(model: &Model, issues: &mut Vec<ValidationError>) {
    let machine = to_pascal_case(model.name());
    if !is_valid_identifier(&machine) {
        issues.push(
            ModelError::invalid(
                EntityKind::Machine,
                model.name(),
                "does not produce a usable type name",
            )
            .into(),
        );
    }
    if let Some(package) = model.package()
        && !package.is_empty()
        && !is_valid_identifier(package)
    {
        issues.push(
            ModelError::invalid(EntityKind::Machine, package, "is not a usable package name")
                .into(),
        );
    }

    check_spelling(
        EntityKind::State,
        model.states().iter().map(|s| s.name.as_str()),
        to_pascal_case,
        issues,
    );
    check_spelling(
        EntityKind::Event,
        model.events().iter().map(|e| e.name.as_str()),
        to_pascal_case,
        issues,
    );

    let mut callbacks: Vec<&str> = Vec::new();
    for (name, _) in model.callbacks() {
        if !callbacks.contains(&name) {
            callbacks.push(name);
        }
    }
    check_spelling(
        EntityKind::Transition,
        callbacks.iter().copied(),
        to_pascal_case,
        issues,
    );
    check_spelling(
        EntityKind::Transition,
        callbacks.iter().copied(),
        to_snake_case,
        issues,
    );
}

fn check_spelling<'m>(
    kind: EntityKind,
    names: impl Iterator<Item = &'m str>,
    spell: fn(&str) -> String,
    issues: &mut Vec<ValidationError>,
) {
    let mut spelled: HashMap<String, &str> = HashMap::new();
    for name in names {
        let identifier = spell(name);
        if !is_valid_identifier(&identifier) {
            issues.push(
                ModelError::invalid(kind, name, "does not produce a usable identifier").into(),
            );
            continue;
        }

        match spelled.get(&identifier) {
            Some(&first) if first != name => issues.push(ValidationError::NameCollision {
                kind,
                first: first.to_string(),
                second: name.to_string(),
                identifier,
            }),
            Some(_) => {}
            None => {
                spelled.insert(identifier, name);
            }
        }
    }
}

fn check_callback_roles(model: &Model, issues: &mut Vec<ValidationError>) {
    let mut roles: HashMap<&str, CallbackRole> = HashMap::new();
    let mut reported: HashSet<&str> = HashSet::new();

    for (name, role) in model.callbacks() {
        match roles.get(name) {
            Some(&first) if first != role => {
                if reported.insert(name) {
                    issues.push(ValidationError::CallbackRoleConflict {
                        name: name.to_string(),
                        first: first.name(),
                        second: role.name(),
                    });
                }
            }
            Some(_) => {}
            None => {
                roles.insert(name, role);
            }
        }
    }
}
