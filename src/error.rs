//! This module defines all error types used throughout the application.
//!
//! Errors are split by the stage that raises them:
//! - [`ModelError`]: construction-time, fail-fast, raised by the model's add-operations
//! - [`ValidationError`]: whole-model issues, aggregated into a report
//! - [`GenerationError`]: code synthesis precondition failures
//! - [`Error`]: the driver-level error wrapping all of the above plus I/O and config

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of entity held by the model registries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    State,
    Event,
    Transition,
    Machine,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::State => "state",
            EntityKind::Event => "event",
            EntityKind::Transition => "transition",
            EntityKind::Machine => "machine",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building a model. A failing add-operation never mutates the model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Empty or malformed entity
    #[error("invalid {kind} {name:?}: {reason}")]
    InvalidEntity {
        kind: EntityKind,
        name: String,
        reason: String,
    },

    /// Entity name already registered
    #[error("{kind} {name:?} is already defined")]
    DuplicateEntity { kind: EntityKind, name: String },

    /// Transition field naming a state or event that is not registered
    #[error("transition field `{field}` references undefined {kind} {name:?}")]
    DanglingReference {
        field: &'static str,
        kind: EntityKind,
        name: String,
    },
}

impl ModelError {
    pub fn invalid(kind: EntityKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            kind,
            name: name.into(),
        }
    }

    pub fn dangling(field: &'static str, kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DanglingReference {
            field,
            kind,
            name: name.into(),
        }
    }
}

/// How serious a validation issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-model issues found by the validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("initial state {initial:?} is not defined")]
    MissingInitialState { initial: String },

    #[error("state machine must define at least one state")]
    EmptyStateSet,

    #[error("state machine must define at least one event")]
    EmptyEventSet,

    /// Structural re-check of an entity already in the model
    #[error(transparent)]
    InvalidEntity(ModelError),

    #[error("state {state:?} is unreachable from the initial state")]
    UnreachableState { state: String },

    /// More than one unguarded transition shares `(from, event)`
    #[error(
        "{count} unguarded transitions leave state {from:?} on event {event:?}; dispatch cannot choose between them"
    )]
    NonDeterministicTransition {
        from: String,
        event: String,
        count: usize,
    },

    /// Two declared names spell the same generated identifier
    #[error("{kind}s {first:?} and {second:?} both generate the identifier `{identifier}`")]
    NameCollision {
        kind: EntityKind,
        first: String,
        second: String,
        identifier: String,
    },

    /// One callback name used in roles with different signatures
    #[error("callback {name:?} is used both as a {first} and as a {second}")]
    CallbackRoleConflict {
        name: String,
        first: &'static str,
        second: &'static str,
    },

    /// Advisory only. Guards are opaque, so overlap cannot be decided; this flags
    /// every group selected by two or more guards and never fails validation.
    #[error(
        "transitions leaving state {from:?} on event {event:?} are selected by guards [{}] which may overlap",
        .guards.join(", ")
    )]
    PossibleGuardConflict {
        from: String,
        event: String,
        guards: Vec<String>,
    },
}

impl ValidationError {
    pub fn severity(&self) -> Severity {
        match self {
            ValidationError::PossibleGuardConflict { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable machine-readable code, used by JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingInitialState { .. } => "missing_initial_state",
            ValidationError::EmptyStateSet => "empty_state_set",
            ValidationError::EmptyEventSet => "empty_event_set",
            ValidationError::InvalidEntity(ModelError::InvalidEntity { .. }) => "invalid_entity",
            ValidationError::InvalidEntity(ModelError::DuplicateEntity { .. }) => {
                "duplicate_entity"
            }
            ValidationError::InvalidEntity(ModelError::DanglingReference { .. }) => {
                "dangling_reference"
            }
            ValidationError::UnreachableState { .. } => "unreachable_state",
            ValidationError::NonDeterministicTransition { .. } => "non_deterministic_transition",
            ValidationError::NameCollision { .. } => "name_collision",
            ValidationError::CallbackRoleConflict { .. } => "callback_role_conflict",
            ValidationError::PossibleGuardConflict { .. } => "possible_guard_conflict",
        }
    }
}

impl From<ModelError> for ValidationError {
    fn from(err: ModelError) -> Self {
        ValidationError::InvalidEntity(err)
    }
}

/// Errors raised by the code synthesizer
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No model was handed to the generator
    #[error("model cannot be nil")]
    NilModel,

    /// The model or the lowered IR breaks an invariant generation relies on.
    /// Only reachable when a model bypassed validation.
    #[error("model violates a generation invariant: {0}")]
    InvariantViolation(String),

    #[error("failed to render generated source: {0}")]
    Format(#[from] fmt::Error),
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Model construction errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Definition built with construction errors
    #[error("Definition {file:?} has {count} construction error(s)")]
    Definition { file: PathBuf, count: usize },

    /// Validation failed with at least one error-severity issue
    #[error("State machine {name:?} failed validation with {errors} error(s)")]
    Validation { name: String, errors: usize },

    /// Code generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Parser errors
    #[error("Parser error: {0}")]
    Parser(String),

    /// Definition document parsing errors
    #[error("Definition parsing error in {file:?}: {message}")]
    DefinitionParse { file: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Wrapped anyhow errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Self::Parser(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit status: 1 when the user's definition is wrong, 2 for
    /// everything else (unreadable files, bad configuration, I/O)
    pub fn exit_code(&self) -> u8 {
        if self.is_definition_error() { 1 } else { 2 }
    }

    /// Whether the error means the user's definition is wrong, as opposed to the environment
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Error::Model(_)
                | Error::Definition { .. }
                | Error::Validation { .. }
                | Error::DefinitionParse { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::DefinitionParse {
            file: PathBuf::from("unknown"),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parser(format!("JSON error: {}", err))
    }
}

// Helper macros for creating errors

/// Create a custom error with formatting
#[macro_export]
macro_rules! custom_error {
    ($($arg:tt)*) => {
        $crate::error::Error::Custom(format!($($arg)*))
    };
}

/// Bail with a custom error message
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::custom_error!($($arg)*))
    };
}

/// Ensure a condition is true or return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($($arg)*);
        }
    };
}
