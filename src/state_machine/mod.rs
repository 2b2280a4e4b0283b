//! State machine module - Model, graph analysis and validation of machine definitions

use crate::error::{EntityKind, ModelError};
use regex::Regex;
use std::sync::LazyLock;

pub mod analyzer;
pub mod event;
pub mod graph;
pub mod model;
pub mod state;
pub mod transition;
pub mod validator;

// Re-export key types
pub use event::{Event, EventId};
pub use graph::{GraphStats, StateGraph};
pub use model::{CallbackRole, Model};
pub use state::{State, StateId};
pub use transition::Transition;
pub use validator::{ValidationReport, validate};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Whether `name` matches `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Check a declared name against the identifier grammar
pub(crate) fn check_identifier(
    kind: EntityKind,
    what: &str,
    name: &str,
) -> std::result::Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::invalid(
            kind,
            name,
            format!("{} cannot be empty", what),
        ));
    }

    if !is_valid_identifier(name) {
        return Err(ModelError::invalid(
            kind,
            name,
            format!(
                "{} contains invalid characters (use only letters, digits, and underscores)",
                what
            ),
        ));
    }

    Ok(())
}

/// Check an optional callback (guard or action) name
pub(crate) fn check_callback(
    kind: EntityKind,
    owner: &str,
    what: &str,
    name: Option<&str>,
) -> std::result::Result<(), ModelError> {
    match name {
        Some(callback) if !is_valid_identifier(callback) => Err(ModelError::invalid(
            kind,
            owner,
            format!("{} {:?} is not a valid identifier", what, callback),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_grammar() {
        assert!(is_valid_identifier("pending"));
        assert!(is_valid_identifier("submit_order"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("State2"));

        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("submit order"));
        assert!(!is_valid_identifier("user-logged-in"));
    }

    #[test]
    fn test_check_callback() {
        assert!(check_callback(EntityKind::State, "pending", "entry action", None).is_ok());
        assert!(
            check_callback(
                EntityKind::State,
                "pending",
                "entry action",
                Some("logEntry")
            )
            .is_ok()
        );
        assert!(check_callback(EntityKind::State, "pending", "entry action", Some("")).is_err());
    }
}
