//! Definition document formats

use crate::Result;
use crate::error::Error;
use crate::parser::{DefinitionParser, MachineDefinition};
use std::path::PathBuf;

/// TOML definitions, using `[[states]]`, `[[events]]` and `[[transitions]]` tables
pub struct TomlParser;

impl DefinitionParser for TomlParser {
    fn format(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, source: &str) -> Result<MachineDefinition> {
        let definition: MachineDefinition = toml::from_str(source)?;
        Ok(definition)
    }
}

/// JSON definitions with the same shape as the TOML form
pub struct JsonParser;

impl DefinitionParser for JsonParser {
    fn format(&self) -> &'static str {
        "json"
    }

    fn parse(&self, source: &str) -> Result<MachineDefinition> {
        serde_json::from_str(source).map_err(|e| Error::DefinitionParse {
            file: PathBuf::from("unknown"),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_TOML: &str = r#"
name = "OrderStateMachine"
initial = "pending"
package = "orders"

[[states]]
name = "pending"
entry = "logEntry"
exit = "logExit"

[[states]]
name = "approved"

[[states]]
name = "shipped"
entry = "notifyCustomer"

[[events]]
name = "approve"

[[events]]
name = "ship"
description = "Hand the parcel to the carrier"

[[transitions]]
from = "pending"
to = "approved"
on = "approve"
guard = "hasPayment"
action = "chargeCard"

[[transitions]]
from = "approved"
to = "shipped"
on = "ship"
"#;

    #[test]
    fn test_parse_toml() {
        let def = TomlParser.parse(ORDER_TOML).unwrap();
        assert_eq!(def.name, "OrderStateMachine");
        assert_eq!(def.package.as_deref(), Some("orders"));
        assert_eq!(def.states.len(), 3);
        assert_eq!(def.states[0].exit.as_deref(), Some("logExit"));
        assert_eq!(
            def.events[1].description.as_deref(),
            Some("Hand the parcel to the carrier")
        );
        assert_eq!(def.transitions[0].on, "approve");
        assert_eq!(def.transitions[0].guard.as_deref(), Some("hasPayment"));
        assert_eq!(def.transitions[1].action, None);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "name": "DoorLock",
            "initial": "locked",
            "states": [{"name": "locked"}, {"name": "unlocked"}],
            "events": [{"name": "unlock"}],
            "transitions": [{"from": "locked", "to": "unlocked", "on": "unlock"}]
        }"#;
        let def = JsonParser.parse(json).unwrap();
        assert_eq!(def.initial, "locked");
        assert_eq!(def.package, None);
        assert_eq!(def.transitions.len(), 1);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let toml = "name = \"M\"\ninitial = \"a\"\n\n[[states]]\nname = \"a\"\nentry_action = \"x\"\n";
        assert!(matches!(
            TomlParser.parse(toml),
            Err(Error::DefinitionParse { .. })
        ));

        let json = r#"{"name": "M", "initial": "a", "colour": "red"}"#;
        assert!(JsonParser.parse(json).is_err());
    }

    #[test]
    fn test_missing_required_field() {
        assert!(TomlParser.parse("name = \"M\"\n").is_err());
    }
}
