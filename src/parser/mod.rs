//! Parser module - machine definition documents (TOML or JSON)

use crate::Result;
use crate::error::Error;
use std::path::{Path, PathBuf};

pub mod definition;
pub mod formats;

// Re-export key types
pub use definition::{
    Built, EventDefinition, MachineDefinition, StateDefinition, TransitionDefinition,
};
pub use formats::{JsonParser, TomlParser};

/// Parser trait for definition documents
pub trait DefinitionParser: Send + Sync {
    /// Short format name, used in log messages
    fn format(&self) -> &'static str;

    fn parse(&self, source: &str) -> Result<MachineDefinition>;
}

/// Pick a parser from the file extension
pub fn parser_for(path: &Path) -> Result<Box<dyn DefinitionParser>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("toml") => Ok(Box::new(TomlParser)),
        Some("json") => Ok(Box::new(JsonParser)),
        _ => Err(Error::parser(format!(
            "unsupported definition format {:?} (expected .toml or .json)",
            path
        ))),
    }
}

/// Parse the contents of the definition file at `path`
pub fn parse_definition(path: &Path, source: &str) -> Result<MachineDefinition> {
    let parser = parser_for(path)?;
    tracing::debug!(format = parser.format(), "Parsing definition {:?}", path);

    parser.parse(source).map_err(|err| match err {
        Error::DefinitionParse { message, .. } => Error::DefinitionParse {
            file: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

impl MachineDefinition {
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        parse_definition(&path, &contents)
    }
}
