//! Emitters - render a verified [`MachineIr`] as source text for one target language

use crate::codegen::Target;
use crate::codegen::ir::MachineIr;
use std::fmt;

pub mod go;
pub mod rust;

pub use go::GoEmitter;
pub use rust::RustEmitter;

/// First line of every generated file
pub const GENERATED_HEADER: &str = "// Code generated by fsmgen. DO NOT EDIT.";

/// Emitter trait for rendering generated code
///
/// Implementations may assume the IR already passed [`MachineIr::verify`].
pub trait Emitter: Send + Sync {
    fn target(&self) -> Target;

    fn emit(&self, ir: &MachineIr, out: &mut String) -> fmt::Result;
}

/// Create the emitter for a target language
pub fn emitter_for(target: Target) -> Box<dyn Emitter> {
    match target {
        Target::Rust => Box::new(RustEmitter),
        Target::Go => Box::new(GoEmitter),
    }
}

/// Write `prefix key<pad> value` rows with the values aligned on one column,
/// the way gofmt lays out struct fields and keyed literals
pub(crate) fn write_aligned(
    out: &mut String,
    indent: &str,
    rows: &[(String, String)],
) -> fmt::Result {
    use std::fmt::Write;

    let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in rows {
        writeln!(out, "{}{:<width$} {}", indent, key, value, width = width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_for() {
        assert_eq!(emitter_for(Target::Rust).target(), Target::Rust);
        assert_eq!(emitter_for(Target::Go).target(), Target::Go);
    }

    #[test]
    fn test_write_aligned() {
        let mut out = String::new();
        let rows = vec![
            ("currentState:".to_string(), "Pending,".to_string()),
            ("guards:".to_string(), "guards,".to_string()),
        ];
        write_aligned(&mut out, "\t", &rows).unwrap();
        assert_eq!(out, "\tcurrentState: Pending,\n\tguards:       guards,\n");
    }
}
