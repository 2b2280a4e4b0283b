//! Code generation module - turns a validated model into exhaustive dispatch code
//!
//! Generation runs in three stages: [`lower`](lower::lower) the model into a
//! [`MachineIr`], [`verify`](MachineIr::verify) the IR, then render it with the
//! [`Emitter`] for the requested [`Target`]. Nothing is written unless every
//! stage succeeds.

use crate::error::GenerationError;
use crate::state_machine::Model;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

pub mod emit;
pub mod ir;
pub mod lower;
pub mod naming;
pub mod sim;

pub use emit::{Emitter, emitter_for};
pub use ir::MachineIr;
pub use lower::LowerOptions;
pub use sim::{DispatchError, Hooks, ScriptedHooks, Simulator};

/// Language of the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Rust,
    Go,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Go => "go",
        }
    }

    /// Conventional file extension of generated sources
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Rust => "rs",
            Target::Go => "go",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub target: Target,
    /// Guard the machine with a read/write lock
    pub concurrency_safe: bool,
    /// Overrides the model's package (Go only)
    pub package: Option<String>,
}

/// Code generator. Holds no state between calls, so one instance can serve
/// concurrent `generate` calls.
pub struct Generator {
    options: GenerateOptions,
    emitter: Box<dyn Emitter>,
}

impl Generator {
    pub fn new(options: GenerateOptions) -> Self {
        let emitter = emitter_for(options.target);
        Self { options, emitter }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Lower and verify without rendering
    pub fn lower(&self, model: &Model) -> Result<MachineIr, GenerationError> {
        let options = LowerOptions {
            package: self.options.package.as_deref(),
            concurrency_safe: self.options.concurrency_safe,
        };
        let ir = lower::lower(model, &options)?;
        ir.verify()?;
        Ok(ir)
    }

    /// Generate source for `model`. `None` fails with [`GenerationError::NilModel`].
    pub fn generate(&self, model: Option<&Model>) -> Result<Vec<u8>, GenerationError> {
        let model = model.ok_or(GenerationError::NilModel)?;
        let ir = self.lower(model)?;

        let mut out = String::new();
        self.emitter.emit(&ir, &mut out)?;

        tracing::debug!(
            machine = %model.name(),
            target = %self.emitter.target(),
            bytes = out.len(),
            "Generated state machine"
        );
        Ok(out.into_bytes())
    }

    /// Generate and write to `writer`. Nothing is written when generation fails.
    pub fn generate_to<W: io::Write>(
        &self,
        model: Option<&Model>,
        writer: &mut W,
    ) -> crate::Result<()> {
        let code = self.generate(model)?;
        writer.write_all(&code)?;
        Ok(())
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{Event, State, Transition};

    fn order_model() -> Model {
        let mut model = Model::new("OrderStateMachine", "pending").unwrap();
        for name in ["pending", "approved", "rejected", "shipped"] {
            model.add_state(State::new(name)).unwrap();
        }
        for name in ["approve", "reject", "ship"] {
            model.add_event(Event::new(name)).unwrap();
        }
        model
            .add_transition(Transition::new("pending", "approved", "approve"))
            .unwrap();
        model
            .add_transition(Transition::new("pending", "rejected", "reject"))
            .unwrap();
        model
            .add_transition(Transition::new("approved", "shipped", "ship"))
            .unwrap();
        model
    }

    #[test]
    fn test_nil_model() {
        let generator = Generator::new(GenerateOptions::default());
        let err = generator.generate(None).unwrap_err();
        assert!(matches!(err, GenerationError::NilModel));
        assert_eq!(err.to_string(), "model cannot be nil");

        let mut buf = Vec::new();
        assert!(generator.generate_to(None, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_generate_both_targets() {
        let model = order_model();
        for target in [Target::Rust, Target::Go] {
            let generator = Generator::new(GenerateOptions {
                target,
                ..Default::default()
            });
            let code = String::from_utf8(generator.generate(Some(&model)).unwrap()).unwrap();
            assert!(code.starts_with(emit::GENERATED_HEADER), "{}", target);
            assert!(
                code.contains("OrderStateMachineStatePending")
                    || code.contains("OrderStateMachineState::Pending")
            );
        }
    }

    #[test]
    fn test_generate_rejects_stateless_model() {
        let model = Model::new("Empty", "pending").unwrap();
        let generator = Generator::new(GenerateOptions::default());
        assert!(matches!(
            generator.generate(Some(&model)),
            Err(GenerationError::InvariantViolation(_))
        ));

        let mut buf = Vec::new();
        assert!(generator.generate_to(Some(&model), &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let model = order_model();
        let generator = Generator::new(GenerateOptions {
            target: Target::Go,
            concurrency_safe: true,
            package: Some("orders".to_string()),
        });
        let first = generator.generate(Some(&model)).unwrap();
        let second = generator.generate(Some(&model)).unwrap();
        assert_eq!(first, second);
        assert!(String::from_utf8(first).unwrap().contains("package orders"));
    }

    #[test]
    fn test_generator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Generator>();
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::Rust.to_string(), "rust");
        assert_eq!(Target::Go.extension(), "go");
        assert_eq!(Target::default(), Target::Rust);
    }
}
