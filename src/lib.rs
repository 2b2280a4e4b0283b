//! fsmgen - finite-state-machine definition compiler
//!
//! Reads a declarative machine definition and emits source code for an
//! exhaustive, type-safe state machine.
//!
//! This library provides functionality for:
//! - Building a machine model from states, events and transitions
//! - Analyzing its transition graph (reachability, cycles, terminal states)
//! - Validating it, reporting every issue in one pass
//! - Generating Rust or Go dispatch code from a validated model

pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod state_machine;

pub use config::Config;
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level. Logs go to stderr so
/// generated code on stdout stays clean.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
