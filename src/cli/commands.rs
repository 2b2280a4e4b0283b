//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use anyhow::Context;
use crate::error::Error;
use crate::parser::parse_definition;
use crate::state_machine::Model;
use crate::{Config, Result, cli::Cli};
use std::path::Path;

/// Read, parse and build a definition. A definition with construction errors
/// is reported and refused.
async fn load_model(path: &Path) -> Result<Model> {
    tracing::info!("Loading definition {:?}", path);
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read definition {:?}", path))?;

    let definition = parse_definition(path, &contents)?;
    let built = definition.build()?;

    if !built.is_clean() {
        for err in &built.errors {
            eprintln!("error: {}", err);
        }
        return Err(Error::Definition {
            file: path.to_path_buf(),
            count: built.errors.len(),
        });
    }

    tracing::debug!(
        states = built.model.states().len(),
        events = built.model.events().len(),
        transitions = built.model.transitions().len(),
        "Built model {}",
        built.model.name()
    );
    Ok(built.model)
}

/// Validate command implementation
pub mod validate {
    use super::*;
    use crate::cli::output::{report_json, report_text};
    use crate::cli::{Commands, ReportFormat};

    /// Execute the validate command
    pub async fn execute(args: Cli, config: Config) -> Result<()> {
        let (definition, output) = match args.command {
            Commands::Validate { definition, output } => (definition, output),
            _ => unreachable!("validate::execute called with wrong command"),
        };

        let model = load_model(&definition).await?;
        let report = model.validate();

        match ReportFormat::resolve(output, &config) {
            ReportFormat::Json => report_json(&mut std::io::stdout(), &report)?,
            ReportFormat::Text => report_text(&mut std::io::stdout(), &report)?,
        }

        report.into_result()?;
        Ok(())
    }
}

/// Generate command implementation
pub mod generate {
    use super::*;
    use crate::cli::Commands;
    use crate::cli::output::report_text;
    use crate::codegen::{GenerateOptions, Generator};
    use std::io::Write;

    /// Execute the generate command
    pub async fn execute(args: Cli, config: Config) -> Result<()> {
        let (definition, target, out, package, concurrency_safe) = match args.command {
            Commands::Generate {
                definition,
                target,
                out,
                package,
                concurrency_safe,
            } => (definition, target, out, package, concurrency_safe),
            _ => unreachable!("generate::execute called with wrong command"),
        };

        let model = load_model(&definition).await?;

        let report = model.validate();
        if !report.is_valid() {
            report_text(&mut std::io::stderr(), &report)?;
            return report.into_result().map(|_| ());
        }
        for warning in report.warnings() {
            tracing::warn!("{}", warning);
        }

        let options = merge_options(config.generate_options(), target, package, concurrency_safe);
        tracing::info!(
            "Generating {} code for {}",
            options.target,
            model.name()
        );

        let generator = Generator::new(options);
        let code = generator.generate(Some(&model))?;

        match out {
            Some(path) => {
                tokio::fs::write(&path, &code).await?;
                tracing::info!("Wrote {} bytes to {:?}", code.len(), path);
            }
            None => {
                let mut stdout = std::io::stdout();
                stdout.write_all(&code)?;
                stdout.flush()?;
            }
        }

        Ok(())
    }

    /// Command-line flags win over the `[generator]` config section
    pub(crate) fn merge_options(
        mut options: GenerateOptions,
        target: Option<crate::codegen::Target>,
        package: Option<String>,
        concurrency_safe: bool,
    ) -> GenerateOptions {
        if let Some(target) = target {
            options.target = target;
        }
        if package.is_some() {
            options.package = package;
        }
        options.concurrency_safe |= concurrency_safe;
        options
    }
}

/// Inspect command implementation
pub mod inspect {
    use super::*;
    use crate::cli::output::{inspection_json, inspection_text};
    use crate::cli::{Commands, InspectFormat};
    use crate::state_machine::StateGraph;
    use crate::state_machine::analyzer::detect_pattern;

    /// Execute the inspect command
    pub async fn execute(args: Cli) -> Result<()> {
        let (definition, output) = match args.command {
            Commands::Inspect { definition, output } => (definition, output),
            _ => unreachable!("inspect::execute called with wrong command"),
        };

        let model = load_model(&definition).await?;

        tracing::info!("Building state graph...");
        let graph = StateGraph::build(&model);
        let analysis = detect_pattern(&graph);

        match output {
            InspectFormat::Json => inspection_json(&mut std::io::stdout(), &graph, &analysis)?,
            InspectFormat::Text => inspection_text(&mut std::io::stdout(), &graph, &analysis)?,
            InspectFormat::Dot => println!("{}", graph.to_dot()),
        }

        Ok(())
    }
}
