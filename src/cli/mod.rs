//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::codegen::Target;
use crate::{Config, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// State machine definition compiler
#[derive(Parser, Debug)]
#[command(name = "fsmgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "FSMGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a definition and report every issue
    Validate {
        /// Path to definition file (.toml or .json)
        definition: PathBuf,

        /// Report format (overrides config)
        #[arg(short, long, value_enum)]
        output: Option<ReportFormat>,
    },

    /// Generate dispatch code from a valid definition
    Generate {
        /// Path to definition file (.toml or .json)
        definition: PathBuf,

        /// Target language (overrides config)
        #[arg(short, long, value_enum)]
        target: Option<Target>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Package name for generated Go code
        #[arg(long)]
        package: Option<String>,

        /// Guard the generated machine with a read/write lock
        #[arg(long)]
        concurrency_safe: bool,
    },

    /// Print graph facts about a definition
    Inspect {
        /// Path to definition file (.toml or .json)
        definition: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: InspectFormat,
    },
}

/// Validation report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

impl ReportFormat {
    /// Resolve the format: explicit flag, then `[output] format`, then text
    pub fn resolve(flag: Option<ReportFormat>, config: &Config) -> Self {
        flag.or_else(|| ReportFormat::from_str(&config.output.format, true).ok())
            .unwrap_or(ReportFormat::Text)
    }
}

/// Inspection output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
    /// DOT format (Graphviz)
    Dot,
}

/// Execute the CLI command
pub async fn execute(args: Cli, config: Config) -> Result<()> {
    match args.command {
        Commands::Validate { .. } => commands::validate::execute(args, config).await,
        Commands::Generate { .. } => commands::generate::execute(args, config).await,
        Commands::Inspect { .. } => commands::inspect::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["fsmgen", "validate", "order.toml", "--output", "json"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from([
            "fsmgen",
            "generate",
            "order.toml",
            "--target",
            "go",
            "--package",
            "orders",
            "--concurrency-safe",
            "--out",
            "order_fsm.go",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                target,
                package,
                concurrency_safe,
                out,
                ..
            } => {
                assert_eq!(target, Some(Target::Go));
                assert_eq!(package.as_deref(), Some("orders"));
                assert!(concurrency_safe);
                assert_eq!(out, Some(PathBuf::from("order_fsm.go")));
            }
            other => panic!("expected generate, got {:?}", other),
        }

        assert!(
            Cli::try_parse_from(["fsmgen", "generate", "order.toml", "--target", "cobol"]).is_err()
        );
        assert!(Cli::try_parse_from(["fsmgen", "inspect"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["fsmgen", "inspect", "order.toml", "--config", "fsmgen.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fsmgen.toml")));
    }

    #[test]
    fn test_report_format_resolution() {
        let mut config = Config::default();
        assert_eq!(ReportFormat::resolve(None, &config), ReportFormat::Text);

        config.output.format = "json".to_string();
        assert_eq!(ReportFormat::resolve(None, &config), ReportFormat::Json);
        assert_eq!(
            ReportFormat::resolve(Some(ReportFormat::Text), &config),
            ReportFormat::Text
        );

        config.output.format = "yaml".to_string();
        assert_eq!(ReportFormat::resolve(None, &config), ReportFormat::Text);
    }
}
