//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{bow::BowArgs, metrology::MetrologyArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mmt",
    about = "Module Metrology Toolkit - CMM point-cloud processing and QA evaluation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a metrology file: positions, glue thickness, heights
    Metrology(MetrologyArgs),

    /// Process a bow file: sensor deformation only
    Bow(BowArgs),
}

/// Output rendering for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    Json,
    Yaml,
}
