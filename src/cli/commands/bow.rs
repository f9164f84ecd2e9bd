//! `mmt bow` command - sensor bow analysis of a raw CMM export

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result, WrapErr};

use crate::cli::output::render_report;
use crate::cli::OutputFormat;
use crate::core::{analyze_bow, EngineConfig, RecordLayout, SessionInfo};

#[derive(clap::Args, Debug)]
pub struct BowArgs {
    /// Raw CMM data file
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Module serial / reference number
    #[arg(long, short = 'm')]
    pub module_ref: String,

    /// Module type recorded in the report
    #[arg(long, short = 't')]
    pub module_type: String,

    /// Engine config YAML; defaults apply when omitted
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Record layout of the raw export
    #[arg(long, default_value = "four-column")]
    pub layout: RecordLayout,

    /// Operator name recorded in the report
    #[arg(long)]
    pub operator: Option<String>,

    /// Run number recorded in the report
    #[arg(long)]
    pub run_number: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

pub fn run(args: BowArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read data file {}", args.file.display()))?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("cannot load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let info = SessionInfo {
        operator: args.operator.clone(),
        run_number: args.run_number.clone(),
        ..SessionInfo::new(&args.module_ref, &args.module_type)
    };

    let report = analyze_bow(info, content.lines(), args.layout, &config)
        .into_diagnostic()
        .wrap_err("bow analysis failed")?;

    render_report(&report, args.format)
}
