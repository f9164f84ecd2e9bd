//! Output formatting - report rendering for the terminal

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;
use crate::core::{MeasurementReport, Verdict};

/// Render a report in the requested format to stdout.
pub fn render_report(report: &MeasurementReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(report).into_diagnostic()?);
        }
        OutputFormat::Table => render_tables(report),
    }
    Ok(())
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "CHECK")]
    name: String,
    #[tabled(rename = "VALUE [um]")]
    value: String,
    #[tabled(rename = "VERDICT")]
    verdict: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "FEATURE")]
    feature: String,
    #[tabled(rename = "VALUE [um]")]
    value: String,
}

#[derive(Tabled)]
struct DeviationRow {
    #[tabled(rename = "FEATURE")]
    feature: String,
    #[tabled(rename = "DX [um]")]
    dx: String,
    #[tabled(rename = "DY [um]")]
    dy: String,
}

fn styled_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Pass => style(verdict.to_string()).green().to_string(),
        Verdict::PassWithWarning => style(verdict.to_string()).yellow().to_string(),
        Verdict::Fail => style(verdict.to_string()).red().bold().to_string(),
        Verdict::NotApplicable => style(verdict.to_string()).dim().to_string(),
    }
}

fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    if rows.is_empty() {
        return;
    }
    println!("\n{}", style(title).bold());
    println!("{}", Table::new(rows).with(Style::psql()));
}

fn render_tables(report: &MeasurementReport) {
    let info = &report.info;
    println!(
        "{} {}  type {}  measured {}",
        style("Module").bold(),
        info.module_ref,
        info.module_type,
        info.measured_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    if let Some(operator) = &info.operator {
        println!("Operator: {operator}");
    }
    if let Some(run) = &info.run_number {
        println!("Run: {run}");
    }

    if let Some(bow) = &report.metrics.bow {
        println!(
            "\nBow: {} um ({})",
            style(format!("{:.2}", bow.bow_um)).bold(),
            bow.concavity
        );
    }

    let deviations: Vec<DeviationRow> = report
        .metrics
        .positions
        .hybrid
        .iter()
        .chain(
            report
                .metrics
                .positions
                .powerboard
                .iter()
                .flat_map(|m| m.iter()),
        )
        .map(|(name, d)| DeviationRow {
            feature: name.to_string(),
            dx: format!("{:.2}", d.dx_um),
            dy: format!("{:.2}", d.dy_um),
        })
        .collect();
    print_table("Position deviations", deviations);

    let glue: Vec<MetricRow> = report
        .metrics
        .glue
        .hybrid
        .iter()
        .chain(report.metrics.glue.powerboard.iter().flat_map(|m| m.iter()))
        .map(|(name, value)| MetricRow {
            feature: name.to_string(),
            value: format!("{value:.2}"),
        })
        .collect();
    print_table("Glue thickness", glue);

    let caps: Vec<MetricRow> = report
        .metrics
        .capacitor_heights
        .iter()
        .flat_map(|m| m.iter())
        .map(|(name, value)| MetricRow {
            feature: name.to_string(),
            value: format!("{value:.2}"),
        })
        .collect();
    print_table("Capacitor heights", caps);

    if let Some(height) = report.metrics.shield_height_um {
        println!("\nShield height: {height:.2} um");
    }

    let checks: Vec<CheckRow> = report
        .qa
        .checks
        .iter()
        .map(|c| CheckRow {
            name: c.name.clone(),
            value: c.value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string()),
            verdict: styled_verdict(c.verdict),
        })
        .collect();
    print_table("QA checks", checks);

    println!("\n{}", report.qa.summary);
    println!(
        "\nResult: {}",
        if report.qa.passed {
            style("PASSED").green().bold().to_string()
        } else {
            style("FAILED").red().bold().to_string()
        }
    );
}
