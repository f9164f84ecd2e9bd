//! Tolerance evaluation - per-check verdicts and the aggregate pass/fail
//!
//! Stateless: one call evaluates one complete metric set. Tolerance breaches
//! are verdicts, never errors; structural failures happen upstream.
//!
//! The aggregate boolean uses the hard ranges only: a glue average in the
//! warning band reads as a problem in the summary but still counts as a pass
//! in aggregation.

use serde::{Deserialize, Serialize};

use crate::core::config::ToleranceLimits;
use crate::core::metrics::{DerivedMetrics, PositionDeviation};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    PassWithWarning,
    Fail,
    /// The metric's component group is absent from this variant
    NotApplicable,
}

impl Verdict {
    /// Whether this verdict counts as true in the aggregate AND.
    pub fn as_bool(&self) -> bool {
        !matches!(self, Verdict::Fail)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::PassWithWarning => write!(f, "PASS (warning)"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// One evaluated check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Stable check identifier (e.g. `position_x`, `hybrid0_glue`)
    pub name: String,

    /// The evaluated value, absent for vacuous checks
    pub value: Option<f64>,

    pub verdict: Verdict,
}

impl Check {
    fn new(name: &str, value: Option<f64>, verdict: Verdict) -> Self {
        Check {
            name: name.to_string(),
            value,
            verdict,
        }
    }
}

/// Complete QA outcome for one measurement session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub checks: Vec<Check>,

    /// AND of every per-check boolean (warnings count as true)
    pub passed: bool,

    /// Human-readable list of failing and warning checks
    pub summary: String,
}

impl QaReport {
    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Evaluate a metric set against the configured tolerance bands.
pub fn evaluate(metrics: &DerivedMetrics, limits: &ToleranceLimits) -> QaReport {
    let mut checks = Vec::new();
    let mut problems = Vec::new();

    // Positional checks: both assemblies pooled, each axis on its own.
    let deviations: Vec<&PositionDeviation> = metrics
        .positions
        .hybrid
        .values()
        .chain(metrics.positions.powerboard.iter().flat_map(|m| m.values()))
        .collect();

    checks.push(axis_check(
        "position_x",
        deviations.iter().map(|d| d.dx_um),
        limits.x_limit_um,
    ));
    checks.push(axis_check(
        "position_y",
        deviations.iter().map(|d| d.dy_um),
        limits.y_limit_um,
    ));
    if checks.iter().rev().take(2).any(|c| c.verdict == Verdict::Fail) {
        problems.push("Failure - Position exceeds tolerance in one or more dimensions.".to_string());
    }

    // Glue checks run on the average of each group's designated bucket.
    for (name, label, bucket) in [
        ("hybrid0_glue", "Hybrid0", &metrics.glue.abc_row0),
        ("hybrid1_glue", "Hybrid1", &metrics.glue.abc_row1),
        (
            "powerboard_glue",
            "Powerboard",
            &metrics.glue.powerboard_modified,
        ),
    ] {
        let check = glue_check(name, bucket.values().copied(), limits);
        match check.verdict {
            Verdict::PassWithWarning => {
                problems.push(format!("{label} glue thickness passes with problems."));
            }
            Verdict::Fail => {
                problems.push(format!("Failure - {label} glue thickness exceeds tolerance."));
            }
            _ => {}
        }
        checks.push(check);
    }

    // Shield height: upper bound only; vacuous without shield data.
    let shield = match metrics.shield_height_um {
        Some(height) if height < limits.max_shield_height_um => {
            Check::new("shield_height", Some(height), Verdict::Pass)
        }
        Some(height) => {
            problems.push("Failure - Shield is too high.".to_string());
            Check::new("shield_height", Some(height), Verdict::Fail)
        }
        None => Check::new("shield_height", None, Verdict::NotApplicable),
    };
    checks.push(shield);

    // Bow: only evaluated when the bow flow supplied a metric.
    if let Some(bow) = metrics.bow {
        let band = limits.bow_band;
        let verdict = if band.min < bow.bow_um && bow.bow_um < band.max {
            Verdict::Pass
        } else {
            problems.push("Failure - Bow exceeds tolerance.".to_string());
            Verdict::Fail
        };
        checks.push(Check::new("bow", Some(bow.bow_um), verdict));
    }

    let passed = checks.iter().all(|c| c.verdict.as_bool());

    let mut summary = problems;
    summary.push(if passed {
        "All tests passed!".to_string()
    } else {
        "One or more failures.".to_string()
    });

    QaReport {
        checks,
        passed,
        summary: summary.join("\n"),
    }
}

/// Every deviation must sit strictly inside the open interval (-limit, limit).
/// Reports the worst magnitude; vacuous when no positions were measured.
fn axis_check(name: &str, deviations: impl Iterator<Item = f64>, limit_um: f64) -> Check {
    let worst = deviations.map(f64::abs).reduce(f64::max);
    match worst {
        Some(worst) if worst < limit_um => Check::new(name, Some(worst), Verdict::Pass),
        Some(worst) => Check::new(name, Some(worst), Verdict::Fail),
        None => Check::new(name, None, Verdict::NotApplicable),
    }
}

/// Three-tier evaluation of a glue bucket's average.
fn glue_check(name: &str, bucket: impl Iterator<Item = f64>, limits: &ToleranceLimits) -> Check {
    let values: Vec<f64> = bucket.collect();
    if values.is_empty() {
        return Check::new(name, None, Verdict::NotApplicable);
    }
    let average = values.iter().sum::<f64>() / values.len() as f64;
    let band = limits.glue_band;

    let verdict = if average >= band.hard_min && average <= band.soft_max {
        Verdict::Pass
    } else if average > band.soft_max && average <= band.hard_max {
        Verdict::PassWithWarning
    } else {
        Verdict::Fail
    };
    Check::new(name, Some(average), verdict)
}
