//! Measurement session - one file's journey through the pipeline
//!
//! A session is an immutable value threaded functionally through
//! parse -> correct -> compute -> evaluate. Each stage consumes the previous
//! value and returns a new one; nothing is shared or mutated across stages,
//! and nothing survives the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::cloud::PointCloud;
use crate::core::config::EngineConfig;
use crate::core::metrics::{
    compute_bow, compute_metrics, DerivedMetrics, MetricError,
};
use crate::core::parse::{parse, ParseError, RecordLayout};
use crate::core::positions::ReferencePositionTable;
use crate::core::tilt::{apply_correction, DegenerateGeometryError, PlaneFit};
use crate::core::tolerance::{evaluate, QaReport};

/// Any structural failure along the pipeline. Tolerance breaches are not
/// errors; they surface as verdicts in the report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Geometry(#[from] DegenerateGeometryError),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Identity of one measurement run, carried through to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Module serial / reference number
    pub module_ref: String,

    /// Module type identifier (selects the reference position table)
    pub module_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,

    pub measured_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(module_ref: impl Into<String>, module_type: impl Into<String>) -> Self {
        SessionInfo {
            module_ref: module_ref.into(),
            module_type: module_type.into(),
            operator: None,
            run_number: None,
            institute: None,
            instrument: None,
            measured_at: Utc::now(),
        }
    }
}

/// A parsed session: raw cloud, uncorrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSession {
    pub info: SessionInfo,
    pub cloud: PointCloud,
}

impl MeasurementSession {
    /// Parse raw records into a session.
    pub fn ingest<'a, I>(
        info: SessionInfo,
        records: I,
        layout: RecordLayout,
    ) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Ok(MeasurementSession {
            info,
            cloud: parse(records, layout)?,
        })
    }

    /// Fit the reference plane and re-project the cloud onto it.
    pub fn correct(self) -> Result<CorrectedSession, DegenerateGeometryError> {
        let fit = PlaneFit::fit_reference(&self.cloud)?;
        let cloud = apply_correction(&self.cloud, &fit);
        Ok(CorrectedSession {
            info: self.info,
            fit,
            cloud,
        })
    }
}

/// A tilt-corrected session: the reference surface is the z = 0 datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSession {
    pub info: SessionInfo,
    pub fit: PlaneFit,
    pub cloud: PointCloud,
}

impl CorrectedSession {
    /// Full metrology metric set plus QA evaluation.
    pub fn metrology(
        self,
        table: &ReferencePositionTable,
        config: &EngineConfig,
        strict_positions: bool,
    ) -> Result<MeasurementReport, MetricError> {
        let metrics = compute_metrics(&self.cloud, table, &config.flex, strict_positions)?;
        Ok(self.finish(metrics, config))
    }

    /// Bow metric plus QA evaluation.
    pub fn bow(self, config: &EngineConfig) -> Result<MeasurementReport, MetricError> {
        let metrics = DerivedMetrics {
            bow: Some(compute_bow(&self.cloud)?),
            ..Default::default()
        };
        Ok(self.finish(metrics, config))
    }

    fn finish(self, metrics: DerivedMetrics, config: &EngineConfig) -> MeasurementReport {
        let qa = evaluate(&metrics, &config.limits);
        MeasurementReport {
            info: self.info,
            fit: self.fit,
            cloud: self.cloud,
            metrics,
            qa,
        }
    }
}

/// Everything the surrounding layers consume: the corrected cloud for
/// archival, the metric set, and the QA verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub info: SessionInfo,
    pub fit: PlaneFit,
    pub cloud: PointCloud,
    pub metrics: DerivedMetrics,
    pub qa: QaReport,
}

/// Run the whole metrology pipeline over raw records.
pub fn analyze_metrology<'a, I>(
    info: SessionInfo,
    records: I,
    layout: RecordLayout,
    table: &ReferencePositionTable,
    config: &EngineConfig,
    strict_positions: bool,
) -> Result<MeasurementReport, EngineError>
where
    I: IntoIterator<Item = &'a str>,
{
    Ok(MeasurementSession::ingest(info, records, layout)?
        .correct()?
        .metrology(table, config, strict_positions)?)
}

/// Run the bow pipeline over raw records.
pub fn analyze_bow<'a, I>(
    info: SessionInfo,
    records: I,
    layout: RecordLayout,
    config: &EngineConfig,
) -> Result<MeasurementReport, EngineError>
where
    I: IntoIterator<Item = &'a str>,
{
    Ok(MeasurementSession::ingest(info, records, layout)?
        .correct()?
        .bow(config)?)
}
