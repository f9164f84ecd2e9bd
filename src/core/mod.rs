//! Core module - the metrology processing and QA evaluation engine

pub mod classify;
pub mod cloud;
pub mod config;
pub mod metrics;
pub mod parse;
pub mod positions;
pub mod session;
pub mod tilt;
pub mod tolerance;

pub use classify::{categorize, classify, Category};
pub use cloud::{FeatureName, Point3D, PointCloud};
pub use config::{BowBand, ConfigError, EngineConfig, FlexThickness, GlueBand, ToleranceLimits};
pub use metrics::{
    compute_bow, compute_capacitor_heights, compute_glue_thickness, compute_metrics,
    compute_position_deviations, compute_shield_height, truncate2, BowResult, Concavity,
    DerivedMetrics, GlueMetrics, MetricError, PositionDeviation, PositionDeviations,
};
pub use parse::{parse, ParseError, RecordLayout};
pub use positions::{ExpectedPosition, PositionTableError, ReferencePositionTable};
pub use session::{
    analyze_bow, analyze_metrology, CorrectedSession, EngineError, MeasurementReport,
    MeasurementSession, SessionInfo,
};
pub use tilt::{apply_correction, DegenerateGeometryError, PlaneFit};
pub use tolerance::{evaluate, Check, QaReport, Verdict};
