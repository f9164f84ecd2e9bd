//! MMT: Module Metrology Toolkit
//!
//! Processes raw CMM point clouds probed on assembled modules: tilt
//! correction against the sensor reference surface, feature classification,
//! derived quality metrics, and tolerance evaluation.

pub mod cli;
pub mod core;
