//! Shared test helpers for integration tests

#![allow(dead_code)]

use std::path::Path;

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Helper to get an mmt command
pub fn mmt() -> Command {
    Command::new(cargo::cargo_bin!("mmt"))
}

/// A raw metrology export for an M0-style module: sensor reference grid,
/// glue points on both hybrid rows and the powerboard, capacitors, shield.
pub const METROLOGY_DATA: &str = "\
# raw CMM export
SENSOR_1 0.0 0.0 0.0
SENSOR_2 96.0 0.0 0.0
SENSOR_3 0.0 -96.0 0.0
SENSOR_4 96.0 -96.0 0.0
SENSOR_5 48.0 -48.0 0.0
ABC_R0H0_1 10.0 -10.0 0.330
ABC_R0H0_2 20.0 -10.0 0.335
ABC_R0H1_1 10.0 -30.0 0.325
HCC_R0H0_3 30.0 -10.0 0.340
PB_0 60.0 -40.0 0.350
PB_1 70.0 -40.0 0.345
PB_5 80.0 -40.0 0.355
C1 15.0 -60.0 1.5
C2 25.0 -60.0 1.6
SHIELD 50.0 -50.0 5.8
";

/// A raw bow export: flat-ish sensor with a slightly raised center.
pub const BOW_DATA: &str = "\
SENSOR_1 0.0 0.0 0.002
SENSOR_2 96.0 0.0 0.001
SENSOR_3 0.0 -96.0 0.0
SENSOR_4 96.0 -96.0 0.001
SENSOR_5 48.0 -48.0 0.021
";

/// Position table matching `METROLOGY_DATA` (working-frame coordinates).
pub const M0_POSITIONS: &str = "\
name,x,y
ABC_R0H0_1,10.0,10.05
PB_0,60.05,40.0
";

/// Set up a temp workspace with a data file and a positions directory.
/// Returns the temp dir; data lands at `data.csv`, tables under `positions/`.
pub fn setup_workspace(data: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("data.csv"), data).unwrap();
    let positions = tmp.path().join("positions");
    std::fs::create_dir(&positions).unwrap();
    std::fs::write(positions.join("M0_positions.csv"), M0_POSITIONS).unwrap();
    tmp
}

pub fn data_path(tmp: &TempDir) -> std::path::PathBuf {
    tmp.path().join("data.csv")
}

pub fn positions_path(tmp: &TempDir) -> std::path::PathBuf {
    tmp.path().join("positions")
}

/// Write an engine config override into the workspace.
pub fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}
