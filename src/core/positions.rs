//! Reference position tables - expected (x, y) design positions per module type
//!
//! Each module type ships a `<TYPE>_positions.csv` file (header row, then
//! `name,x,y` rows in millimeters) produced by the design office. The table
//! is loaded once per module type and read-only afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::classify::classify;
use crate::core::cloud::FeatureName;

#[derive(Debug, Error)]
pub enum PositionTableError {
    #[error("failed to read position file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse position file: {0}")]
    Csv(#[from] csv::Error),

    #[error("position row {row}: expected 3 fields (name, x, y), found {found}")]
    MalformedRow { row: usize, found: usize },

    #[error("position row {row}: coordinate '{value}' is not numeric")]
    NonNumericCoordinate { row: usize, value: String },
}

/// Expected (x, y) design position of a feature, millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedPosition {
    pub x: f64,
    pub y: f64,
}

/// Expected design positions keyed by canonical feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencePositionTable {
    positions: BTreeMap<FeatureName, ExpectedPosition>,
}

impl ReferencePositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventional file path for a module type under a positions directory.
    pub fn path_for(dir: &Path, module_type: &str) -> PathBuf {
        dir.join(format!("{module_type}_positions.csv"))
    }

    /// Load the table for a module type from its positions directory.
    pub fn load(dir: &Path, module_type: &str) -> Result<Self, PositionTableError> {
        Self::from_csv_path(&Self::path_for(dir, module_type))
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, PositionTableError> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Parse `name,x,y` rows; the first row is a header and is skipped.
    /// Names are classified so they line up with cloud keys regardless of
    /// the casing the design office used.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, PositionTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = ReferencePositionTable::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            // Header is row 0; data rows report 1-based positions after it.
            let row = idx + 1;
            if record.len() < 3 {
                return Err(PositionTableError::MalformedRow {
                    row,
                    found: record.len(),
                });
            }
            let x = parse_coord(&record[1], row)?;
            let y = parse_coord(&record[2], row)?;
            table.insert(classify(&record[0]), ExpectedPosition { x, y });
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: FeatureName, expected: ExpectedPosition) {
        self.positions.insert(name, expected);
    }

    pub fn get(&self, name: &FeatureName) -> Option<ExpectedPosition> {
        self.positions.get(name).copied()
    }

    /// Entries in natural ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureName, ExpectedPosition)> {
        self.positions.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn parse_coord(field: &str, row: usize) -> Result<f64, PositionTableError> {
    field
        .parse::<f64>()
        .map_err(|_| PositionTableError::NonNumericCoordinate {
            row,
            value: field.to_string(),
        })
}
