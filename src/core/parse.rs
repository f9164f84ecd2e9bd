//! CMM record parsing - raw text records to a classified point cloud
//!
//! The surrounding shell owns all file I/O and hands the parser
//! already-materialized text records. Parsing is all-or-nothing: the first
//! malformed record aborts the whole parse and no partial cloud escapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::classify::classify;
use crate::core::cloud::{Point3D, PointCloud};

/// Record shape of the raw export, fixed per data source and declared by the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum RecordLayout {
    /// `name x y z`
    #[default]
    FourColumn,
    /// `name measure_type x y z` - a type/category column precedes geometry
    FiveColumn,
}

impl RecordLayout {
    pub fn field_count(&self) -> usize {
        match self {
            RecordLayout::FourColumn => 4,
            RecordLayout::FiveColumn => 5,
        }
    }

    /// Index of the X field; Y and Z follow in fixed order.
    fn first_axis_field(&self) -> usize {
        match self {
            RecordLayout::FourColumn => 1,
            RecordLayout::FiveColumn => 2,
        }
    }
}

impl std::fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordLayout::FourColumn => write!(f, "four-column"),
            RecordLayout::FiveColumn => write!(f, "five-column"),
        }
    }
}

impl std::str::FromStr for RecordLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "4" | "four" | "four-column" | "fourcolumn" => Ok(RecordLayout::FourColumn),
            "5" | "five" | "five-column" | "fivecolumn" => Ok(RecordLayout::FiveColumn),
            _ => Err(format!(
                "Invalid record layout: '{}'. Use 'four-column' or 'five-column'",
                s
            )),
        }
    }
}

/// Structural parse failures. Any of these aborts the whole file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("record {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("record {line}: coordinate '{value}' is not numeric")]
    NonNumericCoordinate { line: usize, value: String },
}

/// Parse raw CMM records into a classified point cloud.
///
/// Each record carries one physical point; axis values are consumed in fixed
/// X, Y, Z order and the Y coordinate is negated to align the probe-software
/// sign convention with the engine's working frame. Completed points are
/// classified and stored under their canonical feature name.
///
/// Blank records and `#`-prefixed comment records are skipped. Fields split
/// on whitespace or commas, so both the probe software's CSV export and
/// whitespace-delimited records parse with the same code path.
pub fn parse<'a, I>(records: I, layout: RecordLayout) -> Result<PointCloud, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cloud = PointCloud::new();

    for (idx, record) in records.into_iter().enumerate() {
        let line = idx + 1;
        let record = record.trim();
        if record.is_empty() || record.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = record
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        if fields.len() != layout.field_count() {
            return Err(ParseError::MalformedRecord {
                line,
                expected: layout.field_count(),
                found: fields.len(),
            });
        }

        let first = layout.first_axis_field();
        let x = parse_coordinate(fields[first], line)?;
        let y = -parse_coordinate(fields[first + 1], line)?;
        let z = parse_coordinate(fields[first + 2], line)?;

        cloud.push(classify(fields[0]), Point3D::new(x, y, z));
    }

    Ok(cloud)
}

fn parse_coordinate(field: &str, line: usize) -> Result<f64, ParseError> {
    field
        .parse::<f64>()
        .map_err(|_| ParseError::NonNumericCoordinate {
            line,
            value: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloud::FeatureName;

    // ===== Layout Tests =====

    #[test]
    fn test_four_column_record() {
        let cloud = parse(["SENSOR_1 10.0 5.0 0.25"], RecordLayout::FourColumn).unwrap();
        let pts = cloud.points(&FeatureName::sensor()).unwrap();
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].x, 10.0);
        assert_eq!(pts[0].y, -5.0); // Y flips on ingestion
        assert_eq!(pts[0].z, 0.25);
    }

    #[test]
    fn test_five_column_record_skips_type_field() {
        let cloud = parse(
            ["PB_2 point 1.5 2.5 0.330"],
            RecordLayout::FiveColumn,
        )
        .unwrap();
        let pts = cloud.points(&FeatureName::from("PB_2")).unwrap();
        assert_eq!(pts[0].x, 1.5);
        assert_eq!(pts[0].y, -2.5);
        assert_eq!(pts[0].z, 0.330);
    }

    #[test]
    fn test_comma_delimited_records() {
        let cloud = parse(["C1,40.0,12.0,1.1"], RecordLayout::FourColumn).unwrap();
        assert!(cloud.contains(&FeatureName::from("C1")));
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let cloud = parse(
            ["#---Header", "", "SENSOR_1 0.0 0.0 0.0"],
            RecordLayout::FourColumn,
        )
        .unwrap();
        assert_eq!(cloud.point_count(), 1);
    }

    // ===== Grouping Tests =====

    #[test]
    fn test_repeated_probes_group_under_one_feature() {
        let cloud = parse(
            ["PB_2_A 1.0 1.0 0.3", "PB_2_B 1.1 1.0 0.31"],
            RecordLayout::FourColumn,
        )
        .unwrap();
        assert_eq!(cloud.feature_count(), 1);
        assert_eq!(cloud.points(&FeatureName::from("PB_2")).unwrap().len(), 2);
    }

    #[test]
    fn test_sensor_subpoints_collapse() {
        let cloud = parse(
            ["SENSOR_1 0.0 0.0 0.0", "SENSOR_2 1.0 0.0 0.0"],
            RecordLayout::FourColumn,
        )
        .unwrap();
        assert_eq!(cloud.feature_count(), 1);
        assert_eq!(cloud.points(&FeatureName::sensor()).unwrap().len(), 2);
    }

    // ===== Error Tests =====

    #[test]
    fn test_wrong_field_count_is_malformed() {
        let err = parse(["SENSOR_1 1.0 2.0"], RecordLayout::FourColumn).unwrap_err();
        match err {
            ParseError::MalformedRecord {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 1);
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let err = parse(["SENSOR_1 1.0 oops 2.0"], RecordLayout::FourColumn).unwrap_err();
        assert!(matches!(err, ParseError::NonNumericCoordinate { line: 1, .. }));
    }

    #[test]
    fn test_bad_record_aborts_whole_parse() {
        // A good record before the bad one must not leak out.
        let result = parse(
            ["SENSOR_1 0.0 0.0 0.0", "PB_2 1.0"],
            RecordLayout::FourColumn,
        );
        assert!(result.is_err());
    }
}
