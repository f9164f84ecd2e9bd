//! Feature name classification - canonical identities and metric categories
//!
//! Raw probe-point labels arrive from the CMM program with repeated-probe
//! suffixes and inconsistent casing. `classify` resolves a raw label to its
//! canonical `FeatureName`; `categorize` routes a label to the metric family
//! it feeds. Both are pure functions of the label string.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::cloud::FeatureName;

/// Metric family a probe label belongs to.
///
/// At most one category applies in practice; when a label matches more than
/// one pattern the table below wins on first match, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Glue gap under hybrid row 0
    HybridRow0Glue,
    /// Glue gap under hybrid row 1
    HybridRow1Glue,
    /// Glue gap under the powerboard
    PowerboardGlue,
    /// Capacitor height point
    Capacitor,
    /// Shield box point
    Shield,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::HybridRow0Glue => write!(f, "hybrid_row0_glue"),
            Category::HybridRow1Glue => write!(f, "hybrid_row1_glue"),
            Category::PowerboardGlue => write!(f, "powerboard_glue"),
            Category::Capacitor => write!(f, "capacitor"),
            Category::Shield => write!(f, "shield"),
        }
    }
}

/// Ordered category rule table. First match wins; the order is part of the
/// contract, not an accident of iteration.
const CATEGORY_RULES: &[(Category, &str)] = &[
    (Category::HybridRow0Glue, r"_R[0-5]H0_[0-9]+"),
    (Category::HybridRow1Glue, r"_R[0-5]H1_[0-9]+"),
    (Category::PowerboardGlue, r"PB_[0-5]"),
    (Category::Capacitor, r"C[1-8]"),
    (Category::Shield, r"(?i)shield"),
];

/// Labels matching this refine hybrid glue metrics to the chip footprint.
const CHIP_REGION_PATTERN: &str = "ABC";

/// Powerboard positions 0-4 form the "modified" glue aggregate.
const MODIFIED_PB_PATTERN: &str = r"PB_[0-4]";

fn compiled_rules() -> &'static Vec<(Category, Regex)> {
    static RULES: OnceLock<Vec<(Category, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        CATEGORY_RULES
            .iter()
            .map(|(cat, pat)| {
                // Patterns are compile-time constants; a bad one is a
                // programming error, not an input error.
                (*cat, Regex::new(pat).unwrap())
            })
            .collect()
    })
}

fn modified_pb_rule() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| Regex::new(MODIFIED_PB_PATTERN).unwrap())
}

/// Capitalize in the probe-program sense: first character uppercase, the
/// rest lowercase.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Resolve a raw probe-point label to its canonical feature name.
///
/// Deterministic and idempotent: classifying an already-canonical name
/// returns it unchanged. Rules, in order:
/// 1. uppercase, then strip one trailing `_<letter>` repeated-probe marker
/// 2. labels mentioning the sensor or shield get capitalized casing
/// 3. any sensor sub-point collapses to the single `Sensor` group
///
/// Unrecognized labels are kept as-is (uppercased); they simply never feed a
/// category-specific metric.
pub fn classify(raw_label: &str) -> FeatureName {
    let mut name = raw_label.trim().to_uppercase();

    if is_repeat_marker(&name) {
        name.truncate(name.len() - 2);
    }

    if name.contains("SENSOR") || name.contains("SHIELD") {
        name = capitalize(&name);
    }
    if name.contains("Sensor") {
        name = "Sensor".to_string();
    }

    FeatureName::new(name)
}

/// A trailing `_<single uppercase letter>` marks a repeated probe of the
/// same feature, not a distinct identity.
fn is_repeat_marker(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2
        && bytes[bytes.len() - 2] == b'_'
        && bytes[bytes.len() - 1].is_ascii_uppercase()
}

/// Route a label to its metric category, if any.
///
/// Matching runs against the raw label via the ordered rule table; labels
/// matching nothing return `None` and are excluded from category metrics.
pub fn categorize(raw_label: &str) -> Option<Category> {
    compiled_rules()
        .iter()
        .find(|(_, re)| re.is_match(raw_label))
        .map(|(cat, _)| *cat)
}

/// Whether a hybrid glue label sits in the chip footprint sub-bucket.
pub fn is_chip_region(name: &FeatureName) -> bool {
    name.as_str().contains(CHIP_REGION_PATTERN)
}

/// Whether a powerboard glue label belongs to the modified (positions 0-4)
/// aggregate used by the average-based tolerance check.
pub fn is_modified_powerboard(name: &FeatureName) -> bool {
    modified_pb_rule().is_match(name.as_str())
}
