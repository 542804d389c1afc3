//! # Rubric Record
//!
//! The composed scoring record of one submission: the keyed category map, the
//! total score, the overall verdict and notes.
//!
//! Older stored records also carry singular `passoffTests` / `unitTests` /
//! `quality` slots next to (or instead of) the keyed map. Those slots are read
//! through [`RubricRecord`] and folded into the map; they are never written.
//! [`Rubric::legacy_view`] exposes the same three categories for readers that
//! still expect the old shape.
//!
//! ## JSON Output Example
//!
//! ```json
//! {
//!   "version": 2,
//!   "items": {
//!     "PASSOFF_TESTS": { "category": "...", "criteria": "...", "results": { ... } },
//!     "UNIT_TESTS": { ... },
//!     "QUALITY": { ... },
//!     "GIT_COMMITS": { ... }
//!   },
//!   "score": 65.0,
//!   "passed": true,
//!   "notes": ""
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use util::rubric_type::RubricType;

use crate::error::GraderError;
use crate::types::RubricItem;

/// Version written by this crate.
pub const RUBRIC_RECORD_VERSION: u32 = 2;

/// Category map of a rubric, ordered by category.
pub type RubricItems = BTreeMap<RubricType, RubricItem>;

/// Canonical in-memory rubric. Only produced by composition or by reading a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RubricRecord")]
pub struct Rubric {
    version: u32,
    items: RubricItems,
    score: f64,
    passed: bool,
    notes: String,
}

impl Rubric {
    pub(crate) fn new(items: RubricItems, score: f64, passed: bool, notes: String) -> Self {
        Self {
            version: RUBRIC_RECORD_VERSION,
            items,
            score,
            passed,
            notes,
        }
    }

    pub fn items(&self) -> &RubricItems {
        &self.items
    }

    pub fn item(&self, rubric_type: RubricType) -> Option<&RubricItem> {
        self.items.get(&rubric_type)
    }

    /// Sum of the category scores.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Read-only view in the shape of pre-map records.
    pub fn legacy_view(&self) -> LegacyRubricView<'_> {
        LegacyRubricView {
            passoff_tests: self.item(RubricType::PassoffTests),
            unit_tests: self.item(RubricType::UnitTests),
            quality: self.item(RubricType::Quality),
        }
    }
}

/// The three singular slots of pre-map rubric records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyRubricView<'a> {
    pub passoff_tests: Option<&'a RubricItem>,
    pub unit_tests: Option<&'a RubricItem>,
    pub quality: Option<&'a RubricItem>,
}

/// Any stored rubric shape. Deserialization target only.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricRecord {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    items: Option<BTreeMap<String, Option<RubricItem>>>,
    #[serde(default)]
    passoff_tests: Option<RubricItem>,
    #[serde(default)]
    unit_tests: Option<RubricItem>,
    #[serde(default)]
    quality: Option<RubricItem>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    notes: String,
}

impl TryFrom<RubricRecord> for Rubric {
    type Error = GraderError;

    fn try_from(record: RubricRecord) -> Result<Self, Self::Error> {
        if let Some(version) = record.version {
            if version > RUBRIC_RECORD_VERSION {
                return Err(GraderError::Validation(format!(
                    "unsupported rubric record version {version}"
                )));
            }
        }

        let mut items = RubricItems::new();
        for (key, item) in record.items.unwrap_or_default() {
            let rubric_type: RubricType = key.parse().map_err(GraderError::Validation)?;
            if let Some(item) = item {
                items.insert(rubric_type, item);
            }
        }

        let legacy = [
            (RubricType::PassoffTests, record.passoff_tests),
            (RubricType::UnitTests, record.unit_tests),
            (RubricType::Quality, record.quality),
        ];
        for (rubric_type, item) in legacy {
            let Some(item) = item else { continue };
            if items.contains_key(&rubric_type) {
                continue;
            }
            tracing::warn!(category = %rubric_type, "Migrating legacy rubric slot into keyed map");
            items.insert(rubric_type, item);
        }

        let score = record
            .score
            .unwrap_or_else(|| items.values().map(|i| i.results.score).sum());

        Ok(Rubric::new(items, score, record.passed, record.notes))
    }
}
