//! # Scorer Module
//!
//! Composes scored rubric categories into a [`Rubric`].
//!
//! The categories configured for a phase are the required ones. Composition
//! sums their scores into the rubric total and passes the rubric only when every
//! category reaches its configured threshold and none reports a harness error.
//! Composition is a pure function of its inputs: composing the same items twice
//! gives identical rubrics.

use util::grading_config::PhaseRubricConfig;
use util::rubric_type::RubricType;

use crate::error::{GraderError, GraderResult};
use crate::rubric::{Rubric, RubricItems};

/// Composes rubrics against one phase's category configuration.
pub struct RubricComposer<'a> {
    config: &'a PhaseRubricConfig,
}

impl<'a> RubricComposer<'a> {
    pub fn new(config: &'a PhaseRubricConfig) -> Self {
        Self { config }
    }

    /// Builds the rubric from scored categories.
    ///
    /// # Errors
    /// - [`GraderError::Composition`] when a configured category is missing.
    /// - [`GraderError::Validation`] when a category is not configured for the
    ///   phase, its `possiblePoints` is negative or not finite, or its score
    ///   lies outside `[0, possiblePoints]`.
    pub fn compose(&self, items: RubricItems) -> GraderResult<Rubric> {
        let missing: Vec<RubricType> = self
            .config
            .required()
            .filter(|t| !items.contains_key(t))
            .collect();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|t| t.key()).collect();
            return Err(GraderError::Composition(format!(
                "missing required rubric categories: {}",
                names.join(", ")
            )));
        }

        let mut total = 0.0;
        let mut passed = true;
        let mut notes: Vec<String> = Vec::new();

        for (rubric_type, item) in &items {
            let config_item = self.config.item(*rubric_type).ok_or_else(|| {
                GraderError::Validation(format!(
                    "rubric category {rubric_type} is not configured for this phase"
                ))
            })?;

            let results = &item.results;
            let possible = results.possible_points;
            if !possible.is_finite() || possible < 0.0 {
                return Err(GraderError::Validation(format!(
                    "{rubric_type}: possible points must be a non-negative number, got {possible}"
                )));
            }
            if !results.score.is_finite()
                || results.score < 0.0
                || results.score > results.possible_points
            {
                return Err(GraderError::Validation(format!(
                    "{rubric_type}: score {} is outside [0, {}]",
                    results.score, results.possible_points
                )));
            }

            if results.has_harness_error() {
                passed = false;
                notes.push(format!("{}: tests could not be run", item.category));
            } else if results.score < config_item.passing_threshold {
                passed = false;
                notes.push(format!(
                    "{}: {} of {} points, {} required",
                    item.category,
                    format_points(results.score),
                    format_points(results.possible_points),
                    format_points(config_item.passing_threshold)
                ));
            }

            total += results.score;
        }

        tracing::info!(total, passed, categories = items.len(), "Composed rubric");
        Ok(Rubric::new(items, total, passed, notes.join("\n")))
    }
}

/// Drops the fraction for whole numbers, otherwise keeps two decimals.
pub(crate) fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        format!("{points:.2}")
    }
}
