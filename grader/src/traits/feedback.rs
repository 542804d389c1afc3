//!
//! # Feedback Trait
//!
//! This module defines the [`Feedback`] trait, used to plug in the strategy that
//! writes a rubric category's notes once the category has been scored.
//!

use util::rubric_type::RubricType;

use crate::test_node::TestCounts;
use crate::types::RubricItemResults;

/// A trait for pluggable notes strategies.
///
/// # Arguments
/// - `rubric_type`: the category being annotated.
/// - `results`: the category's results, with `score` already set.
/// - `counts`: aggregated counts of the category's test trees, `None` for
///   categories without a test run.
///
/// # Returns
/// The notes to store on the category. Returning `results.notes` unchanged keeps
/// whatever the harness or reviewer supplied.
pub trait Feedback {
    fn assemble_notes(
        &self,
        rubric_type: RubricType,
        results: &RubricItemResults,
        counts: Option<&TestCounts>,
    ) -> String;
}
