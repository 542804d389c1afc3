//! # Types Module
//!
//! Data carried between the harness boundary and the rubric: the test outcome of
//! one category ([`TestResult`]), the scored results of that category
//! ([`RubricItemResults`]) and the labelled category itself ([`RubricItem`]).

use serde::{Deserialize, Serialize};

use crate::error::GraderResult;
use crate::test_node::{TestCounts, TestNode};

/// The harness output for one rubric category.
///
/// When `error` is set the harness itself failed and the trees are not
/// authoritative; the category scores zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<TestNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_credit: Option<TestNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn from_root(root: TestNode) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    /// A category whose harness run failed outright.
    pub fn harness_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_extra_credit(mut self, extra_credit: TestNode) -> Self {
        self.extra_credit = Some(extra_credit);
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Recomputes the counters of both trees and returns the combined counts.
    ///
    /// The main tree's counts are returned as-is; the parallel extra-credit tree
    /// only adds to the extra-credit pair, every one of its leaves being extra
    /// credit regardless of its own tag.
    pub fn aggregate(&mut self, max_depth: usize) -> GraderResult<TestCounts> {
        let mut counts = match self.root.as_mut() {
            Some(root) => root.aggregate(max_depth)?,
            None => TestCounts::default(),
        };
        if let Some(extra) = self.extra_credit.as_mut() {
            let ec = extra.aggregate(max_depth)?;
            counts.extra_credit_passed += ec.tests_passed + ec.extra_credit_passed;
            counts.extra_credit_failed += ec.tests_failed + ec.extra_credit_failed;
        }
        Ok(counts)
    }
}

/// Scored outcome of one rubric category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricItemResults {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub possible_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<TestResult>,
    /// Free-text evidence for categories without a test tree (e.g. manual review).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_results: Option<String>,
}

impl RubricItemResults {
    /// Results backed by a harness test run.
    pub fn from_tests(test_results: TestResult, possible_points: f64) -> Self {
        Self {
            possible_points,
            test_results: Some(test_results),
            ..Default::default()
        }
    }

    /// Results scored by an external reviewer.
    pub fn from_review(text: impl Into<String>, score: f64, possible_points: f64) -> Self {
        Self {
            score,
            possible_points,
            text_results: Some(text.into()),
            ..Default::default()
        }
    }

    /// Whether the category-level harness run failed.
    pub fn has_harness_error(&self) -> bool {
        self.test_results.as_ref().is_some_and(TestResult::has_error)
    }
}

/// One gradable rubric category with its scored results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    pub category: String,
    pub criteria: String,
    pub results: RubricItemResults,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The parallel extra-credit tree never touches the required pair.
    #[test]
    fn test_aggregate_with_parallel_extra_credit_tree() {
        let root = TestNode::suite("Passoff", vec![TestNode::passing("a"), TestNode::failing("b", "x")]);
        let extra = TestNode::suite(
            "Extra Credit",
            vec![TestNode::passing("ec1"), TestNode::failing("ec2", "y"), TestNode::passing("ec3")],
        );
        let mut result = TestResult::from_root(root).with_extra_credit(extra);
        let counts = result.aggregate(16).unwrap();
        assert_eq!(counts.tests_passed, 1);
        assert_eq!(counts.tests_failed, 1);
        assert_eq!(counts.extra_credit_passed, 2);
        assert_eq!(counts.extra_credit_failed, 1);
    }

    #[test]
    fn test_aggregate_without_root() {
        let mut result = TestResult::harness_error("compilation failed");
        assert_eq!(result.aggregate(16).unwrap(), TestCounts::default());
        assert!(result.has_error());
    }

    #[test]
    fn test_results_serialization_shape() {
        let results = RubricItemResults::from_review("Looks clean", 25.0, 30.0);
        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(value["possiblePoints"], 30.0);
        assert_eq!(value["score"], 25.0);
        assert_eq!(value["textResults"], "Looks clean");
        assert!(value.get("testResults").is_none());
    }
}
