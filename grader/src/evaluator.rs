//! # Rubric Item Evaluator
//!
//! Turns one category's [`RubricItemResults`] into a score.
//!
//! - Harness error: the score is 0, whatever the trees contain.
//! - Test tree: `possiblePoints * passed / (passed + failed)` over required tests.
//!   With no required tests the configured [`ZeroTestPolicy`] decides.
//!   Extra-credit counts are recorded but never raise the score.
//! - Free text: the reviewer's score is kept after checking it lies in
//!   `[0, possiblePoints]`.

use util::grading_config::{ScoringOptions, ZeroTestPolicy};
use util::rubric_type::RubricType;

use crate::error::{GraderError, GraderResult};
use crate::feedback::auto_feedback::AutoFeedback;
use crate::test_node::TestCounts;
use crate::traits::feedback::Feedback;
use crate::types::RubricItemResults;

/// Scores rubric categories under one set of scoring options.
pub struct Evaluator<'a> {
    options: &'a ScoringOptions,
    feedback: Box<dyn Feedback + Send + Sync + 'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(options: &'a ScoringOptions) -> Self {
        Self {
            options,
            feedback: Box::new(AutoFeedback),
        }
    }

    /// Replace the notes strategy.
    pub fn with_feedback<F: Feedback + Send + Sync + 'a>(mut self, feedback: F) -> Self {
        self.feedback = Box::new(feedback);
        self
    }

    /// Scores `results` in place and returns the score.
    ///
    /// # Errors
    /// - [`GraderError::Validation`] when `possiblePoints` is negative or not finite,
    ///   or a reviewer score lies outside `[0, possiblePoints]`.
    /// - [`GraderError::Structural`] when the test tree is malformed.
    ///
    /// On error `results` keeps its previous score and notes.
    pub fn evaluate(&self, rubric_type: RubricType, results: &mut RubricItemResults) -> GraderResult<f64> {
        let possible = results.possible_points;
        if !possible.is_finite() || possible < 0.0 {
            return Err(GraderError::Validation(format!(
                "{rubric_type}: possible points must be a non-negative number, got {possible}"
            )));
        }

        let (score, counts) = match results.test_results.as_mut() {
            Some(test_results) if test_results.has_error() => (0.0, None),
            Some(test_results) => {
                let counts = test_results.aggregate(self.options.max_tree_depth).map_err(|e| match e {
                    GraderError::Structural(msg) => GraderError::Structural(format!("{rubric_type}: {msg}")),
                    other => other,
                })?;
                (self.score_from_counts(possible, &counts), Some(counts))
            }
            None => {
                let score = results.score;
                if !score.is_finite() || score < 0.0 || score > possible {
                    return Err(GraderError::Validation(format!(
                        "{rubric_type}: score {score} is outside [0, {possible}]"
                    )));
                }
                (score, None)
            }
        };

        results.score = score;
        results.notes = self.feedback.assemble_notes(rubric_type, results, counts.as_ref());

        tracing::debug!(
            category = %rubric_type,
            score,
            possible,
            passed = counts.map(|c| c.tests_passed),
            failed = counts.map(|c| c.tests_failed),
            "Evaluated rubric item"
        );
        Ok(score)
    }

    fn score_from_counts(&self, possible: f64, counts: &TestCounts) -> f64 {
        let total = counts.total_tests();
        if total == 0 {
            return match self.options.zero_test_policy {
                ZeroTestPolicy::FullCredit => possible,
                ZeroTestPolicy::NoCredit => 0.0,
            };
        }
        possible * counts.tests_passed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_node::TestNode;
    use crate::types::TestResult;

    fn leaves(passed: usize, failed: usize) -> TestNode {
        let mut children = Vec::new();
        for i in 0..passed {
            children.push(TestNode::passing(format!("pass{i}")));
        }
        for i in 0..failed {
            children.push(TestNode::failing(format!("fail{i}"), "assertion failed"));
        }
        TestNode::suite("Passoff Tests", children)
    }

    /// 8 of 10 required tests passing on a 100 point category scores 80.
    #[test]
    fn test_score_proportional_to_passed() {
        let options = ScoringOptions::default();
        let mut results = RubricItemResults::from_tests(TestResult::from_root(leaves(8, 2)), 100.0);
        let score = Evaluator::new(&options)
            .evaluate(RubricType::PassoffTests, &mut results)
            .unwrap();
        assert_eq!(score, 80.0);
        assert_eq!(results.score, 80.0);
        assert_eq!(results.notes, "Some required tests failed (8/10 passed)");
    }

    /// A tree of only extra-credit leaves gets full credit and records the extra credit.
    #[test]
    fn test_only_extra_credit_tree() {
        let options = ScoringOptions::default();
        let tree = TestNode::suite(
            "Extra",
            (0..3)
                .map(|i| TestNode::passing(format!("ec{i}")).with_ec_category("Bonus"))
                .collect(),
        );
        let mut results = RubricItemResults::from_tests(TestResult::from_root(tree), 50.0);
        let score = Evaluator::new(&options)
            .evaluate(RubricType::PassoffTests, &mut results)
            .unwrap();
        assert_eq!(score, 50.0);
        let root = results.test_results.as_ref().unwrap().root.as_ref().unwrap();
        assert_eq!(root.counts().extra_credit_passed, 3);
        assert_eq!(root.counts().extra_credit_failed, 0);
    }

    #[test]
    fn test_zero_tests_no_credit_policy() {
        let options = ScoringOptions {
            zero_test_policy: ZeroTestPolicy::NoCredit,
            ..Default::default()
        };
        let mut results = RubricItemResults::from_tests(TestResult::from_root(leaves(0, 0)), 40.0);
        assert_eq!(
            Evaluator::new(&options).evaluate(RubricType::UnitTests, &mut results).unwrap(),
            0.0
        );
    }

    /// Extra credit never lifts a score above the category's points.
    #[test]
    fn test_extra_credit_does_not_add_points() {
        let options = ScoringOptions::default();
        let tree = TestNode::suite(
            "t",
            vec![
                TestNode::passing("a"),
                TestNode::passing("b"),
                TestNode::passing("ec").with_ec_category("Bonus"),
            ],
        );
        let mut results = RubricItemResults::from_tests(TestResult::from_root(tree), 20.0);
        assert_eq!(
            Evaluator::new(&options).evaluate(RubricType::PassoffTests, &mut results).unwrap(),
            20.0
        );
    }

    #[test]
    fn test_harness_error_scores_zero() {
        let options = ScoringOptions::default();
        let mut test_results = TestResult::from_root(leaves(10, 0));
        test_results.error = Some("JVM crashed".to_string());
        let mut results = RubricItemResults::from_tests(test_results, 100.0);
        assert_eq!(
            Evaluator::new(&options).evaluate(RubricType::PassoffTests, &mut results).unwrap(),
            0.0
        );
        assert_eq!(results.notes, "Tests could not be run: JVM crashed");
    }

    #[test]
    fn test_review_score_passed_through() {
        let options = ScoringOptions::default();
        let mut results = RubricItemResults::from_review("manual review", 22.5, 30.0);
        assert_eq!(
            Evaluator::new(&options).evaluate(RubricType::Quality, &mut results).unwrap(),
            22.5
        );
    }

    #[test]
    fn test_review_score_out_of_range() {
        let options = ScoringOptions::default();
        for bad in [-1.0, 30.5, f64::NAN] {
            let mut results = RubricItemResults::from_review("manual review", bad, 30.0);
            match Evaluator::new(&options).evaluate(RubricType::Quality, &mut results) {
                Err(GraderError::Validation(msg)) => assert!(msg.contains("QUALITY"), "got: {msg}"),
                other => panic!("Expected Validation error for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_negative_possible_points_rejected() {
        let options = ScoringOptions::default();
        let mut results = RubricItemResults::from_tests(TestResult::from_root(leaves(1, 0)), -5.0);
        assert!(matches!(
            Evaluator::new(&options).evaluate(RubricType::UnitTests, &mut results),
            Err(GraderError::Validation(_))
        ));
    }

    /// Structural errors name the category and leave the previous score untouched.
    #[test]
    fn test_structural_error_identifies_category() {
        let options = ScoringOptions::default();
        let tree = TestNode::suite("t", vec![TestNode::passing("dup"), TestNode::passing("dup")]);
        let mut results = RubricItemResults::from_tests(TestResult::from_root(tree), 10.0);
        results.score = 3.0;
        match Evaluator::new(&options).evaluate(RubricType::UnitTests, &mut results) {
            Err(GraderError::Structural(msg)) => assert!(msg.starts_with("UNIT_TESTS"), "got: {msg}"),
            other => panic!("Expected Structural error, got {other:?}"),
        }
        assert_eq!(results.score, 3.0);
    }

    struct FixedNotes;

    impl Feedback for FixedNotes {
        fn assemble_notes(&self, _: RubricType, _: &RubricItemResults, _: Option<&TestCounts>) -> String {
            "fixed".to_string()
        }
    }

    #[test]
    fn test_custom_feedback_strategy() {
        let options = ScoringOptions::default();
        let mut results = RubricItemResults::from_tests(TestResult::from_root(leaves(1, 1)), 10.0);
        Evaluator::new(&options)
            .with_feedback(FixedNotes)
            .evaluate(RubricType::UnitTests, &mut results)
            .unwrap();
        assert_eq!(results.notes, "fixed");
    }
}
