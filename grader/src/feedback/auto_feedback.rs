//! # AutoFeedback Strategy
//!
//! Template-based notes for each rubric category.
//!
//! ## Overview
//!
//! - A harness error replaces every other note with the error text.
//! - A run with no required tests says so.
//! - Otherwise the note states whether every required test passed, with counts
//!   when some failed.
//! - Extra-credit categories that passed in full are listed on a second line.
//! - Categories without a test run keep the reviewer's notes.

use util::rubric_type::RubricType;

use crate::test_node::TestCounts;
use crate::traits::feedback::Feedback;
use crate::types::RubricItemResults;

#[derive(Debug, Default)]
pub struct AutoFeedback;

impl Feedback for AutoFeedback {
    fn assemble_notes(
        &self,
        _rubric_type: RubricType,
        results: &RubricItemResults,
        counts: Option<&TestCounts>,
    ) -> String {
        let Some(test_results) = results.test_results.as_ref() else {
            return results.notes.clone();
        };

        if let Some(error) = &test_results.error {
            return format!("Tests could not be run: {error}");
        }

        let counts = counts.copied().unwrap_or_default();
        let mut notes = if counts.total_tests() == 0 {
            "No tests were run".to_string()
        } else if counts.tests_failed == 0 {
            "All required tests passed".to_string()
        } else {
            format!(
                "Some required tests failed ({}/{} passed)",
                counts.tests_passed,
                counts.total_tests()
            )
        };

        let mut completed: Vec<String> = Vec::new();
        for tree in [&test_results.root, &test_results.extra_credit].into_iter().flatten() {
            for (category, fraction) in tree.extra_credit_scores() {
                if fraction >= 1.0 && !completed.contains(&category) {
                    completed.push(category);
                }
            }
        }
        if !completed.is_empty() {
            notes.push_str(&format!("\nExtra credit completed: {}", completed.join(", ")));
        }

        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_node::TestNode;
    use crate::types::TestResult;

    fn notes_for(mut result: TestResult) -> String {
        let counts = result.aggregate(32).unwrap();
        let results = RubricItemResults::from_tests(result, 10.0);
        AutoFeedback.assemble_notes(RubricType::PassoffTests, &results, Some(&counts))
    }

    #[test]
    fn test_all_passed() {
        let tree = TestNode::suite("t", vec![TestNode::passing("a"), TestNode::passing("b")]);
        assert_eq!(notes_for(TestResult::from_root(tree)), "All required tests passed");
    }

    #[test]
    fn test_some_failed() {
        let tree = TestNode::suite("t", vec![TestNode::passing("a"), TestNode::failing("b", "x")]);
        assert_eq!(
            notes_for(TestResult::from_root(tree)),
            "Some required tests failed (1/2 passed)"
        );
    }

    #[test]
    fn test_no_tests_and_harness_error() {
        assert_eq!(
            notes_for(TestResult::from_root(TestNode::suite("t", vec![]))),
            "No tests were run"
        );
        assert_eq!(
            notes_for(TestResult::harness_error("mvn package failed")),
            "Tests could not be run: mvn package failed"
        );
    }

    /// Only fully passed extra-credit categories are listed.
    #[test]
    fn test_extra_credit_line() {
        let tree = TestNode::suite(
            "t",
            vec![
                TestNode::passing("req"),
                TestNode::passing("ec-a").with_ec_category("Concurrency"),
                TestNode::passing("ec-b").with_ec_category("Persistence"),
                TestNode::failing("ec-c", "x").with_ec_category("Persistence"),
            ],
        );
        assert_eq!(
            notes_for(TestResult::from_root(tree)),
            "All required tests passed\nExtra credit completed: Concurrency"
        );
    }

    #[test]
    fn test_review_notes_kept() {
        let mut results = RubricItemResults::from_review("checked by TA", 5.0, 10.0);
        results.notes = "Needs smaller methods".to_string();
        assert_eq!(
            AutoFeedback.assemble_notes(RubricType::Quality, &results, None),
            "Needs smaller methods"
        );
    }
}
