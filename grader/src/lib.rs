//! # Grader Library
//!
//! Core of the course autograder: turns harness test trees and reviewer scores
//! into a composed rubric, stamps it onto a submission and drives the
//! submission's verification status.
//!
//! ## Key Concepts
//! - **TestNode**: a suite/test tree whose counters are recomputed bottom-up ([`test_node`]).
//! - **Evaluator**: scores one rubric category from its tree or reviewer score ([`evaluator`]).
//! - **RubricComposer**: combines categories into a passing or failing [`rubric::Rubric`] ([`scorer`]).
//! - **Submission**: the graded attempt and its approval state machine ([`submission`]).
//! - **SubmissionLedger**: serialises approvals per student and phase ([`ledger`]).
//! - **GradingJob**: runs the whole pipeline for one [`GradingRequest`].
//!
//! A [`GradingJob`] never approves on its own. Its [`GradedSubmission`] goes to
//! [`ledger::SubmissionLedger::record_and_approve`], which decides approval under
//! the student's per-phase lock.

pub mod command;
pub mod commit_verification;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod late_penalty;
pub mod ledger;
pub mod report;
pub mod rubric;
pub mod scorer;
pub mod submission;
pub mod test_node;
pub mod traits;
pub mod types;

use crate::commit_verification::{CommitHistory, verify_commits};
use crate::error::{GraderError, GraderResult};
use crate::evaluator::Evaluator;
use crate::late_penalty::apply_late_penalty;
use crate::rubric::RubricItems;
use crate::scorer::RubricComposer;
use crate::submission::{Grade, Precondition, Submission, SubmissionIdentity};
use crate::traits::feedback::Feedback;
use crate::types::{RubricItem, RubricItemResults};

use serde::Deserialize;
use std::collections::BTreeMap;
use util::grading_config::GradingConfig;
use util::phase::Phase;
use util::rubric_type::RubricType;

/// Everything the grader needs about one submission.
///
/// `categories` holds the harness or reviewer output per category.
/// `possiblePoints` inside it is ignored; points always come from the grading
/// config. When `GIT_COMMITS` is absent it is derived from `commitHistory`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRequest {
    #[serde(flatten)]
    pub identity: SubmissionIdentity,
    pub phase: Phase,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub categories: BTreeMap<RubricType, RubricItemResults>,
    #[serde(default)]
    pub days_late: u32,
    #[serde(default)]
    pub commit_history: Option<CommitHistory>,
    /// Outside checks that must hold for automatic approval.
    #[serde(default)]
    pub preconditions: Vec<Precondition>,
}

impl GradingRequest {
    /// Parses a request document.
    pub fn from_json(raw: &str) -> GraderResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A freshly graded, still `Unapproved` submission and the checks its
/// automatic approval depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedSubmission {
    pub submission: Submission,
    pub preconditions: Vec<Precondition>,
}

/// Grades one submission against a [`GradingConfig`].
pub struct GradingJob<'a> {
    config: &'a GradingConfig,
    evaluator: Evaluator<'a>,
}

impl<'a> GradingJob<'a> {
    pub fn new(config: &'a GradingConfig) -> Self {
        Self {
            config,
            evaluator: Evaluator::new(&config.scoring),
        }
    }

    /// Set a custom feedback strategy for this job.
    pub fn with_feedback<F: Feedback + Send + Sync + 'a>(mut self, feedback: F) -> Self {
        self.evaluator = self.evaluator.with_feedback(feedback);
        self
    }

    /// Run the grading pipeline and return the graded submission.
    ///
    /// Steps:
    /// 1. Verify the commit history (graded phases only).
    /// 2. Score every configured category.
    /// 3. Compose the rubric.
    /// 4. Apply the late penalty against the phase's total possible points.
    /// 5. Stamp the grade. The submission stays `Unapproved`; commit
    ///    verification joins the returned preconditions.
    ///
    /// # Errors
    /// - [`GraderError::Config`] when the phase has no rubric configuration.
    /// - [`GraderError::Validation`] when a category is not configured for the phase.
    /// - Any error from evaluation or composition.
    pub fn grade(self, request: GradingRequest) -> GraderResult<GradedSubmission> {
        let GradingRequest {
            identity,
            phase,
            admin,
            mut categories,
            days_late,
            commit_history,
            mut preconditions,
        } = request;

        let phase_config = self
            .config
            .phase(phase)
            .ok_or_else(|| GraderError::Config(format!("no rubric configured for {phase}")))?;

        if let Some(unknown) = categories.keys().find(|t| phase_config.item(**t).is_none()) {
            return Err(GraderError::Validation(format!(
                "rubric category {unknown} is not configured for {phase}"
            )));
        }

        let verification = match (&commit_history, phase.is_graded()) {
            (Some(history), true) => Some(verify_commits(&self.config.commit_requirements, history)),
            (Some(_), false) | (None, _) => None,
        };
        if let Some(verification) = &verification {
            preconditions.push(verification.as_precondition());
            if let Some(item) = phase_config.item(RubricType::GitCommits) {
                categories
                    .entry(RubricType::GitCommits)
                    .or_insert_with(|| verification.to_rubric_results(item.points));
            }
        }

        let mut items = RubricItems::new();
        for (rubric_type, mut results) in categories {
            let Some(config_item) = phase_config.item(rubric_type) else {
                continue;
            };
            results.possible_points = config_item.points;
            self.evaluator.evaluate(rubric_type, &mut results)?;
            items.insert(
                rubric_type,
                RubricItem {
                    category: config_item.category.clone(),
                    criteria: config_item.criteria.clone(),
                    results,
                },
            );
        }

        let rubric = RubricComposer::new(phase_config).compose(items)?;
        let penalty = apply_late_penalty(
            &self.config.late_policy,
            rubric.score(),
            phase_config.total_possible_points(),
            days_late,
        );

        let mut notes: Vec<String> = Vec::new();
        if !rubric.notes().is_empty() {
            notes.push(rubric.notes().to_string());
        }
        if let Some(note) = penalty.note() {
            notes.push(note);
        }
        if let Some(verification) = verification.as_ref().filter(|v| !v.verified) {
            notes.push(verification.message());
        }

        let mut submission = Submission::new(identity, phase, admin);
        submission.apply_grade(Grade {
            rubric,
            score: penalty.adjusted_score,
            notes: notes.join("\n"),
        });

        tracing::info!(
            net_id = %submission.net_id(),
            phase = %phase,
            score = submission.score(),
            passed = submission.passed(),
            "Graded submission"
        );
        Ok(GradedSubmission {
            submission,
            preconditions,
        })
    }
}
