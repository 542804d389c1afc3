//! # Submission and Verification Status
//!
//! A [`Submission`] is one graded attempt of a student at a phase. Its
//! [`VerifiedStatus`] says whether its score is authoritative for the grade book.
//!
//! ```text
//!                 approve_automatically (rubric passed, preconditions met)
//!   Unapproved ─────────────────────────────────────────▶ ApprovedAutomatically ─┐
//!       │  ▲                                                                      │ supersede
//!       │  └──── apply_grade (explicit re-grade, from any state)                  ▼
//!       └──────────────────────────────────────────────▶ ApprovedManually ──▶ PreviouslyApproved
//!                 approve_manually (admin, regardless of rubric)
//! ```
//!
//! Every transition either succeeds completely or returns
//! [`GraderError::State`] with the submission unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use util::phase::Phase;

use crate::error::{GraderError, GraderResult};
use crate::rubric::Rubric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerifiedStatus {
    #[default]
    Unapproved,
    ApprovedAutomatically,
    ApprovedManually,
    /// Was approved, then superseded by a newer approved submission.
    PreviouslyApproved,
}

impl VerifiedStatus {
    /// Whether this status makes the score authoritative right now.
    pub fn is_approved(self) -> bool {
        match self {
            VerifiedStatus::ApprovedAutomatically | VerifiedStatus::ApprovedManually => true,
            VerifiedStatus::Unapproved | VerifiedStatus::PreviouslyApproved => false,
        }
    }
}

impl fmt::Display for VerifiedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifiedStatus::Unapproved => "unapproved",
            VerifiedStatus::ApprovedAutomatically => "approved_automatically",
            VerifiedStatus::ApprovedManually => "approved_manually",
            VerifiedStatus::PreviouslyApproved => "previously_approved",
        };
        write!(f, "{s}")
    }
}

/// A named automatic-approval check supplied by an outside system
/// (commit verification, plagiarism review, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    pub name: String,
    pub satisfied: bool,
}

impl Precondition {
    pub fn new(name: impl Into<String>, satisfied: bool) -> Self {
        Self {
            name: name.into(),
            satisfied,
        }
    }
}

/// Where the submitted code came from. Opaque to the grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionIdentity {
    pub net_id: String,
    pub repo_url: String,
    pub head_hash: String,
    pub timestamp: DateTime<Utc>,
}

/// The outcome of one grading run, ready to be stamped onto a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub rubric: Rubric,
    /// Final score after adjustments such as the late penalty.
    pub score: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(flatten)]
    identity: SubmissionIdentity,
    phase: Phase,
    score: f64,
    notes: String,
    rubric: Option<Rubric>,
    passed: bool,
    /// Submitted by an admin (e.g. on a student's behalf).
    admin: bool,
    verified_status: VerifiedStatus,
}

impl Submission {
    /// A new, ungraded submission.
    pub fn new(identity: SubmissionIdentity, phase: Phase, admin: bool) -> Self {
        Self {
            identity,
            phase,
            score: 0.0,
            notes: String::new(),
            rubric: None,
            passed: false,
            admin,
            verified_status: VerifiedStatus::Unapproved,
        }
    }

    pub fn identity(&self) -> &SubmissionIdentity {
        &self.identity
    }

    pub fn net_id(&self) -> &str {
        &self.identity.net_id
    }

    pub fn head_hash(&self) -> &str {
        &self.identity.head_hash
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.identity.timestamp
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn rubric(&self) -> Option<&Rubric> {
        self.rubric.as_ref()
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn verified_status(&self) -> VerifiedStatus {
        self.verified_status
    }

    /// Stamps a grading run onto this submission and resets it to `Unapproved`.
    ///
    /// This is the explicit re-grade action: it is the only way an approved
    /// submission returns to `Unapproved`.
    pub fn apply_grade(&mut self, grade: Grade) {
        if self.verified_status != VerifiedStatus::Unapproved {
            tracing::info!(
                net_id = %self.identity.net_id,
                head_hash = %self.identity.head_hash,
                from = %self.verified_status,
                "Re-grade resets verification status"
            );
        }
        self.passed = grade.rubric.passed();
        self.score = grade.score;
        self.notes = grade.notes;
        self.rubric = Some(grade.rubric);
        self.verified_status = VerifiedStatus::Unapproved;
    }

    /// `Unapproved -> ApprovedAutomatically`, when the rubric passed and every
    /// precondition is satisfied.
    pub fn approve_automatically(&mut self, preconditions: &[Precondition]) -> GraderResult<()> {
        let rubric = self.approvable_rubric("approve automatically")?;
        if !rubric.passed() {
            return Err(GraderError::State(format!(
                "cannot approve {} automatically: rubric did not pass",
                self.describe()
            )));
        }
        let unmet: Vec<&str> = preconditions
            .iter()
            .filter(|p| !p.satisfied)
            .map(|p| p.name.as_str())
            .collect();
        if !unmet.is_empty() {
            return Err(GraderError::State(format!(
                "cannot approve {} automatically: unmet preconditions: {}",
                self.describe(),
                unmet.join(", ")
            )));
        }

        self.verified_status = VerifiedStatus::ApprovedAutomatically;
        tracing::info!(net_id = %self.identity.net_id, head_hash = %self.identity.head_hash, "Approved automatically");
        Ok(())
    }

    /// `Unapproved -> ApprovedManually`. An admin override: the rubric verdict is not consulted.
    pub fn approve_manually(&mut self) -> GraderResult<()> {
        self.approvable_rubric("approve manually")?;
        self.verified_status = VerifiedStatus::ApprovedManually;
        tracing::info!(net_id = %self.identity.net_id, head_hash = %self.identity.head_hash, "Approved manually");
        Ok(())
    }

    /// `* -> PreviouslyApproved`. Driven by a newer sibling submission being approved.
    pub fn supersede(&mut self) {
        match self.verified_status {
            VerifiedStatus::PreviouslyApproved => {}
            VerifiedStatus::Unapproved
            | VerifiedStatus::ApprovedAutomatically
            | VerifiedStatus::ApprovedManually => {
                tracing::info!(
                    net_id = %self.identity.net_id,
                    head_hash = %self.identity.head_hash,
                    from = %self.verified_status,
                    "Superseded by newer approval"
                );
                self.verified_status = VerifiedStatus::PreviouslyApproved;
            }
        }
    }

    /// The rubric, if this submission is in a state that approval may leave.
    fn approvable_rubric(&self, action: &str) -> GraderResult<&Rubric> {
        match self.verified_status {
            VerifiedStatus::Unapproved => {}
            VerifiedStatus::ApprovedAutomatically
            | VerifiedStatus::ApprovedManually
            | VerifiedStatus::PreviouslyApproved => {
                return Err(GraderError::State(format!(
                    "cannot {action} {}: status is {}",
                    self.describe(),
                    self.verified_status
                )));
            }
        }
        self.rubric.as_ref().ok_or_else(|| {
            GraderError::State(format!("cannot {action} {}: not graded yet", self.describe()))
        })
    }

    fn describe(&self) -> String {
        format!(
            "submission {} of {} for {}",
            self.identity.head_hash, self.identity.net_id, self.phase
        )
    }
}
