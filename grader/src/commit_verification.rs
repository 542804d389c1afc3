//! # Commit History Verification
//!
//! Checks a student's commit history since the previous passing phase against
//! the configured [`CommitRequirements`]. The history itself is gathered by the
//! source-control integration; this module only judges it.
//!
//! A failed verification does not stop grading. It blocks automatic approval and
//! scores the git-commit category zero, leaving approval to a TA.

use serde::{Deserialize, Serialize};
use util::grading_config::CommitRequirements;

use crate::submission::Precondition;
use crate::types::RubricItemResults;

/// Commit statistics for the window being verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitHistory {
    pub total_commits: u32,
    pub days_with_commits: u32,
    /// Lines changed by each commit in the window.
    #[serde(default)]
    pub changes_per_commit: Vec<u32>,
    /// Some commit is authored after the hand-in time.
    #[serde(default)]
    pub commits_in_future: bool,
    /// Some commit is authored before the previous phase's head commit.
    #[serde(default)]
    pub commits_in_past: bool,
    #[serde(default = "default_true")]
    pub commits_in_order: bool,
}

impl Default for CommitHistory {
    fn default() -> Self {
        Self {
            total_commits: 0,
            days_with_commits: 0,
            changes_per_commit: Vec::new(),
            commits_in_future: false,
            commits_in_past: false,
            commits_in_order: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitVerification {
    pub verified: bool,
    pub num_commits: u32,
    pub num_days: u32,
    pub significant_commits: u32,
    /// One entry per failed condition, followed by the penalty notice.
    pub failure_messages: Vec<String>,
}

impl CommitVerification {
    pub fn message(&self) -> String {
        if self.verified {
            "Passed commit verification.".to_string()
        } else {
            self.failure_messages.join("\n")
        }
    }

    /// The git-commit rubric category: full points when verified, zero otherwise.
    pub fn to_rubric_results(&self, possible_points: f64) -> RubricItemResults {
        RubricItemResults {
            notes: self.message(),
            score: if self.verified { possible_points } else { 0.0 },
            possible_points,
            test_results: None,
            text_results: Some(format!(
                "{} commits on {} days ({} significant)",
                self.num_commits, self.num_days, self.significant_commits
            )),
        }
    }

    pub fn as_precondition(&self) -> Precondition {
        Precondition::new("commit verification", self.verified)
    }
}

pub fn verify_commits(requirements: &CommitRequirements, history: &CommitHistory) -> CommitVerification {
    let required = requirements.required_commits;
    let required_days = requirements.required_days_with_commits;
    let num_commits = history.total_commits;
    let num_days = history.days_with_commits;
    let significant = history
        .changes_per_commit
        .iter()
        .filter(|&&lines| lines >= requirements.minimum_lines_changed_per_commit)
        .count() as u32;

    let conditions = [
        (
            num_commits < required,
            format!("Not enough commits to pass off ({num_commits}/{required})."),
        ),
        (
            num_commits >= required && significant < required,
            format!(
                "Have some commits, but some of them are too insignificant for credit ({significant}/{required})."
            ),
        ),
        (
            num_days < required_days,
            format!("Did not commit on enough days to pass off ({num_days}/{required_days})."),
        ),
        (
            history.commits_in_future,
            "Suspicious commit history. Some commits are authored after the hand in date.".to_string(),
        ),
        (
            history.commits_in_past,
            "Suspicious commit history. Some commits are authored before the previous phase hash."
                .to_string(),
        ),
        (
            !history.commits_in_order,
            "Suspicious commit history. Not all commits are in order.".to_string(),
        ),
    ];

    let mut failure_messages: Vec<String> = conditions
        .into_iter()
        .filter_map(|(failed, message)| failed.then_some(message))
        .collect();

    if !failure_messages.is_empty() {
        failure_messages.push(
            "Since you did not meet the prerequisites for commit frequency, you will need to talk to a TA to receive a score."
                .to_string(),
        );
        failure_messages.push(format!(
            "It will come with a {}% penalty.",
            requirements.penalty_pct
        ));
    }

    let verification = CommitVerification {
        verified: failure_messages.is_empty(),
        num_commits,
        num_days,
        significant_commits: significant,
        failure_messages,
    };
    tracing::debug!(
        verified = verification.verified,
        num_commits,
        num_days,
        significant,
        "Verified commit history"
    );
    verification
}
