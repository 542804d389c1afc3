//! Per-student, per-phase submission ledger.
//!
//! Every `(net id, phase)` pair owns its own async mutex. Recording and every
//! transition that looks at sibling submissions (approval demoting an earlier
//! approval) run under that lock only, so two grading runs for the same student
//! and phase are serialised while unrelated students proceed in parallel.
//!
//! Transitions are applied to a copy of the key's submissions and committed
//! only when every step succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use util::phase::Phase;

use crate::GradedSubmission;
use crate::error::{GraderError, GraderResult};
use crate::submission::{Grade, Precondition, Submission, VerifiedStatus};

/// Ledger key: student net id and phase.
type LedgerKey = (String, Phase);

/// Submissions of one key, in recording order.
type Slot = Arc<Mutex<Vec<Submission>>>;

#[derive(Clone, Default)]
pub struct SubmissionLedger {
    slots: Arc<RwLock<HashMap<LedgerKey, Slot>>>,
}

impl SubmissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a key that has already recorded something.
    async fn existing_slot(&self, net_id: &str, phase: Phase) -> Option<Slot> {
        let map = self.slots.read().await;
        map.get(&(net_id.to_string(), phase)).cloned()
    }

    /// Returns the slot for a key, creating it on first use. Only recording creates slots.
    async fn slot_for_record(&self, net_id: &str, phase: Phase) -> Slot {
        if let Some(slot) = self.existing_slot(net_id, phase).await {
            return slot;
        }
        let mut map = self.slots.write().await;
        map.entry((net_id.to_string(), phase)).or_default().clone()
    }

    async fn slot_or_missing(&self, net_id: &str, phase: Phase, head_hash: &str) -> GraderResult<Slot> {
        self.existing_slot(net_id, phase)
            .await
            .ok_or_else(|| missing(net_id, phase, head_hash))
    }

    /// Adds an `Unapproved` submission.
    ///
    /// # Errors
    /// - [`GraderError::Validation`] when the same head hash was already
    ///   submitted for this phase.
    /// - [`GraderError::State`] when the submission is already approved or
    ///   superseded. Approval only happens inside the ledger.
    pub async fn record(&self, submission: Submission) -> GraderResult<()> {
        let slot = self.slot_for_record(submission.net_id(), submission.phase()).await;
        let mut submissions = slot.lock().await;
        push_unapproved(&mut submissions, submission)?;
        Ok(())
    }

    /// Records a freshly graded submission and, under the same lock, tries to
    /// approve it automatically.
    ///
    /// A refused approval (rubric failed, unmet precondition, newer approval
    /// already in place) is not an error: the submission stays recorded as
    /// `Unapproved`.
    pub async fn record_and_approve(&self, graded: GradedSubmission) -> GraderResult<Submission> {
        let GradedSubmission {
            submission,
            preconditions,
        } = graded;
        let net_id = submission.net_id().to_string();
        let phase = submission.phase();
        let head_hash = submission.head_hash().to_string();

        let slot = self.slot_for_record(&net_id, phase).await;
        let mut submissions = slot.lock().await;
        let index = push_unapproved(&mut submissions, submission)?;

        match approve_at(&mut submissions, index, &head_hash, |s| {
            s.approve_automatically(&preconditions)
        }) {
            Ok(approved) => Ok(approved),
            Err(GraderError::State(reason)) => {
                tracing::info!(net_id = %net_id, phase = %phase, head_hash = %head_hash, reason = %reason, "Submission left unapproved");
                Ok(submissions[index].clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Snapshot of the key's submissions, in recording order.
    pub async fn submissions(&self, net_id: &str, phase: Phase) -> Vec<Submission> {
        match self.existing_slot(net_id, phase).await {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }

    pub async fn approve_automatically(
        &self,
        net_id: &str,
        phase: Phase,
        head_hash: &str,
        preconditions: &[Precondition],
    ) -> GraderResult<Submission> {
        self.approve(net_id, phase, head_hash, |s| s.approve_automatically(preconditions))
            .await
    }

    pub async fn approve_manually(&self, net_id: &str, phase: Phase, head_hash: &str) -> GraderResult<Submission> {
        self.approve(net_id, phase, head_hash, Submission::approve_manually).await
    }

    /// Re-grades a submission, returning it to `Unapproved`.
    pub async fn regrade(&self, net_id: &str, phase: Phase, head_hash: &str, grade: Grade) -> GraderResult<Submission> {
        let slot = self.slot_or_missing(net_id, phase, head_hash).await?;
        let mut submissions = slot.lock().await;
        let index = find(&submissions, net_id, phase, head_hash)?;
        submissions[index].apply_grade(grade);
        Ok(submissions[index].clone())
    }

    /// The earliest submission whose rubric passed.
    pub async fn first_passing(&self, net_id: &str, phase: Phase) -> Option<Submission> {
        let slot = self.existing_slot(net_id, phase).await?;
        let submissions = slot.lock().await;
        submissions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.passed())
            .min_by_key(|(i, s)| (s.timestamp(), *i))
            .map(|(_, s)| s.clone())
    }

    /// The submission whose score is currently authoritative, if any.
    pub async fn latest_approved(&self, net_id: &str, phase: Phase) -> Option<Submission> {
        let slot = self.existing_slot(net_id, phase).await?;
        let submissions = slot.lock().await;
        submissions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.verified_status().is_approved())
            .max_by_key(|(i, s)| (s.timestamp(), *i))
            .map(|(_, s)| s.clone())
    }

    async fn approve<F>(&self, net_id: &str, phase: Phase, head_hash: &str, transition: F) -> GraderResult<Submission>
    where
        F: FnOnce(&mut Submission) -> GraderResult<()>,
    {
        let slot = self.slot_or_missing(net_id, phase, head_hash).await?;
        let mut submissions = slot.lock().await;
        let index = find(&submissions, net_id, phase, head_hash)?;
        approve_at(&mut submissions, index, head_hash, transition)
    }
}

fn push_unapproved(submissions: &mut Vec<Submission>, submission: Submission) -> GraderResult<usize> {
    match submission.verified_status() {
        VerifiedStatus::Unapproved => {}
        VerifiedStatus::ApprovedAutomatically
        | VerifiedStatus::ApprovedManually
        | VerifiedStatus::PreviouslyApproved => {
            return Err(GraderError::State(format!(
                "cannot record {} for {}: status is {}, expected unapproved",
                submission.head_hash(),
                submission.net_id(),
                submission.verified_status()
            )));
        }
    }
    if submissions.iter().any(|s| s.head_hash() == submission.head_hash()) {
        return Err(GraderError::Validation(format!(
            "You have already submitted this version of your code for {}. Make some changes and try again.",
            submission.phase()
        )));
    }
    tracing::info!(
        net_id = %submission.net_id(),
        phase = %submission.phase(),
        head_hash = %submission.head_hash(),
        "Recorded submission"
    );
    submissions.push(submission);
    Ok(submissions.len() - 1)
}

/// Runs an approval transition on `submissions[index]`, then demotes every
/// earlier approved submission.
///
/// Fails without changes when a newer submission of the key is already approved.
fn approve_at<F>(
    submissions: &mut Vec<Submission>,
    index: usize,
    head_hash: &str,
    transition: F,
) -> GraderResult<Submission>
where
    F: FnOnce(&mut Submission) -> GraderResult<()>,
{
    let target = (submissions[index].timestamp(), index);
    let is_newer = |i: usize, s: &Submission| (s.timestamp(), i) > target;
    if let Some((_, newer)) = submissions
        .iter()
        .enumerate()
        .find(|&(i, s)| is_newer(i, s) && s.verified_status().is_approved())
    {
        return Err(GraderError::State(format!(
            "cannot approve {head_hash}: newer submission {} is already approved",
            newer.head_hash()
        )));
    }

    let mut staged = submissions.clone();
    transition(&mut staged[index])?;
    for (i, sibling) in staged.iter_mut().enumerate() {
        if i != index && !is_newer(i, &*sibling) && sibling.verified_status().is_approved() {
            sibling.supersede();
        }
    }

    let approved = staged[index].clone();
    *submissions = staged;
    Ok(approved)
}

fn find(submissions: &[Submission], net_id: &str, phase: Phase, head_hash: &str) -> GraderResult<usize> {
    submissions
        .iter()
        .position(|s| s.head_hash() == head_hash)
        .ok_or_else(|| missing(net_id, phase, head_hash))
}

fn missing(net_id: &str, phase: Phase, head_hash: &str) -> GraderError {
    GraderError::State(format!("no submission {head_hash} recorded for {net_id} in {phase}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{Rubric, RubricItems};
    use crate::submission::{SubmissionIdentity, VerifiedStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn graded(net_id: &str, hash: &str, minutes: i64, passed: bool) -> Submission {
        let identity = SubmissionIdentity {
            net_id: net_id.to_string(),
            repo_url: format!("https://github.com/{net_id}/chess"),
            head_hash: hash.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes),
        };
        let mut submission = Submission::new(identity, Phase::Phase4, false);
        submission.apply_grade(Grade {
            rubric: Rubric::new(RubricItems::new(), 100.0, passed, String::new()),
            score: 100.0,
            notes: String::new(),
        });
        submission
    }

    async fn status_of(ledger: &SubmissionLedger, hash: &str) -> VerifiedStatus {
        ledger
            .submissions("cosmo", Phase::Phase4)
            .await
            .into_iter()
            .find(|s| s.head_hash() == hash)
            .map(|s| s.verified_status())
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_head_hash_rejected() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "aaa", 0, true)).await.unwrap();
        let err = ledger.record(graded("cosmo", "aaa", 5, true)).await.unwrap_err();
        assert!(matches!(err, GraderError::Validation(_)));
        assert_eq!(ledger.submissions("cosmo", Phase::Phase4).await.len(), 1);
    }

    /// Approving a newer submission demotes the older approved one.
    #[tokio::test]
    async fn test_newer_approval_supersedes_older() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "old", 0, false)).await.unwrap();
        ledger.record(graded("cosmo", "new", 10, true)).await.unwrap();

        ledger.approve_manually("cosmo", Phase::Phase4, "old").await.unwrap();
        assert_eq!(status_of(&ledger, "old").await, VerifiedStatus::ApprovedManually);

        let approved = ledger
            .approve_automatically("cosmo", Phase::Phase4, "new", &[])
            .await
            .unwrap();
        assert_eq!(approved.verified_status(), VerifiedStatus::ApprovedAutomatically);
        assert_eq!(status_of(&ledger, "old").await, VerifiedStatus::PreviouslyApproved);
        assert_eq!(
            ledger.latest_approved("cosmo", Phase::Phase4).await.unwrap().head_hash(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_older_approval_blocked_by_newer() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "old", 0, true)).await.unwrap();
        ledger.record(graded("cosmo", "new", 10, true)).await.unwrap();
        ledger.approve_manually("cosmo", Phase::Phase4, "new").await.unwrap();

        let err = ledger.approve_manually("cosmo", Phase::Phase4, "old").await.unwrap_err();
        assert!(matches!(&err, GraderError::State(msg) if msg.contains("new")));
        assert_eq!(status_of(&ledger, "old").await, VerifiedStatus::Unapproved);
        assert_eq!(status_of(&ledger, "new").await, VerifiedStatus::ApprovedManually);
    }

    /// A failed transition leaves every sibling untouched.
    #[tokio::test]
    async fn test_failed_approval_changes_nothing() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "old", 0, true)).await.unwrap();
        ledger.record(graded("cosmo", "new", 10, false)).await.unwrap();
        ledger.approve_automatically("cosmo", Phase::Phase4, "old", &[]).await.unwrap();

        let before = ledger.submissions("cosmo", Phase::Phase4).await;
        assert!(ledger
            .approve_automatically("cosmo", Phase::Phase4, "new", &[])
            .await
            .is_err());
        assert_eq!(ledger.submissions("cosmo", Phase::Phase4).await, before);
    }

    #[tokio::test]
    async fn test_unknown_submission_is_state_error() {
        let ledger = SubmissionLedger::new();
        assert!(matches!(
            ledger.approve_manually("cosmo", Phase::Phase4, "nope").await,
            Err(GraderError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_regrade_resets_status() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "aaa", 0, true)).await.unwrap();
        ledger.approve_automatically("cosmo", Phase::Phase4, "aaa", &[]).await.unwrap();

        let grade = Grade {
            rubric: Rubric::new(RubricItems::new(), 40.0, false, String::new()),
            score: 40.0,
            notes: "regraded".to_string(),
        };
        let regraded = ledger.regrade("cosmo", Phase::Phase4, "aaa", grade).await.unwrap();
        assert_eq!(regraded.verified_status(), VerifiedStatus::Unapproved);
        assert_eq!(regraded.score(), 40.0);
        assert!(ledger.latest_approved("cosmo", Phase::Phase4).await.is_none());
    }

    #[tokio::test]
    async fn test_first_passing() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "a", 0, false)).await.unwrap();
        ledger.record(graded("cosmo", "b", 10, true)).await.unwrap();
        ledger.record(graded("cosmo", "c", 20, true)).await.unwrap();
        assert_eq!(ledger.first_passing("cosmo", Phase::Phase4).await.unwrap().head_hash(), "b");
        assert!(ledger.first_passing("cosmo", Phase::Phase1).await.is_none());
    }

    /// Concurrent approvals of one student's submissions leave exactly one approved.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_approvals_leave_one_approved() {
        let ledger = SubmissionLedger::new();
        let hashes: Vec<String> = (0..8).map(|i| format!("h{i}")).collect();
        for (i, hash) in hashes.iter().enumerate() {
            ledger.record(graded("cosmo", hash, i as i64, true)).await.unwrap();
        }

        let handles: Vec<_> = hashes
            .iter()
            .cloned()
            .map(|hash| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.approve_manually("cosmo", Phase::Phase4, &hash).await })
            })
            .collect();
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let submissions = ledger.submissions("cosmo", Phase::Phase4).await;
        let approved: Vec<_> = submissions
            .iter()
            .filter(|s| s.verified_status().is_approved())
            .collect();
        assert_eq!(approved.len(), 1);
        // Whatever order the tasks ran in, the newest submission ends up approved.
        assert_eq!(approved[0].head_hash(), "h7");
    }

    fn to_graded(submission: Submission) -> GradedSubmission {
        GradedSubmission {
            submission,
            preconditions: Vec::new(),
        }
    }

    /// Recording an already approved submission is refused.
    #[tokio::test]
    async fn test_record_rejects_approved_submission() {
        let ledger = SubmissionLedger::new();
        let mut submission = graded("cosmo", "aaa", 0, true);
        submission.approve_automatically(&[]).unwrap();

        let err = ledger.record(submission).await.unwrap_err();
        assert!(matches!(err, GraderError::State(_)));
        assert!(ledger.submissions("cosmo", Phase::Phase4).await.is_empty());
    }

    /// Recording two passing submissions in either order approves only the newer one.
    #[tokio::test]
    async fn test_record_and_approve_keeps_one_approved() {
        let ledger = SubmissionLedger::new();
        let old = ledger.record_and_approve(to_graded(graded("cosmo", "old", 0, true))).await.unwrap();
        assert_eq!(old.verified_status(), VerifiedStatus::ApprovedAutomatically);
        let new = ledger.record_and_approve(to_graded(graded("cosmo", "new", 60, true))).await.unwrap();
        assert_eq!(new.verified_status(), VerifiedStatus::ApprovedAutomatically);
        assert_eq!(status_of(&ledger, "old").await, VerifiedStatus::PreviouslyApproved);

        let reversed = SubmissionLedger::new();
        reversed.record_and_approve(to_graded(graded("cosmo", "new", 60, true))).await.unwrap();
        let late = reversed.record_and_approve(to_graded(graded("cosmo", "old", 0, true))).await.unwrap();
        assert_eq!(late.verified_status(), VerifiedStatus::Unapproved);
        assert_eq!(
            reversed.latest_approved("cosmo", Phase::Phase4).await.unwrap().head_hash(),
            "new"
        );
    }

    /// A refused automatic approval still records the submission.
    #[tokio::test]
    async fn test_record_and_approve_records_failing_submission() {
        let ledger = SubmissionLedger::new();
        let recorded = ledger.record_and_approve(to_graded(graded("cosmo", "aaa", 0, false))).await.unwrap();
        assert_eq!(recorded.verified_status(), VerifiedStatus::Unapproved);
        assert_eq!(ledger.submissions("cosmo", Phase::Phase4).await.len(), 1);

        let err = ledger
            .record_and_approve(to_graded(graded("cosmo", "aaa", 5, true)))
            .await
            .unwrap_err();
        assert!(matches!(err, GraderError::Validation(_)));
    }

    /// Queries and failed transitions on an unknown key leave the ledger empty.
    #[tokio::test]
    async fn test_queries_do_not_create_entries() {
        let ledger = SubmissionLedger::new();
        assert!(ledger.submissions("cosmo", Phase::Phase4).await.is_empty());
        assert!(ledger.first_passing("cosmo", Phase::Phase4).await.is_none());
        assert!(ledger.latest_approved("cosmo", Phase::Phase4).await.is_none());
        assert!(ledger.approve_manually("cosmo", Phase::Phase4, "aaa").await.is_err());
        assert!(ledger.slots.read().await.is_empty());

        ledger.record(graded("cosmo", "aaa", 0, true)).await.unwrap();
        assert_eq!(ledger.slots.read().await.len(), 1);
    }

    /// Different students never share a lock.
    #[tokio::test]
    async fn test_keys_are_independent() {
        let ledger = SubmissionLedger::new();
        ledger.record(graded("cosmo", "same", 0, true)).await.unwrap();
        ledger.record(graded("wanda", "same", 0, true)).await.unwrap();
        ledger.approve_manually("cosmo", Phase::Phase4, "same").await.unwrap();
        assert!(ledger.latest_approved("wanda", Phase::Phase4).await.is_none());
    }
}
