//! # Grade Report Module
//!
//! Response envelope for returning a graded [`Submission`] to callers.
//!
//! ## JSON Output Example
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Grading complete.",
//!   "data": {
//!     "netId": "cosmo",
//!     "repoUrl": "...",
//!     "headHash": "...",
//!     "timestamp": "2024-02-01T12:00:00Z",
//!     "phase": "Phase3",
//!     "score": 119.0,
//!     "notes": "...",
//!     "rubric": { "version": 2, "items": { ... }, "score": 149.0, "passed": true, "notes": "" },
//!     "passed": true,
//!     "admin": false,
//!     "verifiedStatus": "ApprovedAutomatically"
//!   }
//! }
//! ```

use serde::Serialize;

use crate::submission::Submission;

#[derive(Debug, Serialize)]
pub struct GradeReportResponse {
    success: bool,
    message: String,
    data: Submission,
}

impl GradeReportResponse {
    pub fn submission(&self) -> &Submission {
        &self.data
    }
}

impl From<Submission> for GradeReportResponse {
    fn from(submission: Submission) -> Self {
        let message = if submission.passed() {
            "Grading complete."
        } else {
            "Grading complete. The submission did not pass."
        };
        GradeReportResponse {
            success: true,
            message: message.to_string(),
            data: submission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmissionIdentity;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use util::phase::Phase;

    #[test]
    fn test_grade_report_response_serialization() {
        let identity = SubmissionIdentity {
            net_id: "cosmo".to_string(),
            repo_url: "https://github.com/cosmo/chess".to_string(),
            head_hash: "abc123".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
        };
        let response: GradeReportResponse = Submission::new(identity, Phase::Phase0, false).into();
        let value: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Grading complete. The submission did not pass.");
        assert_eq!(value["data"]["netId"], "cosmo");
        assert_eq!(value["data"]["phase"], "Phase0");
        assert_eq!(value["data"]["rubric"], Value::Null);
        assert_eq!(value["data"]["verifiedStatus"], "Unapproved");
    }
}
